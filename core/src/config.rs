use serde::{Deserialize, Serialize};

/// FuelEU 2025 target: 2 % below the 91.16 gCO₂e/MJ reference.
pub const DEFAULT_TARGET_INTENSITY: f64 = 89.3368; // gCO₂e/MJ

/// Lower calorific value used to convert fuel mass into energy in scope.
pub const DEFAULT_ENERGY_PER_FUEL_TON: f64 = 41_000.0; // MJ/t

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Target GHG intensity in gCO₂e/MJ.
    pub target_intensity: f64,
    /// Energy content per tonne of fuel in MJ/t.
    pub energy_per_fuel_ton: f64,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            target_intensity: DEFAULT_TARGET_INTENSITY,
            energy_per_fuel_ton: DEFAULT_ENERGY_PER_FUEL_TON,
        }
    }
}

impl ComplianceConfig {
    /// Load from `<data_dir>/config.json`.
    /// A missing file yields the published defaults; a malformed one is an error.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/config.json");
        if !std::path::Path::new(&path).exists() {
            log::info!("No {path}; using default compliance constants");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ComplianceConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.target_intensity.is_finite() {
            anyhow::bail!("target_intensity must be finite");
        }
        if !(self.energy_per_fuel_ton.is_finite() && self.energy_per_fuel_ton > 0.0) {
            anyhow::bail!("energy_per_fuel_ton must be a positive number");
        }
        Ok(())
    }
}

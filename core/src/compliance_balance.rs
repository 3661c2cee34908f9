//! Compliance Balance calculation.
//!
//!   energy_scope (MJ)  = fuel_consumption_t * energy_per_fuel_ton
//!   cb (gCO₂e)         = (target - achieved_intensity) * energy_scope
//!
//! Positive CB is a surplus, negative a deficit.

use crate::{
    config::{ComplianceConfig, DEFAULT_ENERGY_PER_FUEL_TON, DEFAULT_TARGET_INTENSITY},
    error::{ComplianceError, ComplianceResult},
    types::Gco2e,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CbResult {
    pub cb:           Gco2e,
    pub energy_scope: f64,
}

/// Compute CB with the published energy constant.
/// `target` defaults to the published target intensity.
pub fn compute_cb(
    ghg_intensity: f64,
    fuel_consumption_t: f64,
    target: Option<f64>,
) -> ComplianceResult<CbResult> {
    compute_cb_with(
        ghg_intensity,
        fuel_consumption_t,
        target.unwrap_or(DEFAULT_TARGET_INTENSITY),
        DEFAULT_ENERGY_PER_FUEL_TON,
    )
}

/// Compute CB with the constants from a loaded config.
pub fn compute_cb_for(
    config: &ComplianceConfig,
    ghg_intensity: f64,
    fuel_consumption_t: f64,
) -> ComplianceResult<CbResult> {
    compute_cb_with(
        ghg_intensity,
        fuel_consumption_t,
        config.target_intensity,
        config.energy_per_fuel_ton,
    )
}

fn compute_cb_with(
    ghg_intensity: f64,
    fuel_consumption_t: f64,
    target: f64,
    energy_per_fuel_ton: f64,
) -> ComplianceResult<CbResult> {
    // NaN fails this check as well.
    if !(fuel_consumption_t >= 0.0) {
        return Err(ComplianceError::InvalidInput(format!(
            "fuel consumption must be >= 0 t, got {fuel_consumption_t}"
        )));
    }
    let energy_scope = fuel_consumption_t * energy_per_fuel_ton;
    let cb = (target - ghg_intensity) * energy_scope;
    Ok(CbResult { cb, energy_scope })
}

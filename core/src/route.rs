//! Voyage records and route filtering.

use crate::types::Year;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub route_id:          String,
    pub year:              Year,
    pub vessel_type:       String,
    pub fuel_type:         String,
    /// Achieved GHG intensity, gCO₂e/MJ.
    pub ghg_intensity:     f64,
    /// Fuel consumption, tonnes.
    pub fuel_consumption:  f64,
    #[serde(default)]
    pub distance_km:       Option<f64>,
    #[serde(default)]
    pub total_emissions_t: Option<f64>,
    #[serde(default)]
    pub is_baseline:       bool,
}

/// Optional filters for route listings. `None` matches everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouteFilter {
    #[serde(default)]
    pub year:        Option<Year>,
    #[serde(default)]
    pub vessel_type: Option<String>,
    #[serde(default)]
    pub fuel_type:   Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RoutesFile {
    routes: Vec<Route>,
}

/// Read seed routes from `<data_dir>/routes.json`.
pub fn load_routes(data_dir: &str) -> anyhow::Result<Vec<Route>> {
    let path = format!("{data_dir}/routes.json");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let file: RoutesFile = serde_json::from_str(&content)?;
    Ok(file.routes)
}

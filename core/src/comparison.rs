//! Route intensity comparison against a baseline and the target.

use crate::{
    config::DEFAULT_TARGET_INTENSITY,
    error::{ComplianceError, ComplianceResult},
    route::Route,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub percent_diff: f64,
    pub compliant:    bool,
}

/// `percent_diff = (comparison / baseline - 1) * 100`.
///
/// `compliant` is judged against `target` alone; the baseline only
/// affects the relative deviation.
pub fn compute_comparison(
    baseline_intensity: f64,
    comparison_intensity: f64,
    target: Option<f64>,
) -> ComplianceResult<ComparisonResult> {
    if baseline_intensity == 0.0 {
        return Err(ComplianceError::DivisionByZero(
            "baseline intensity must be non-zero".into(),
        ));
    }
    let target = target.unwrap_or(DEFAULT_TARGET_INTENSITY);
    Ok(ComparisonResult {
        percent_diff: (comparison_intensity / baseline_intensity - 1.0) * 100.0,
        compliant: comparison_intensity <= target,
    })
}

/// One row of a year's baseline comparison report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteComparison {
    pub route_id:     String,
    pub baseline:     f64,
    pub comparison:   f64,
    pub percent_diff: f64,
    pub compliant:    bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonReport {
    pub year:               i64,
    pub baseline:           String,
    pub baseline_intensity: f64,
    pub comparisons:        Vec<RouteComparison>,
}

/// Compare every route except the baseline itself against the baseline.
pub fn compare_routes(
    baseline: &Route,
    routes: &[Route],
    target: f64,
) -> ComplianceResult<ComparisonReport> {
    let comparisons = routes
        .iter()
        .filter(|r| r.route_id != baseline.route_id)
        .map(|r| {
            let c = compute_comparison(baseline.ghg_intensity, r.ghg_intensity, Some(target))?;
            Ok(RouteComparison {
                route_id:     r.route_id.clone(),
                baseline:     baseline.ghg_intensity,
                comparison:   r.ghg_intensity,
                percent_diff: c.percent_diff,
                compliant:    c.compliant,
            })
        })
        .collect::<ComplianceResult<Vec<_>>>()?;

    Ok(ComparisonReport {
        year: baseline.year,
        baseline: baseline.route_id.clone(),
        baseline_intensity: baseline.ghg_intensity,
        comparisons,
    })
}

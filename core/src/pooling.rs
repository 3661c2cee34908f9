//! Pool allocation: nets surplus against deficit within one year's pool.
//!
//! Algorithm (greedy, largest first):
//!   1. Reject an empty pool or duplicate vessels or a negative aggregate.
//!   2. Split members into surplus (> 0) and deficit (< 0); members within
//!      tolerance of zero pass through unchanged.
//!   3. Surpluses largest first, deficits most negative first. Both sorts are
//!      stable, so equal values keep their input order.
//!   4. Each deficit draws min(remaining surplus, remaining need) from the
//!      surpluses in order until it is covered.
//!   5. Verify no deficit got worse and no surplus went negative.
//!
//! The input is never mutated. Each member's cb_after is read back from
//! the loop's own working state: a surplus ends at its remaining capacity,
//! a deficit at minus its remaining need. Neither is rebuilt by summing
//! transfers, so a drained surplus ends at exactly zero.

use crate::{
    error::{ComplianceError, ComplianceResult},
    types::{Gco2e, VesselId, Year, ALLOCATION_TOLERANCE, BALANCE_TOLERANCE, RELATIVE_TOLERANCE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolMemberInput {
    pub vessel_id: VesselId,
    pub cb_before: Gco2e,
}

impl PoolMemberInput {
    pub fn new(vessel_id: impl Into<VesselId>, cb_before: Gco2e) -> Self {
        Self { vessel_id: vessel_id.into(), cb_before }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolMemberResult {
    pub vessel_id: VesselId,
    pub cb_before: Gco2e,
    pub cb_after:  Gco2e,
}

/// A persisted pool with its immutable member history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pool {
    pub pool_id:    String,
    pub year:       Year,
    pub created_at: DateTime<Utc>,
    pub members:    Vec<PoolMemberResult>,
}

/// Remaining capacity (surplus) or need (deficit) for one member,
/// tracked as a positive magnitude.
struct Position<'a> {
    vessel_id: &'a str,
    remaining: f64,
}

pub fn allocate_pool(members: &[PoolMemberInput]) -> ComplianceResult<Vec<PoolMemberResult>> {
    if members.is_empty() {
        return Err(ComplianceError::InvalidPool("at least one member required".into()));
    }

    let mut seen = HashSet::with_capacity(members.len());
    for m in members {
        if !seen.insert(m.vessel_id.as_str()) {
            return Err(ComplianceError::InvalidPool(format!(
                "vessel {} appears more than once",
                m.vessel_id
            )));
        }
        if !m.cb_before.is_finite() {
            return Err(ComplianceError::InvalidPool(format!(
                "vessel {} has a non-finite cb_before",
                m.vessel_id
            )));
        }
    }

    // Rounding in sums grows with the pool's magnitude.
    let magnitude: f64 = members.iter().map(|m| m.cb_before.abs()).sum();
    let slack = magnitude * RELATIVE_TOLERANCE;

    let total: f64 = members.iter().map(|m| m.cb_before).sum();
    if total < -(BALANCE_TOLERANCE + slack) {
        return Err(ComplianceError::Pool(format!(
            "pool total CB must be non-negative, got {total}"
        )));
    }

    let mut surpluses: Vec<Position> = members
        .iter()
        .filter(|m| m.cb_before > BALANCE_TOLERANCE)
        .map(|m| Position { vessel_id: &m.vessel_id, remaining: m.cb_before })
        .collect();
    let mut deficits: Vec<Position> = members
        .iter()
        .filter(|m| m.cb_before < -BALANCE_TOLERANCE)
        .map(|m| Position { vessel_id: &m.vessel_id, remaining: -m.cb_before })
        .collect();

    // Both lists largest magnitude first; sort_by is stable.
    surpluses.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));
    deficits.sort_by(|a, b| b.remaining.total_cmp(&a.remaining));

    for deficit in &mut deficits {
        for surplus in surpluses.iter_mut() {
            if deficit.remaining <= BALANCE_TOLERANCE {
                break;
            }
            if surplus.remaining <= BALANCE_TOLERANCE {
                continue;
            }
            // min() keeps both sides exactly >= 0 after the subtraction.
            let amount = surplus.remaining.min(deficit.remaining);
            surplus.remaining -= amount;
            deficit.remaining -= amount;
            log::debug!(
                "pool transfer {amount} from {} to {}",
                surplus.vessel_id,
                deficit.vessel_id
            );
        }

        if deficit.remaining > ALLOCATION_TOLERANCE + slack {
            return Err(ComplianceError::Pool(format!(
                "insufficient surplus to cover deficit of vessel {} ({} unmet)",
                deficit.vessel_id, deficit.remaining
            )));
        }
    }

    // vessel -> cb_after, from the final working state.
    let settled: HashMap<&str, f64> = surpluses
        .iter()
        .map(|s| (s.vessel_id, s.remaining))
        .chain(deficits.iter().map(|d| (d.vessel_id, -d.remaining)))
        .collect();

    let results: Vec<PoolMemberResult> = members
        .iter()
        .map(|m| PoolMemberResult {
            vessel_id: m.vessel_id.clone(),
            cb_before: m.cb_before,
            cb_after:  settled.get(m.vessel_id.as_str()).copied().unwrap_or(m.cb_before),
        })
        .collect();

    verify_allocation(&results)?;
    Ok(results)
}

/// Post-allocation rules: a deficit member may not exit worse,
/// a surplus member may not exit negative.
fn verify_allocation(results: &[PoolMemberResult]) -> ComplianceResult<()> {
    for r in results {
        if r.cb_before < 0.0 && r.cb_after < r.cb_before - BALANCE_TOLERANCE {
            return Err(ComplianceError::Pool(format!(
                "deficit vessel {} would exit worse ({} -> {})",
                r.vessel_id, r.cb_before, r.cb_after
            )));
        }
        if r.cb_before > 0.0 && r.cb_after < -BALANCE_TOLERANCE {
            return Err(ComplianceError::Pool(format!(
                "surplus vessel {} would exit negative ({})",
                r.vessel_id, r.cb_after
            )));
        }
    }
    Ok(())
}

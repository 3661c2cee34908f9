//! CB snapshots: the computed balance for a vessel/year at a point in time.
//!
//! Snapshots are immutable. Recomputing CB adds a new snapshot; the
//! latest one by creation time is authoritative.

use crate::types::{Gco2e, VesselId, Year};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComplianceSnapshot {
    pub snapshot_id: String,
    pub vessel_id:   VesselId,
    pub year:        Year,
    pub cb_gco2e:    Gco2e,
    pub created_at:  DateTime<Utc>,
}

impl ComplianceSnapshot {
    pub fn new(vessel_id: &str, year: Year, cb_gco2e: Gco2e, created_at: DateTime<Utc>) -> Self {
        Self {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            vessel_id: vessel_id.to_string(),
            year,
            cb_gco2e,
            created_at,
        }
    }
}

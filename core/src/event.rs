//! The audit log: every state change the desk makes.
//!
//! RULE: Events are appended, never edited.
//! Variants are added over time, never removed or reordered.

use crate::types::{Gco2e, VesselId, Year};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComplianceEvent {
    RouteUpserted {
        route_id: String,
        year: Year,
    },
    BaselineChanged {
        route_id: String,
        year: Year,
    },
    CbComputed {
        vessel_id: VesselId,
        year: Year,
        snapshot_id: String,
        cb: Gco2e,
        energy_scope: f64,
    },
    SurplusBanked {
        vessel_id: VesselId,
        year: Year,
        entry_id: String,
        amount: Gco2e,
        balance: Gco2e,
    },
    SurplusApplied {
        vessel_id: VesselId,
        year: Year,
        entry_id: String,
        amount: Gco2e,
        balance: Gco2e,
    },
    PoolCreated {
        pool_id: String,
        year: Year,
        member_count: usize,
    },
}

impl ComplianceEvent {
    /// Stable name used for the event_type column.
    pub fn type_name(&self) -> &'static str {
        match self {
            ComplianceEvent::RouteUpserted { .. }   => "route_upserted",
            ComplianceEvent::BaselineChanged { .. } => "baseline_changed",
            ComplianceEvent::CbComputed { .. }      => "cb_computed",
            ComplianceEvent::SurplusBanked { .. }   => "surplus_banked",
            ComplianceEvent::SurplusApplied { .. }  => "surplus_applied",
            ComplianceEvent::PoolCreated { .. }     => "pool_created",
        }
    }
}

/// A persisted event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub event_type: String,
    pub payload:    String, // JSON-serialized ComplianceEvent
    pub created_at: DateTime<Utc>,
}

impl EventLogEntry {
    pub fn decode(&self) -> serde_json::Result<ComplianceEvent> {
        serde_json::from_str(&self.payload)
    }
}

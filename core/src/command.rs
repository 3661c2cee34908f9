use crate::{
    pooling::PoolMemberInput,
    route::RouteFilter,
    types::{Gco2e, VesselId, Year},
};
use serde::{Deserialize, Serialize};

/// Every command the desk accepts from a transport.
/// Variants are added over time, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DeskCommand {
    // ── Routes ────────────────────────────────────
    ListRoutes {
        #[serde(flatten)]
        filter: RouteFilter,
    },
    SetBaseline {
        route_id: String,
    },
    Comparison {
        year: Year,
    },

    // ── Compliance balance ────────────────────────
    ComputeCb {
        vessel_id: VesselId,
        year: Year,
    },
    AdjustedCb {
        vessel_id: VesselId,
        year: Year,
    },

    // ── Banking ───────────────────────────────────
    BankRecords {
        vessel_id: VesselId,
        year: Year,
    },
    Bank {
        vessel_id: VesselId,
        year: Year,
        amount: Gco2e,
    },
    Apply {
        vessel_id: VesselId,
        year: Year,
        amount: Gco2e,
    },

    // ── Pooling ───────────────────────────────────
    CreatePool {
        year: Year,
        members: Vec<PoolMemberInput>,
    },
    GetPool {
        pool_id: String,
    },

    Quit,
}

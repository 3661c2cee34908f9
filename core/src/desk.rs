//! The compliance desk: wires the accounting engine to its store.
//!
//! RULES:
//!   - The engine modules (compliance_balance, comparison, banking, pooling)
//!     stay free of I/O; the desk loads their inputs and persists their outputs.
//!   - Only the store executes SQL.
//!   - Every state change is recorded in the event log, in the same store
//!     transaction as the change, so a reported failure never hides a
//!     committed write.

use crate::{
    banking::{BankEntry, BankingLedger, LedgerReceipt},
    clock::{Clock, SystemClock},
    command::DeskCommand,
    comparison::{compare_routes, ComparisonReport},
    compliance_balance::compute_cb_for,
    config::ComplianceConfig,
    error::{ComplianceError, ComplianceResult},
    event::{ComplianceEvent, EventLogEntry},
    pooling::{allocate_pool, Pool, PoolMemberInput},
    route::{Route, RouteFilter},
    snapshot::ComplianceSnapshot,
    store::ComplianceStore,
    types::{Gco2e, VesselId, Year},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CbReport {
    pub vessel_id:    VesselId,
    pub year:         Year,
    pub cb:           Gco2e,
    pub energy_scope: f64,
    pub snapshot_id:  String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdjustedCb {
    pub vessel_id:    VesselId,
    pub year:         Year,
    pub cb_before:    Gco2e,
    pub bank_balance: Gco2e,
    pub cb_after:     Gco2e,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankRecords {
    pub vessel_id: VesselId,
    pub year:      Year,
    pub balance:   Gco2e,
    pub entries:   Vec<BankEntry>,
}

pub struct ComplianceDesk {
    pub config: ComplianceConfig,
    pub store:  ComplianceStore,
    clock:      Arc<dyn Clock>,
}

impl ComplianceDesk {
    pub fn new(config: ComplianceConfig, store: ComplianceStore) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ComplianceConfig, store: ComplianceStore, clock: Arc<dyn Clock>) -> Self {
        Self { config, store, clock }
    }

    /// In-memory desk with default constants and migrations applied.
    pub fn build_test() -> ComplianceResult<Self> {
        let store = ComplianceStore::in_memory()?;
        store.migrate()?;
        Ok(Self::new(ComplianceConfig::default(), store))
    }

    fn ledger(&self) -> BankingLedger<'_> {
        BankingLedger::new(&self.store, self.clock.as_ref())
    }

    // ── Routes ────────────────────────────────────────────────────

    pub fn upsert_route(&self, route: &Route) -> ComplianceResult<()> {
        if !(route.fuel_consumption >= 0.0) {
            return Err(ComplianceError::InvalidInput(format!(
                "route {} has negative fuel consumption",
                route.route_id
            )));
        }
        self.store.upsert_route(route, self.clock.now())
    }

    /// Load a batch of seed routes. Returns how many were written.
    pub fn seed_routes(&self, routes: &[Route]) -> ComplianceResult<usize> {
        for route in routes {
            self.upsert_route(route)?;
        }
        log::info!("seeded {} routes", routes.len());
        Ok(routes.len())
    }

    pub fn routes(&self, filter: &RouteFilter) -> ComplianceResult<Vec<Route>> {
        self.store.routes(filter)
    }

    pub fn set_baseline(&self, route_id: &str) -> ComplianceResult<Route> {
        let route = self.store.set_baseline(route_id, self.clock.now())?;
        log::info!("baseline for {} is now {}", route.year, route.route_id);
        Ok(route)
    }

    pub fn comparison(&self, year: Year) -> ComplianceResult<ComparisonReport> {
        let baseline = self
            .store
            .baseline_route(year)?
            .ok_or_else(|| ComplianceError::NotFound {
                what: "baseline route",
                key: year.to_string(),
            })?;
        let routes = self.store.routes(&RouteFilter {
            year: Some(year),
            ..Default::default()
        })?;
        compare_routes(&baseline, &routes, self.config.target_intensity)
    }

    // ── Compliance balance ────────────────────────────────────────

    /// Compute CB from the vessel's voyage record and store a new snapshot.
    pub fn compute_cb(&self, vessel_id: &str, year: Year) -> ComplianceResult<CbReport> {
        let route = self
            .store
            .get_route(vessel_id)?
            .filter(|r| r.year == year)
            .ok_or_else(|| ComplianceError::NotFound {
                what: "route",
                key: format!("{vessel_id}/{year}"),
            })?;

        let result = compute_cb_for(&self.config, route.ghg_intensity, route.fuel_consumption)?;
        let snapshot = ComplianceSnapshot::new(vessel_id, year, result.cb, self.clock.now());
        let event = ComplianceEvent::CbComputed {
            vessel_id: vessel_id.to_string(),
            year,
            snapshot_id: snapshot.snapshot_id.clone(),
            cb: result.cb,
            energy_scope: result.energy_scope,
        };
        self.store.insert_snapshot(&snapshot, &event)?;
        log::info!("CB for {vessel_id}/{year}: {} gCO2e", result.cb);

        Ok(CbReport {
            vessel_id: vessel_id.to_string(),
            year,
            cb: result.cb,
            energy_scope: result.energy_scope,
            snapshot_id: snapshot.snapshot_id,
        })
    }

    /// Latest CB snapshot plus the vessel's bank balance for the year.
    pub fn adjusted_cb(&self, vessel_id: &str, year: Year) -> ComplianceResult<AdjustedCb> {
        let latest = self
            .store
            .latest_snapshot(vessel_id, year)?
            .ok_or_else(|| ComplianceError::NotFound {
                what: "CB snapshot",
                key: format!("{vessel_id}/{year}"),
            })?;
        let bank_balance = self.ledger().balance(vessel_id, year)?;
        Ok(AdjustedCb {
            vessel_id: vessel_id.to_string(),
            year,
            cb_before: latest.cb_gco2e,
            bank_balance,
            cb_after: latest.cb_gco2e + bank_balance,
        })
    }

    // ── Banking ───────────────────────────────────────────────────

    pub fn bank_records(&self, vessel_id: &str, year: Year) -> ComplianceResult<BankRecords> {
        let ledger = self.ledger();
        Ok(BankRecords {
            vessel_id: vessel_id.to_string(),
            year,
            balance: ledger.balance(vessel_id, year)?,
            entries: ledger.entries(vessel_id, year)?,
        })
    }

    pub fn bank_surplus(&self, vessel_id: &str, year: Year, amount: Gco2e) -> ComplianceResult<LedgerReceipt> {
        self.ledger().create_entry(vessel_id, year, amount)
    }

    pub fn apply_banked(&self, vessel_id: &str, year: Year, amount: Gco2e) -> ComplianceResult<LedgerReceipt> {
        self.ledger().apply_amount(vessel_id, year, amount)
    }

    // ── Pooling ───────────────────────────────────────────────────

    /// Allocate the pool, then persist it with all members and its audit
    /// event atomically.
    pub fn create_pool(&self, year: Year, members: &[PoolMemberInput]) -> ComplianceResult<Pool> {
        let allocated = allocate_pool(members)?;
        let pool = Pool {
            pool_id: uuid::Uuid::new_v4().to_string(),
            year,
            created_at: self.clock.now(),
            members: allocated,
        };
        self.store.insert_pool(&pool)?;

        log::info!(
            "pool {} created for {year} with {} members",
            pool.pool_id,
            pool.members.len()
        );
        Ok(pool)
    }

    pub fn pool(&self, pool_id: &str) -> ComplianceResult<Pool> {
        self.store
            .get_pool(pool_id)?
            .ok_or_else(|| ComplianceError::NotFound {
                what: "pool",
                key: pool_id.to_string(),
            })
    }

    // ── Audit ─────────────────────────────────────────────────────

    pub fn events(&self) -> ComplianceResult<Vec<EventLogEntry>> {
        self.store.events()
    }

    // ── Command dispatch ──────────────────────────────────────────

    /// Run one transport command and return its JSON response body.
    /// `Quit` is a transport concern and yields `Value::Null`.
    pub fn execute(&self, command: DeskCommand) -> ComplianceResult<serde_json::Value> {
        let value = match command {
            DeskCommand::ListRoutes { filter } => serde_json::to_value(self.routes(&filter)?)?,
            DeskCommand::SetBaseline { route_id } => serde_json::to_value(self.set_baseline(&route_id)?)?,
            DeskCommand::Comparison { year } => serde_json::to_value(self.comparison(year)?)?,
            DeskCommand::ComputeCb { vessel_id, year } => {
                serde_json::to_value(self.compute_cb(&vessel_id, year)?)?
            }
            DeskCommand::AdjustedCb { vessel_id, year } => {
                serde_json::to_value(self.adjusted_cb(&vessel_id, year)?)?
            }
            DeskCommand::BankRecords { vessel_id, year } => {
                serde_json::to_value(self.bank_records(&vessel_id, year)?)?
            }
            DeskCommand::Bank { vessel_id, year, amount } => {
                serde_json::to_value(self.bank_surplus(&vessel_id, year, amount)?)?
            }
            DeskCommand::Apply { vessel_id, year, amount } => {
                serde_json::to_value(self.apply_banked(&vessel_id, year, amount)?)?
            }
            DeskCommand::CreatePool { year, members } => {
                serde_json::to_value(self.create_pool(year, &members)?)?
            }
            DeskCommand::GetPool { pool_id } => serde_json::to_value(self.pool(&pool_id)?)?,
            DeskCommand::Quit => serde_json::Value::Null,
        };
        Ok(value)
    }
}

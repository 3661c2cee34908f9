//! FuelEU compliance desk: Compliance Balance accounting for vessels.
//!
//! Engine modules (no I/O):
//!   compliance_balance  CB and energy in scope from fuel and intensity
//!   comparison          deviation from a baseline route, verdict vs target
//!   banking             append-only surplus ledger per (vessel, year)
//!   pooling             greedy largest-first pool allocation
//!
//! Around them: `store` (SQLite), `desk` (use-cases), `event` (audit log)
//! and `command` (transport commands).

pub mod banking;
pub mod clock;
pub mod command;
pub mod comparison;
pub mod compliance_balance;
pub mod config;
pub mod desk;
pub mod error;
pub mod event;
pub mod pooling;
pub mod route;
pub mod snapshot;
pub mod store;
pub mod types;

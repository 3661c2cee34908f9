//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! Engine modules and the desk call store methods; they never execute SQL directly.

use crate::{
    clock::{from_micros, to_micros},
    error::ComplianceResult,
    event::{ComplianceEvent, EventLogEntry},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::time::Duration;

mod banking;
mod compliance;
mod pool;
mod route;

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Append an audit row on `conn`. Callers pass the open transaction of the
/// change being audited, so the change and its event commit together.
fn log_event_on(conn: &Connection, event: &ComplianceEvent, at: DateTime<Utc>) -> ComplianceResult<()> {
    let payload = serde_json::to_string(event)?;
    conn.execute(
        "INSERT INTO event_log (event_type, payload, created_at) VALUES (?1, ?2, ?3)",
        params![event.type_name(), payload, to_micros(at)],
    )?;
    Ok(())
}

pub struct ComplianceStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ComplianceStore {
    pub fn open(path: &str) -> ComplianceResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // Writers queue behind each other instead of failing with SQLITE_BUSY.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ComplianceResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Open a second connection to the same database.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> ComplianceResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ComplianceResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_routes.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_compliance.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_banking.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/005_pooling.sql"))?;
        Ok(())
    }

    /// Start a write transaction that takes the database write lock up front,
    /// so a read inside it cannot go stale before the write lands.
    fn immediate(&self) -> ComplianceResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn events(&self) -> ComplianceResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, payload, created_at
             FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload: row.get(2)?,
                    created_at: from_micros(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self) -> ComplianceResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM event_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

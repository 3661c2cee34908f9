use super::{log_event_on, ComplianceStore};
use crate::{
    clock::{from_micros, to_micros},
    error::ComplianceResult,
    event::ComplianceEvent,
    snapshot::ComplianceSnapshot,
    types::Year,
};
use rusqlite::{params, OptionalExtension, Row};

fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<ComplianceSnapshot> {
    Ok(ComplianceSnapshot {
        snapshot_id: row.get(0)?,
        vessel_id: row.get(1)?,
        year: row.get(2)?,
        cb_gco2e: row.get(3)?,
        created_at: from_micros(row.get(4)?),
    })
}

impl ComplianceStore {
    // ── CB snapshots ──────────────────────────────────────────────

    /// Store a snapshot together with the event that describes it.
    pub fn insert_snapshot(
        &self,
        snapshot: &ComplianceSnapshot,
        event: &ComplianceEvent,
    ) -> ComplianceResult<()> {
        let tx = self.immediate()?;
        tx.execute(
            "INSERT INTO compliance_snapshot (snapshot_id, vessel_id, year, cb_gco2e, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                snapshot.snapshot_id,
                snapshot.vessel_id,
                snapshot.year,
                snapshot.cb_gco2e,
                to_micros(snapshot.created_at),
            ],
        )?;
        log_event_on(&tx, event, snapshot.created_at)?;
        tx.commit()?;
        Ok(())
    }

    /// The authoritative snapshot: latest by creation time, then by insertion order.
    pub fn latest_snapshot(
        &self,
        vessel_id: &str,
        year: Year,
    ) -> ComplianceResult<Option<ComplianceSnapshot>> {
        let snapshot = self
            .conn
            .query_row(
                "SELECT snapshot_id, vessel_id, year, cb_gco2e, created_at
                 FROM compliance_snapshot
                 WHERE vessel_id = ?1 AND year = ?2
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![vessel_id, year],
                snapshot_from_row,
            )
            .optional()?;
        Ok(snapshot)
    }

    /// All snapshots for a vessel/year, newest first.
    pub fn snapshots(&self, vessel_id: &str, year: Year) -> ComplianceResult<Vec<ComplianceSnapshot>> {
        let mut stmt = self.conn.prepare(
            "SELECT snapshot_id, vessel_id, year, cb_gco2e, created_at
             FROM compliance_snapshot
             WHERE vessel_id = ?1 AND year = ?2
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![vessel_id, year], snapshot_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

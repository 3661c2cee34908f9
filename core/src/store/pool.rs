use super::{log_event_on, ComplianceStore};
use crate::{
    clock::{from_micros, to_micros},
    error::ComplianceResult,
    event::ComplianceEvent,
    pooling::{Pool, PoolMemberResult},
    types::Year,
};
use rusqlite::{params, OptionalExtension};

impl ComplianceStore {
    // ── Pools ─────────────────────────────────────────────────────

    /// Write the pool row, every member row and the `PoolCreated` event in
    /// one transaction. Either the whole pool is visible afterwards or none
    /// of it is.
    pub fn insert_pool(&self, pool: &Pool) -> ComplianceResult<()> {
        let tx = self.immediate()?;
        tx.execute(
            "INSERT INTO pool (pool_id, year, created_at) VALUES (?1, ?2, ?3)",
            params![pool.pool_id, pool.year, to_micros(pool.created_at)],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pool_member (pool_id, vessel_id, position, cb_before, cb_after)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, m) in pool.members.iter().enumerate() {
                stmt.execute(params![
                    pool.pool_id,
                    m.vessel_id,
                    position as i64,
                    m.cb_before,
                    m.cb_after,
                ])?;
            }
        }
        log_event_on(
            &tx,
            &ComplianceEvent::PoolCreated {
                pool_id: pool.pool_id.clone(),
                year: pool.year,
                member_count: pool.members.len(),
            },
            pool.created_at,
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_pool(&self, pool_id: &str) -> ComplianceResult<Option<Pool>> {
        let header: Option<(Year, i64)> = self
            .conn
            .query_row(
                "SELECT year, created_at FROM pool WHERE pool_id = ?1",
                params![pool_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((year, created_at)) = header else {
            return Ok(None);
        };
        Ok(Some(Pool {
            pool_id: pool_id.to_string(),
            year,
            created_at: from_micros(created_at),
            members: self.pool_members(pool_id)?,
        }))
    }

    /// Members in the order they were submitted.
    pub fn pool_members(&self, pool_id: &str) -> ComplianceResult<Vec<PoolMemberResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT vessel_id, cb_before, cb_after FROM pool_member
             WHERE pool_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![pool_id], |row| {
            Ok(PoolMemberResult {
                vessel_id: row.get(0)?,
                cb_before: row.get(1)?,
                cb_after: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn pool_ids_for_year(&self, year: Year) -> ComplianceResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT pool_id FROM pool WHERE year = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![year], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn pool_count(&self) -> ComplianceResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pool", [], |row| row.get(0))?;
        Ok(count)
    }
}

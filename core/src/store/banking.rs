use super::{log_event_on, ComplianceStore};
use crate::{
    banking::BankEntry,
    clock::{from_micros, to_micros},
    error::ComplianceResult,
    event::ComplianceEvent,
    types::Year,
};
use rusqlite::{params, Connection};

fn balance_on(conn: &Connection, vessel_id: &str, year: Year) -> rusqlite::Result<f64> {
    // TOTAL() is 0.0 over an empty set, unlike SUM().
    conn.query_row(
        "SELECT TOTAL(amount_gco2e) FROM bank_entry WHERE vessel_id = ?1 AND year = ?2",
        params![vessel_id, year],
        |row| row.get(0),
    )
}

fn insert_on(conn: &Connection, entry: &BankEntry) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO bank_entry (entry_id, vessel_id, year, amount_gco2e, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.entry_id,
            entry.vessel_id,
            entry.year,
            entry.amount_gco2e,
            to_micros(entry.created_at),
        ],
    )?;
    Ok(())
}

impl ComplianceStore {
    // ── Bank ledger ───────────────────────────────────────────────

    pub fn bank_balance(&self, vessel_id: &str, year: Year) -> ComplianceResult<f64> {
        Ok(balance_on(&self.conn, vessel_id, year)?)
    }

    /// Read the balance for the entry's key, let `check` accept or reject it,
    /// then append the entry and the event `audit` builds from the balance
    /// after the append, all inside one immediate transaction.
    /// Returns the balance after the append.
    pub fn append_bank_entry_checked<F, A>(
        &self,
        entry: &BankEntry,
        check: F,
        audit: A,
    ) -> ComplianceResult<f64>
    where
        F: FnOnce(f64) -> ComplianceResult<()>,
        A: FnOnce(f64) -> ComplianceEvent,
    {
        let tx = self.immediate()?;
        let balance = balance_on(&tx, &entry.vessel_id, entry.year)?;
        check(balance)?;
        insert_on(&tx, entry)?;
        let after = balance + entry.amount_gco2e;
        log_event_on(&tx, &audit(after), entry.created_at)?;
        tx.commit()?;
        Ok(after)
    }

    /// Journal for a vessel/year, oldest first.
    pub fn bank_entries(&self, vessel_id: &str, year: Year) -> ComplianceResult<Vec<BankEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, vessel_id, year, amount_gco2e, created_at
             FROM bank_entry
             WHERE vessel_id = ?1 AND year = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![vessel_id, year], |row| {
            Ok(BankEntry {
                entry_id: row.get(0)?,
                vessel_id: row.get(1)?,
                year: row.get(2)?,
                amount_gco2e: row.get(3)?,
                created_at: from_micros(row.get(4)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn bank_entry_count(&self, vessel_id: &str, year: Year) -> ComplianceResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bank_entry WHERE vessel_id = ?1 AND year = ?2",
            params![vessel_id, year],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComplianceError;
    use chrono::Utc;

    fn store() -> ComplianceStore {
        let store = ComplianceStore::in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    fn entry(id: &str, amount: f64) -> BankEntry {
        BankEntry {
            entry_id: id.into(),
            vessel_id: "V1".into(),
            year: 2024,
            amount_gco2e: amount,
            created_at: Utc::now(),
        }
    }

    fn banked(e: &BankEntry) -> impl FnOnce(f64) -> ComplianceEvent + '_ {
        move |balance| ComplianceEvent::SurplusBanked {
            vessel_id: e.vessel_id.clone(),
            year: e.year,
            entry_id: e.entry_id.clone(),
            amount: e.amount_gco2e,
            balance,
        }
    }

    #[test]
    fn entries_cannot_be_updated_or_deleted() {
        let store = store();
        let entry = entry("E1", 500.0);
        store.append_bank_entry_checked(&entry, |_| Ok(()), banked(&entry)).unwrap();

        assert!(store
            .conn
            .execute("UPDATE bank_entry SET amount_gco2e = 1 WHERE entry_id = 'E1'", [])
            .is_err());
        assert!(store
            .conn
            .execute("DELETE FROM bank_entry WHERE entry_id = 'E1'", [])
            .is_err());
        assert_eq!(store.bank_balance("V1", 2024).unwrap(), 500.0);
    }

    #[test]
    fn rejected_check_appends_nothing() {
        let store = store();
        let entry = entry("E1", -5.0);
        let result = store.append_bank_entry_checked(
            &entry,
            |_| Err(ComplianceError::InsufficientBalance { requested: 5.0, available: 0.0 }),
            banked(&entry),
        );
        assert!(result.is_err());
        assert_eq!(store.bank_entry_count("V1", 2024).unwrap(), 0);
        assert_eq!(store.event_count().unwrap(), 0);
    }

    #[test]
    fn entry_and_event_commit_together() {
        let store = store();
        let entry = entry("E1", 250.0);
        let after = store.append_bank_entry_checked(&entry, |_| Ok(()), banked(&entry)).unwrap();
        assert_eq!(after, 250.0);
        let events = store.events().unwrap();
        assert_eq!(events.len(), 1);
        match events[0].decode().unwrap() {
            ComplianceEvent::SurplusBanked { entry_id, balance, .. } => {
                assert_eq!(entry_id, "E1");
                assert_eq!(balance, 250.0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn failed_audit_write_leaves_no_entry() {
        let store = store();
        store.conn.execute_batch("DROP TABLE event_log;").unwrap();
        let entry = entry("E1", 250.0);
        assert!(store.append_bank_entry_checked(&entry, |_| Ok(()), banked(&entry)).is_err());
        assert_eq!(store.bank_entry_count("V1", 2024).unwrap(), 0);
        assert_eq!(store.bank_balance("V1", 2024).unwrap(), 0.0);
    }
}

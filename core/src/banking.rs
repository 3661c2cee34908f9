//! Banking ledger: an append-only journal of signed CB amounts per
//! (vessel, year).
//!
//!   balance = sum(entries)
//!   bank    -> append +amount
//!   apply   -> append -amount, only if balance covers it
//!
//! Entries are never edited or deleted. A reversal is a new offsetting
//! entry. The apply check, the append and its audit event run in one store
//! transaction, so two concurrent applies cannot both spend the same balance.

use crate::{
    clock::Clock,
    error::{ComplianceError, ComplianceResult},
    event::ComplianceEvent,
    store::ComplianceStore,
    types::{Gco2e, VesselId, Year, BALANCE_TOLERANCE},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankEntry {
    pub entry_id:     String,
    pub vessel_id:    VesselId,
    pub year:         Year,
    /// Positive = banked surplus, negative = applied surplus.
    pub amount_gco2e: Gco2e,
    pub created_at:   DateTime<Utc>,
}

impl BankEntry {
    fn new(vessel_id: &str, year: Year, amount_gco2e: Gco2e, created_at: DateTime<Utc>) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            vessel_id: vessel_id.to_string(),
            year,
            amount_gco2e,
            created_at,
        }
    }
}

/// An appended entry together with the key's balance after it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerReceipt {
    pub entry:   BankEntry,
    pub balance: Gco2e,
}

pub struct BankingLedger<'a> {
    store: &'a ComplianceStore,
    clock: &'a dyn Clock,
}

impl<'a> BankingLedger<'a> {
    pub fn new(store: &'a ComplianceStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Bank a surplus: append a positive entry.
    pub fn create_entry(&self, vessel_id: &str, year: Year, amount: Gco2e) -> ComplianceResult<LedgerReceipt> {
        require_positive(amount)?;
        let entry = BankEntry::new(vessel_id, year, amount, self.clock.now());
        let balance = self.store.append_bank_entry_checked(
            &entry,
            |_| Ok(()),
            |balance| ComplianceEvent::SurplusBanked {
                vessel_id: entry.vessel_id.clone(),
                year,
                entry_id: entry.entry_id.clone(),
                amount,
                balance,
            },
        )?;
        log::info!("banked {amount} for {vessel_id}/{year}; balance {balance}");
        Ok(LedgerReceipt { entry, balance })
    }

    /// Sum of all entries for the key; zero when there are none.
    pub fn balance(&self, vessel_id: &str, year: Year) -> ComplianceResult<Gco2e> {
        self.store.bank_balance(vessel_id, year)
    }

    /// Spend banked surplus: append `-amount` if the balance covers it.
    pub fn apply_amount(&self, vessel_id: &str, year: Year, amount: Gco2e) -> ComplianceResult<LedgerReceipt> {
        require_positive(amount)?;
        let entry = BankEntry::new(vessel_id, year, -amount, self.clock.now());
        let balance = self.store.append_bank_entry_checked(
            &entry,
            |available| {
                if available < amount - BALANCE_TOLERANCE {
                    return Err(ComplianceError::InsufficientBalance {
                        requested: amount,
                        available,
                    });
                }
                Ok(())
            },
            |balance| ComplianceEvent::SurplusApplied {
                vessel_id: entry.vessel_id.clone(),
                year,
                entry_id: entry.entry_id.clone(),
                amount,
                balance,
            },
        )?;
        log::info!("applied {amount} for {vessel_id}/{year}; balance {balance}");
        Ok(LedgerReceipt { entry, balance })
    }

    /// The journal for the key, oldest first.
    pub fn entries(&self, vessel_id: &str, year: Year) -> ComplianceResult<Vec<BankEntry>> {
        self.store.bank_entries(vessel_id, year)
    }
}

fn require_positive(amount: Gco2e) -> ComplianceResult<()> {
    // NaN is rejected too.
    if !(amount > 0.0) || !amount.is_finite() {
        return Err(ComplianceError::InvalidAmount { amount });
    }
    Ok(())
}

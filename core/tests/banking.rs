//! Integration tests for the banking ledger: the balance/apply invariant,
//! append-only storage, and serialized applies across connections.

use fueleu_core::{
    banking::BankingLedger,
    clock::SystemClock,
    desk::ComplianceDesk,
    error::ComplianceError,
    store::ComplianceStore,
};
use std::thread;

fn build() -> ComplianceDesk {
    let _ = env_logger::builder().is_test(true).try_init();
    ComplianceDesk::build_test().expect("build_test failed")
}

#[test]
fn bank_apply_and_overdraw() {
    let desk = build();

    let banked = desk.bank_surplus("S1", 2024, 1000.0).unwrap();
    assert_eq!(banked.entry.amount_gco2e, 1000.0);
    assert_eq!(banked.balance, 1000.0);

    let applied = desk.apply_banked("S1", 2024, 400.0).unwrap();
    assert_eq!(applied.entry.amount_gco2e, -400.0);
    assert_eq!(applied.balance, 600.0);

    let records = desk.bank_records("S1", 2024).unwrap();
    assert_eq!(records.balance, 600.0);
    let amounts: Vec<_> = records.entries.iter().map(|e| e.amount_gco2e).collect();
    assert_eq!(amounts, [1000.0, -400.0]);

    let err = desk.apply_banked("S1", 2024, records.balance + 1.0).unwrap_err();
    match err {
        ComplianceError::InsufficientBalance { requested, available } => {
            assert_eq!(requested, 601.0);
            assert_eq!(available, 600.0);
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    // The rejected apply left no trace.
    assert_eq!(desk.bank_records("S1", 2024).unwrap().entries.len(), 2);
}

#[test]
fn unknown_key_reads_as_zero() {
    let desk = build();
    let records = desk.bank_records("GHOST", 2031).unwrap();
    assert_eq!(records.balance, 0.0);
    assert!(records.entries.is_empty());
}

#[test]
fn apply_on_empty_ledger_is_insufficient() {
    let desk = build();
    let err = desk.apply_banked("S1", 2024, 1.0).unwrap_err();
    assert!(matches!(err, ComplianceError::InsufficientBalance { .. }));
    assert_eq!(err.kind(), "insufficient_balance");
}

#[test]
fn non_positive_amounts_are_invalid() {
    let desk = build();
    let err = desk.bank_surplus("S1", 2024, 0.0).unwrap_err();
    assert!(matches!(err, ComplianceError::InvalidAmount { .. }));
    let err = desk.apply_banked("S1", 2024, -10.0).unwrap_err();
    assert!(matches!(err, ComplianceError::InvalidAmount { .. }));
    assert_eq!(err.kind(), "invalid_amount");
}

#[test]
fn balance_is_the_sum_of_many_entries() {
    let desk = build();
    for i in 1..=50 {
        desk.bank_surplus("S1", 2024, i as f64).unwrap();
    }
    for _ in 0..10 {
        desk.apply_banked("S1", 2024, 100.0).unwrap();
    }
    // 1 + 2 + ... + 50 = 1275
    let records = desk.bank_records("S1", 2024).unwrap();
    assert_eq!(records.entries.len(), 60);
    assert!((records.balance - 275.0).abs() < 1e-9);
}

#[test]
fn concurrent_applies_never_overdraw() {
    let _ = env_logger::builder().is_test(true).try_init();

    let path = std::env::temp_dir().join(format!("fueleu-ledger-{}.db", uuid::Uuid::new_v4()));
    let path = path.to_string_lossy().to_string();

    let store = ComplianceStore::open(&path).expect("open file store");
    store.migrate().expect("migration");
    BankingLedger::new(&store, &SystemClock)
        .create_entry("V1", 2024, 1000.0)
        .unwrap();

    // Eight independent connections race to spend 300 each out of 1000.
    let stores: Vec<ComplianceStore> = (0..8).map(|_| store.reopen().expect("reopen")).collect();
    let handles: Vec<_> = stores
        .into_iter()
        .map(|s| {
            thread::spawn(move || {
                let ledger = BankingLedger::new(&s, &SystemClock);
                ledger.apply_amount("V1", 2024, 300.0)
            })
        })
        .collect();

    let mut succeeded = 0;
    let mut refused = 0;
    for h in handles {
        match h.join().expect("thread panicked") {
            Ok(_) => succeeded += 1,
            Err(ComplianceError::InsufficientBalance { .. }) => refused += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let ledger = BankingLedger::new(&store, &SystemClock);
    assert_eq!(succeeded, 3);
    assert_eq!(refused, 5);
    assert_eq!(ledger.balance("V1", 2024).unwrap(), 100.0);
    assert_eq!(ledger.entries("V1", 2024).unwrap().len(), 4);

    drop(ledger);
    drop(store);
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}

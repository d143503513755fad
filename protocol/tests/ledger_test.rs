//! Ledger contract tests, run against both backends through the `Ledger`
//! trait.

use vault_gate_protocol::crypto::{Address, Keypair};
use vault_gate_protocol::storage::{Ledger, LedgerError, MemoryLedger, SledLedger, WriteSet};

fn addr(b: u8) -> Address {
    Address::new([b; 32])
}

fn exercise_commit_semantics<L: Ledger>(ledger: &L) {
    let mut set = WriteSet::new();
    set.put(addr(1), vec![1; 16]);
    set.put(addr(2), vec![2; 16]);
    ledger.commit(set).unwrap();
    assert!(ledger.exists(&addr(1)).unwrap());

    // Overwrite in place, delete, create: all in one commit.
    let mut set = WriteSet::new();
    set.put(addr(1), vec![9; 16]);
    set.delete(addr(2));
    set.put(addr(3), vec![3; 32]);
    ledger.commit(set).unwrap();
    assert_eq!(ledger.read(&addr(1)).unwrap(), Some(vec![9; 16]));
    assert!(ledger.read(&addr(2)).unwrap().is_none());
    assert_eq!(ledger.read(&addr(3)).unwrap().map(|v| v.len()), Some(32));

    // A resize anywhere in the set rejects the whole set.
    let mut set = WriteSet::new();
    set.put(addr(4), vec![4; 8]);
    set.put(addr(3), vec![3; 64]);
    assert!(matches!(
        ledger.commit(set),
        Err(LedgerError::CapacityChanged { capacity: 32, attempted: 64, .. })
    ));
    assert!(!ledger.exists(&addr(4)).unwrap());

    // A deleted slot may be re-created at another size.
    let mut set = WriteSet::new();
    set.put(addr(2), vec![2; 48]);
    ledger.commit(set).unwrap();
    assert_eq!(ledger.read(&addr(2)).unwrap().map(|v| v.len()), Some(48));
}

#[test]
fn memory_ledger_commit_semantics() {
    exercise_commit_semantics(&MemoryLedger::new());
}

#[test]
fn sled_ledger_commit_semantics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ledger = SledLedger::open(dir.path()).unwrap();
    exercise_commit_semantics(&ledger);
    assert_eq!(ledger.commit_count().unwrap(), 3);
}

#[test]
fn derived_account_addresses_are_stable_and_keyed_by_owner() {
    let owner = Keypair::from_seed(&[7; 32]).address();
    let vault = Address::derive(&[b"vault", owner.as_ref(), &0u64.to_le_bytes()]);
    assert_eq!(vault, Address::derive(&[b"vault", owner.as_ref(), &0u64.to_le_bytes()]));

    let text = vault.to_string();
    let parsed: Address = text.parse().unwrap();
    assert_eq!(parsed, vault);
    let parsed_hex: Address = vault.to_hex().parse().unwrap();
    assert_eq!(parsed_hex, vault);
}

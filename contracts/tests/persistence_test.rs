//! The gate on a sled ledger: state survives a reopen, and a rejected
//! instruction leaves the database untouched.

use vault_gate_contracts::{GateAction, GateError, Instruction, Outcome, PolicyTerms, Vault, VaultGate};
use vault_gate_protocol::clock::FixedClock;
use vault_gate_protocol::crypto::Keypair;
use vault_gate_protocol::storage::SledLedger;

#[test]
fn pending_action_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let owner = Keypair::from_seed(&[0xAA; 32]);
    let a = Keypair::from_seed(&[1; 32]);
    let b = Keypair::from_seed(&[2; 32]);
    let vault = Vault::address_for(&owner.address(), 7);

    let pending = {
        let gate = VaultGate::new(SledLedger::open(dir.path()).unwrap(), FixedClock::new(0));
        let init = Instruction::initialize_with(
            owner.address(),
            7,
            PolicyTerms::threshold(2, vec![a.address(), b.address()]),
        );
        gate.process(&init.sign(&[&owner]).unwrap()).unwrap();

        let propose = Instruction::propose(vault, 0, GateAction::Deposit { amount: 42 });
        let receipt = gate.process(&propose.sign(&[&a]).unwrap()).unwrap();
        match receipt.outcome {
            Outcome::Pending { pending, .. } => pending,
            other => panic!("unexpected outcome {other:?}"),
        }
    };

    let ledger = SledLedger::open(dir.path()).unwrap();
    assert_eq!(ledger.commit_count().unwrap(), 2);
    let gate = VaultGate::new(ledger, FixedClock::new(0));
    assert_eq!(gate.pending(&vault).unwrap().unwrap().approvals, vec![a.address()]);

    let approve = Instruction::approve(vault, 1, pending);
    let receipt = gate.process(&approve.sign(&[&b]).unwrap()).unwrap();
    assert!(matches!(receipt.outcome, Outcome::Executed { .. }));
    assert_eq!(gate.vault(&vault).unwrap().balance, 42);
    assert_eq!(gate.ledger().commit_count().unwrap(), 3);
}

#[test]
fn rejected_instruction_commits_nothing() {
    let gate = VaultGate::new(SledLedger::open_temporary().unwrap(), FixedClock::new(0));
    let owner = Keypair::from_seed(&[0xAA; 32]);
    let vault = Vault::address_for(&owner.address(), 0);
    gate.process(&Instruction::initialize(owner.address(), 0).sign(&[&owner]).unwrap())
        .unwrap();

    let slash = Instruction::propose(vault, 0, GateAction::Slash { amount: 1 });
    assert!(matches!(
        gate.process(&slash.sign(&[&owner]).unwrap()),
        Err(GateError::InsufficientFunds { .. })
    ));
    assert_eq!(gate.ledger().commit_count().unwrap(), 1);
    assert_eq!(gate.ledger().account_count(), 2);
}

//! # Instruction Dispatcher
//!
//! Entry point of the gate. Each instruction is handled in three steps:
//!
//! 1. Load and validate the accounts it touches.
//! 2. Resolve signer roles and ask the evaluator for a decision.
//! 3. Stage every resulting account write into one [`WriteSet`] and hand it
//!    to the ledger in a single atomic commit.
//!
//! Any error before or during the commit leaves the ledger untouched. A
//! successful instruction always bumps the vault sequence by exactly one.
//!
//! ## Vault lifecycle
//!
//! ```text
//!                initialize
//! Uninitialized ───────────▶ Active ◀──────────────────────┐
//!                              │                           │
//!                              │ propose (Defer)           │ approve (Allow) / cancel / expiry
//!                              ▼                           │
//!                        PendingAction ────────────────────┘
//! ```
//!
//! There is no in-process locking. Concurrent writers are serialized by the
//! ledger and detected through `expected_sequence`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vault_gate_protocol::clock::Clock;
use vault_gate_protocol::config::{ALLOWANCE_PERIOD_SECS, DEFAULT_EXPIRY_WINDOW};
use vault_gate_protocol::crypto::{blake3_hash_multi, Address};
use vault_gate_protocol::storage::{Ledger, WriteSet};

use crate::action::{self, ExecutionContext, GateAction};
use crate::authorization::{require_authorized, VerifiedSigners};
use crate::error::{GateError, GateResult};
use crate::evaluator::{evaluate, Decision};
use crate::instruction::{Instruction, InstructionPayload, SignedInstruction};
use crate::state::{
    load, load_optional, persist, Allowance, GatePolicy, PendingAction, PolicyTerms, Vault,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime knobs of a gate deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Sequence numbers a pending action survives past its creation.
    pub expiry_window: u64,
    /// Seconds before an untouched allowance lapses.
    pub allowance_period_secs: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            expiry_window: DEFAULT_EXPIRY_WINDOW,
            allowance_period_secs: ALLOWANCE_PERIOD_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// What a committed instruction did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Initialized,
    /// The action ran and its effects are committed.
    Executed { action: String },
    /// Stored (or updated) a pending action still short of approvals.
    Pending { pending: Address, missing: usize },
    Cancelled { pending: Address },
    /// The pending action had outlived its window and was discarded.
    Expired { pending: Address },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Initialized => write!(f, "initialized"),
            Outcome::Executed { action } => write!(f, "executed {action}"),
            Outcome::Pending { missing, .. } => write!(f, "pending ({missing} missing)"),
            Outcome::Cancelled { .. } => write!(f, "cancelled"),
            Outcome::Expired { .. } => write!(f, "expired"),
        }
    }
}

/// Proof of a committed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hex BLAKE3 over vault, new sequence, and the instruction bytes.
    pub tx_id: String,
    pub vault: Address,
    /// Vault sequence after the commit.
    pub sequence: u64,
    pub outcome: Outcome,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// The gate program bound to a ledger and a clock.
pub struct VaultGate<L: Ledger, C: Clock> {
    ledger: L,
    clock: C,
    config: GateConfig,
}

/// Vault and policy of an initialized vault, as loaded for one instruction.
struct ActiveVault {
    address: Address,
    vault: Vault,
    policy: GatePolicy,
}

impl ActiveVault {
    fn terms(&self) -> &PolicyTerms {
        &self.policy.terms
    }
}

/// Staged result of a handler, ready to commit.
struct Staged {
    writes: WriteSet,
    sequence: u64,
    outcome: Outcome,
}

impl<L: Ledger, C: Clock> VaultGate<L, C> {
    pub fn new(ledger: L, clock: C) -> Self {
        Self::with_config(ledger, clock, GateConfig::default())
    }

    pub fn with_config(ledger: L, clock: C, config: GateConfig) -> Self {
        Self {
            ledger,
            clock,
            config,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    // -- Queries ------------------------------------------------------------

    pub fn vault(&self, address: &Address) -> GateResult<Vault> {
        load(&self.ledger, address)
    }

    pub fn policy(&self, vault: &Address) -> GateResult<GatePolicy> {
        load(&self.ledger, &GatePolicy::address_for(vault))
    }

    /// The outstanding pending action of a vault, if any.
    pub fn pending(&self, vault: &Address) -> GateResult<Option<PendingAction>> {
        match self.vault(vault)?.pending {
            Some(address) => load(&self.ledger, &address).map(Some),
            None => Ok(None),
        }
    }

    pub fn allowance(&self, vault: &Address, beneficiary: &Address) -> GateResult<Option<Allowance>> {
        load_optional(&self.ledger, &Allowance::address_for(vault, beneficiary))
    }

    // -- Entry points -------------------------------------------------------

    /// Verify signatures, then run the instruction.
    pub fn process(&self, signed: &SignedInstruction) -> GateResult<Receipt> {
        let signers = signed.verify()?;
        self.execute(&signed.instruction, &signers)
    }

    /// Run an instruction for an already-verified signer set.
    pub fn execute(&self, ix: &Instruction, signers: &VerifiedSigners) -> GateResult<Receipt> {
        let now = self.clock.unix_timestamp();

        let staged = match &ix.payload {
            InstructionPayload::Initialize {
                owner,
                vault_id,
                policy,
            } => self.initialize(ix, owner, *vault_id, policy, signers)?,
            InstructionPayload::Propose { action } => self.propose(ix, action, signers, now)?,
            InstructionPayload::Approve { pending } => self.approve(ix, pending, signers, now)?,
            InstructionPayload::Cancel { pending } => self.cancel(ix, pending, signers)?,
        };

        let tx_id = transaction_id(ix, staged.sequence)?;
        let writes = staged.writes.len();
        self.ledger.commit(staged.writes)?;

        info!(
            vault = %ix.vault,
            instruction = ix.payload.name(),
            sequence = staged.sequence,
            writes,
            outcome = %staged.outcome,
            tx_id = %tx_id,
            "instruction committed"
        );

        Ok(Receipt {
            tx_id,
            vault: ix.vault,
            sequence: staged.sequence,
            outcome: staged.outcome,
        })
    }

    // -- Handlers -----------------------------------------------------------

    fn initialize(
        &self,
        ix: &Instruction,
        owner: &Address,
        vault_id: u64,
        terms: &PolicyTerms,
        signers: &VerifiedSigners,
    ) -> GateResult<Staged> {
        let expected = Vault::address_for(owner, vault_id);
        if expected != ix.vault {
            return Err(GateError::AddressMismatch {
                expected,
                found: ix.vault,
            });
        }

        let policy_address = GatePolicy::address_for(&ix.vault);
        if self.ledger.exists(&ix.vault)? || self.ledger.exists(&policy_address)? {
            return Err(GateError::AlreadyInitialized(ix.vault));
        }

        if !signers.contains(owner) {
            return Err(GateError::UnauthorizedSigner);
        }
        terms.validate().map_err(GateError::InvalidPolicy)?;

        let vault = Vault::new(*owner, &ix.vault);
        let policy = GatePolicy {
            vault: ix.vault,
            terms: terms.clone(),
        };

        let mut writes = WriteSet::new();
        persist(&mut writes, ix.vault, &vault)?;
        persist(&mut writes, policy_address, &policy)?;

        debug!(vault = %ix.vault, kind = %terms.kind(), signers = terms.signers.len(), "vault created");

        Ok(Staged {
            writes,
            sequence: vault.sequence,
            outcome: Outcome::Initialized,
        })
    }

    fn propose(
        &self,
        ix: &Instruction,
        action: &GateAction,
        signers: &VerifiedSigners,
        now: i64,
    ) -> GateResult<Staged> {
        let mut active = self.load_active(ix)?;
        let authorized = require_authorized(&active.vault.owner, active.terms(), signers)?;
        let proposer = authorized[0];

        let mut writes = WriteSet::new();
        if let Some(outstanding) = active.vault.pending {
            let pending: PendingAction = load(&self.ledger, &outstanding)?;
            if !pending.is_expired(active.vault.sequence) {
                return Err(GateError::ActionPending(outstanding));
            }
            warn!(
                vault = %active.address,
                pending = %outstanding,
                created = pending.created_sequence,
                "discarding expired pending action before proposal"
            );
            writes.delete(outstanding);
            active.vault.pending = None;
        }

        let decision = evaluate(&active.vault.owner, active.terms(), action, &authorized, now);
        debug!(vault = %active.address, action = action.name(), ?decision, "proposal evaluated");

        let sequence = active.vault.bump_sequence()?;
        let outcome = match decision {
            Decision::Allow => {
                self.run_action(action, &mut active, &mut writes, now)?;
                Outcome::Executed {
                    action: action.name().to_string(),
                }
            }
            Decision::Defer { missing } => {
                let pending = PendingAction::new(
                    active.address,
                    action.clone(),
                    proposer,
                    authorized,
                    sequence,
                    self.config.expiry_window,
                );
                let address = pending.address();
                persist(&mut writes, address, &pending)?;
                active.vault.pending = Some(address);
                Outcome::Pending {
                    pending: address,
                    missing,
                }
            }
            Decision::Deny(reason) => return Err(reason.into()),
        };

        persist(&mut writes, active.address, &active.vault)?;
        Ok(Staged {
            writes,
            sequence,
            outcome,
        })
    }

    fn approve(
        &self,
        ix: &Instruction,
        pending_ref: &Address,
        signers: &VerifiedSigners,
        now: i64,
    ) -> GateResult<Staged> {
        let mut active = self.load_active(ix)?;
        let outstanding = outstanding_pending(&active.vault, pending_ref)?;
        let authorized = require_authorized(&active.vault.owner, active.terms(), signers)?;

        let mut pending: PendingAction = load(&self.ledger, &outstanding)?;
        if pending.is_expired(active.vault.sequence) {
            return self.discard_expired(active, pending);
        }

        let added = pending.add_approvals(authorized);
        let decision = evaluate(
            &active.vault.owner,
            active.terms(),
            &pending.action,
            &pending.approvals,
            now,
        );
        debug!(
            vault = %active.address,
            pending = %outstanding,
            added,
            approvals = pending.approvals.len(),
            ?decision,
            "approval evaluated"
        );

        let mut writes = WriteSet::new();
        let sequence = active.vault.bump_sequence()?;
        let outcome = match decision {
            Decision::Allow => {
                self.run_action(&pending.action, &mut active, &mut writes, now)?;
                writes.delete(outstanding);
                active.vault.pending = None;
                Outcome::Executed {
                    action: pending.action.name().to_string(),
                }
            }
            Decision::Defer { missing } => {
                persist(&mut writes, outstanding, &pending)?;
                Outcome::Pending {
                    pending: outstanding,
                    missing,
                }
            }
            Decision::Deny(reason) => return Err(reason.into()),
        };

        persist(&mut writes, active.address, &active.vault)?;
        Ok(Staged {
            writes,
            sequence,
            outcome,
        })
    }

    fn cancel(
        &self,
        ix: &Instruction,
        pending_ref: &Address,
        signers: &VerifiedSigners,
    ) -> GateResult<Staged> {
        let mut active = self.load_active(ix)?;
        let outstanding = outstanding_pending(&active.vault, pending_ref)?;
        let pending: PendingAction = load(&self.ledger, &outstanding)?;

        if !signers.contains(&pending.proposer) && !signers.contains(&active.vault.owner) {
            return Err(GateError::UnauthorizedSigner);
        }
        if pending.is_expired(active.vault.sequence) {
            return self.discard_expired(active, pending);
        }

        let mut writes = WriteSet::new();
        writes.delete(outstanding);
        active.vault.pending = None;
        let sequence = active.vault.bump_sequence()?;
        persist(&mut writes, active.address, &active.vault)?;

        Ok(Staged {
            writes,
            sequence,
            outcome: Outcome::Cancelled {
                pending: outstanding,
            },
        })
    }

    // -- Helpers ------------------------------------------------------------

    /// Load the vault and policy, and reject a stale sequence.
    fn load_active(&self, ix: &Instruction) -> GateResult<ActiveVault> {
        let vault: Vault = load(&self.ledger, &ix.vault)?;
        if !vault.initialized {
            return Err(GateError::MalformedAccount {
                address: ix.vault,
                reason: "vault is not initialized".to_string(),
            });
        }
        if ix.expected_sequence != vault.sequence {
            return Err(GateError::StaleSequence {
                expected: ix.expected_sequence,
                actual: vault.sequence,
            });
        }

        let policy: GatePolicy = load(&self.ledger, &vault.policy)?;
        if policy.vault != ix.vault {
            return Err(GateError::AddressMismatch {
                expected: ix.vault,
                found: policy.vault,
            });
        }

        Ok(ActiveVault {
            address: ix.vault,
            vault,
            policy,
        })
    }

    /// Drop an expired pending action as this instruction's only effect.
    fn discard_expired(
        &self,
        mut active: ActiveVault,
        pending: PendingAction,
    ) -> GateResult<Staged> {
        let address = pending.address();
        warn!(
            vault = %active.address,
            pending = %address,
            created = pending.created_sequence,
            current = active.vault.sequence,
            window = self.config.expiry_window,
            "pending action expired"
        );

        let mut writes = WriteSet::new();
        writes.delete(address);
        active.vault.pending = None;
        let sequence = active.vault.bump_sequence()?;
        persist(&mut writes, active.address, &active.vault)?;

        Ok(Staged {
            writes,
            sequence,
            outcome: Outcome::Expired { pending: address },
        })
    }

    fn run_action(
        &self,
        action: &GateAction,
        active: &mut ActiveVault,
        writes: &mut WriteSet,
        now: i64,
    ) -> GateResult<()> {
        action::execute(
            action,
            ExecutionContext {
                ledger: &self.ledger,
                vault_address: active.address,
                vault: &mut active.vault,
                writes,
                now,
                config: &self.config,
            },
        )
    }
}

/// The vault's outstanding pending action, which must be `requested`.
fn outstanding_pending(vault: &Vault, requested: &Address) -> GateResult<Address> {
    let outstanding = vault.pending.ok_or(GateError::NoPendingAction)?;
    if outstanding != *requested {
        return Err(GateError::PendingMismatch {
            expected: outstanding,
            found: *requested,
        });
    }
    Ok(outstanding)
}

fn transaction_id(ix: &Instruction, sequence: u64) -> GateResult<String> {
    let bytes = ix.signable_bytes()?;
    let digest = blake3_hash_multi(&[ix.vault.as_ref(), &sequence.to_le_bytes(), &bytes]);
    Ok(hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_gate_protocol::clock::FixedClock;
    use vault_gate_protocol::crypto::Keypair;
    use vault_gate_protocol::storage::MemoryLedger;

    fn gate() -> VaultGate<MemoryLedger, FixedClock> {
        VaultGate::new(MemoryLedger::new(), FixedClock::new(1_000))
    }

    fn signers(keys: &[&Keypair]) -> VerifiedSigners {
        VerifiedSigners::assume_verified(keys.iter().map(|k| k.address()).collect())
    }

    #[test]
    fn initialize_creates_vault_and_policy() {
        let gate = gate();
        let owner = Keypair::from_seed(&[1; 32]);
        let ix = Instruction::initialize(owner.address(), 0);
        let receipt = gate.execute(&ix, &signers(&[&owner])).unwrap();

        assert_eq!(receipt.outcome, Outcome::Initialized);
        assert_eq!(receipt.sequence, 0);
        assert_eq!(receipt.tx_id.len(), 64);

        let vault = gate.vault(&ix.vault).unwrap();
        assert_eq!(vault.owner, owner.address());
        assert_eq!(vault.balance, 0);
        assert!(vault.initialized);
        assert_eq!(gate.policy(&ix.vault).unwrap().terms, PolicyTerms::owner_only());
        assert_eq!(gate.ledger().len(), 2);
    }

    #[test]
    fn initialize_rejects_wrong_address() {
        let gate = gate();
        let owner = Keypair::from_seed(&[1; 32]);
        let mut ix = Instruction::initialize(owner.address(), 0);
        ix.vault = Address::new([0; 32]);
        assert!(matches!(
            gate.execute(&ix, &signers(&[&owner])),
            Err(GateError::AddressMismatch { .. })
        ));
        assert!(gate.ledger().is_empty());
    }

    #[test]
    fn owner_deposit_executes_immediately() {
        let gate = gate();
        let owner = Keypair::from_seed(&[1; 32]);
        let init = Instruction::initialize(owner.address(), 0);
        gate.execute(&init, &signers(&[&owner])).unwrap();

        let ix = Instruction::propose(init.vault, 0, GateAction::Deposit { amount: 500 });
        let receipt = gate.execute(&ix, &signers(&[&owner])).unwrap();
        assert_eq!(
            receipt.outcome,
            Outcome::Executed {
                action: "deposit".to_string()
            }
        );
        assert_eq!(receipt.sequence, 1);
        assert_eq!(gate.vault(&init.vault).unwrap().balance, 500);
        assert!(gate.pending(&init.vault).unwrap().is_none());
    }

    #[test]
    fn stale_sequence_rejected() {
        let gate = gate();
        let owner = Keypair::from_seed(&[1; 32]);
        let init = Instruction::initialize(owner.address(), 0);
        gate.execute(&init, &signers(&[&owner])).unwrap();

        let ix = Instruction::propose(init.vault, 5, GateAction::Deposit { amount: 1 });
        assert!(matches!(
            gate.execute(&ix, &signers(&[&owner])),
            Err(GateError::StaleSequence { expected: 5, actual: 0 })
        ));
    }

    #[test]
    fn process_checks_signatures() {
        let gate = gate();
        let owner = Keypair::from_seed(&[1; 32]);
        let signed = Instruction::initialize(owner.address(), 0)
            .sign(&[&owner])
            .unwrap();
        assert!(gate.process(&signed).is_ok());

        let imposter = Keypair::from_seed(&[2; 32]);
        let mut forged = Instruction::initialize(owner.address(), 1)
            .sign(&[&imposter])
            .unwrap();
        forged.signatures[0].0 = owner.address();
        assert!(matches!(gate.process(&forged), Err(GateError::InvalidSignature(_))));
    }

    #[test]
    fn outcome_display() {
        assert_eq!(Outcome::Initialized.to_string(), "initialized");
        assert_eq!(
            Outcome::Pending {
                pending: Address::new([0; 32]),
                missing: 2
            }
            .to_string(),
            "pending (2 missing)"
        );
    }
}

//! # Vault Gate Program
//!
//! An access-control state machine guarding a custodial vault. Every
//! operation on a vault is an [`Instruction`] signed by one or more
//! identities; the [`VaultGate`] dispatcher checks those signatures,
//! resolves each signer's role, asks the policy evaluator for a decision,
//! and commits the outcome to the ledger atomically.
//!
//! - **Account model** ([`state`]) — Vault, Gate Policy, Pending Action and
//!   Allowance records in fixed-size, versioned byte slots.
//! - **Authorization** ([`authorization`]) — owner / authorized-signer /
//!   unauthorized role resolution.
//! - **Evaluator** ([`evaluator`]) — pure allow, deny, or defer decisions
//!   for owner-only, threshold, and time-locked policies.
//! - **Dispatcher** ([`dispatcher`]) — `initialize`, `propose`, `approve`,
//!   `cancel`, with execution triggered automatically once a proposal is
//!   allowed.
//!
//! ## Design Principles
//!
//! 1. Balances and sequences use checked arithmetic only.
//! 2. Every instruction either commits all of its writes or none.
//! 3. Malformed or unfamiliar account bytes are an error, never a default.
//! 4. Signer verification is an explicit input, not ambient state.

pub mod action;
pub mod authorization;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod instruction;
pub mod state;

pub use action::GateAction;
pub use authorization::{Role, VerifiedSigners};
pub use dispatcher::{GateConfig, Outcome, Receipt, VaultGate};
pub use error::{GateError, GateResult};
pub use evaluator::{evaluate, Decision, DenyReason};
pub use instruction::{Instruction, InstructionPayload, SignedInstruction};
pub use state::{Allowance, GatePolicy, GateRule, PendingAction, PolicyKind, PolicyTerms, Vault};

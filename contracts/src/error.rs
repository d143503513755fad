//! Errors returned by gate instructions.
//!
//! Every variant is terminal for the instruction that raised it: nothing is
//! committed, and the caller must rebuild against a fresh sequence number
//! to retry. `Defer` is not here; waiting for approvals is an outcome, not
//! a failure.

use thiserror::Error;
use vault_gate_protocol::crypto::{Address, SignatureError};
use vault_gate_protocol::storage::LedgerError;

use crate::evaluator::DenyReason;

#[derive(Debug, Error)]
pub enum GateError {
    // -- Storage layer ------------------------------------------------------
    /// No account exists at the address.
    #[error("account not found: {0}")]
    AccountNotFound(Address),

    /// The stored discriminator belongs to a different account type.
    #[error("account {address} is not a {expected}")]
    AccountTypeMismatch {
        address: Address,
        expected: &'static str,
    },

    /// The stored schema version is not the one this program reads.
    #[error("account {address} has schema version {found}, supported {supported}")]
    UnsupportedVersion {
        address: Address,
        found: u8,
        supported: u8,
    },

    /// The encoded account does not fit its fixed-capacity slot.
    #[error("{account} needs {needed} bytes but its slot holds {capacity}")]
    SerializationOverflow {
        account: &'static str,
        needed: usize,
        capacity: usize,
    },

    /// Header, length, padding, or payload failed to parse.
    #[error("malformed account {address}: {reason}")]
    MalformedAccount { address: Address, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    // -- Authorization ------------------------------------------------------
    /// No signer resolved to a role the operation accepts.
    #[error("no authorized signer for this operation")]
    UnauthorizedSigner,

    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// An owner-only policy saw no owner signature.
    #[error("operation requires the vault owner")]
    NotOwner,

    // -- Policy and state ---------------------------------------------------
    #[error("vault is time-locked until {unlock_at}")]
    Locked { unlock_at: i64 },

    /// The instruction was built against an outdated vault snapshot.
    #[error("stale sequence: instruction expects {expected}, vault is at {actual}")]
    StaleSequence { expected: u64, actual: u64 },

    #[error("vault {0} is already initialized")]
    AlreadyInitialized(Address),

    #[error("address mismatch: expected {expected}, found {found}")]
    AddressMismatch { expected: Address, found: Address },

    /// Proposal queue depth is one.
    #[error("vault already has pending action {0}")]
    ActionPending(Address),

    #[error("vault has no pending action")]
    NoPendingAction,

    #[error("pending action mismatch: outstanding is {expected}, instruction names {found}")]
    PendingMismatch { expected: Address, found: Address },

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),

    // -- Execution ----------------------------------------------------------
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("allowance exceeded: requested {requested}, available {available}")]
    AllowanceExceeded { requested: u64, available: u64 },

    #[error("amount overflow")]
    AmountOverflow,

    #[error("vault sequence exhausted")]
    SequenceExhausted,
}

pub type GateResult<T> = Result<T, GateError>;

impl From<DenyReason> for GateError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::NotOwner => GateError::NotOwner,
            DenyReason::Locked { unlock_at } => GateError::Locked { unlock_at },
            DenyReason::MalformedAction(why) => GateError::InvalidAction(why),
            DenyReason::InvalidPolicy(why) => GateError::InvalidPolicy(why),
        }
    }
}

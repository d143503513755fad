//! # Protocol Configuration & Constants
//!
//! Every magic number of the gate lives here: identity sizes, account slot
//! capacities, schema versions, and the default expiry and allowance
//! windows. Slot capacities are part of the on-ledger contract; changing
//! one after deployment requires re-initializing the affected accounts.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Schema version written into every account header. Loaders reject any
/// other value instead of guessing at forward compatibility.
pub const ACCOUNT_SCHEMA_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 public key / address length in bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Policy Limits
// ---------------------------------------------------------------------------

/// Largest authorized-signer set a policy may carry. Bounds the policy
/// slot and the approval list of a pending action.
pub const MAX_SIGNERS: usize = 16;

/// Default number of sequence numbers a pending action survives before it
/// is discarded as expired.
pub const DEFAULT_EXPIRY_WINDOW: u64 = 64;

/// Seconds after its last update that a withdrawal allowance lapses.
pub const ALLOWANCE_PERIOD_SECS: i64 = 30 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Account Slots
// ---------------------------------------------------------------------------

/// Fixed header in front of every account payload:
/// discriminator (8) + version (1) + reserved (3) + payload length (4).
pub const ACCOUNT_HEADER_LEN: usize = 16;

/// Vault slot capacity. Payload is 114 bytes.
pub const VAULT_SPACE: usize = 160;

/// Policy slot capacity, sized for `MAX_SIGNERS` signers (566-byte payload).
pub const POLICY_SPACE: usize = 600;

/// Pending action slot capacity: the largest action (a full replacement
/// policy) plus `MAX_SIGNERS + 1` approvals.
pub const PENDING_SPACE: usize = 1280;

/// Allowance slot capacity. Payload is 80 bytes.
pub const ALLOWANCE_SPACE: usize = 128;

/// Hard ceiling on any single account the ledger will store.
pub const MAX_ACCOUNT_SPACE: usize = 10 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_fit_under_ledger_ceiling() {
        for space in [VAULT_SPACE, POLICY_SPACE, PENDING_SPACE, ALLOWANCE_SPACE] {
            assert!(space > ACCOUNT_HEADER_LEN);
            assert!(space <= MAX_ACCOUNT_SPACE);
        }
    }

    #[test]
    fn policy_slot_holds_max_signers() {
        // vault + rule tag/threshold + vec len + signers + Option<i64>
        let payload = ADDRESS_LENGTH + 5 + 8 + MAX_SIGNERS * ADDRESS_LENGTH + 9;
        assert!(ACCOUNT_HEADER_LEN + payload <= POLICY_SPACE);
    }

    #[test]
    fn allowance_period_is_thirty_days() {
        assert_eq!(ALLOWANCE_PERIOD_SECS, 2_592_000);
    }
}

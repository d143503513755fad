//! # Gate Policy
//!
//! The authorization rule set of one vault. A policy pairs a [`GateRule`]
//! with an authorized-signer set and an optional unlock timestamp; a policy
//! carrying an unlock timestamp is time-locked until that instant.
//!
//! The unlock timestamp is fixed at initialization. Replacement terms may
//! change the rule and the signer set, never the unlock.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use vault_gate_protocol::config::{MAX_SIGNERS, POLICY_SPACE};
use vault_gate_protocol::crypto::Address;

use super::layout::AccountLayout;

/// How approvals are counted once the time lock (if any) has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateRule {
    /// Only the vault owner may authorize. The signer set is ignored.
    OwnerOnly,
    /// `required` distinct members of the signer set must approve.
    Threshold { required: u8 },
}

/// Reported kind of a policy, combining the rule with the time lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    OwnerOnly,
    Threshold,
    TimeLocked,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PolicyKind::OwnerOnly => "owner-only",
            PolicyKind::Threshold => "threshold",
            PolicyKind::TimeLocked => "time-locked",
        };
        write!(f, "{label}")
    }
}

/// Rule, signers, and unlock of a policy, without the owning vault.
///
/// This is what `initialize` and `UpdatePolicy` carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTerms {
    pub rule: GateRule,
    pub signers: Vec<Address>,
    pub unlock_at: Option<i64>,
}

impl PolicyTerms {
    /// Owner-only, no signers, no time lock.
    pub fn owner_only() -> Self {
        Self {
            rule: GateRule::OwnerOnly,
            signers: Vec::new(),
            unlock_at: None,
        }
    }

    /// `required`-of-`signers` threshold, no time lock.
    pub fn threshold(required: u8, signers: Vec<Address>) -> Self {
        Self {
            rule: GateRule::Threshold { required },
            signers,
            unlock_at: None,
        }
    }

    /// Add a time lock that opens at `unlock_at`.
    pub fn locked_until(mut self, unlock_at: i64) -> Self {
        self.unlock_at = Some(unlock_at);
        self
    }

    pub fn kind(&self) -> PolicyKind {
        match (self.unlock_at, self.rule) {
            (Some(_), _) => PolicyKind::TimeLocked,
            (None, GateRule::OwnerOnly) => PolicyKind::OwnerOnly,
            (None, GateRule::Threshold { .. }) => PolicyKind::Threshold,
        }
    }

    pub fn is_time_locked(&self) -> bool {
        self.unlock_at.is_some()
    }

    pub fn is_signer(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    /// Check the structural invariants. The error string names the first
    /// violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.signers.len() > MAX_SIGNERS {
            return Err(format!(
                "{} signers exceeds the maximum of {MAX_SIGNERS}",
                self.signers.len()
            ));
        }

        let unique: BTreeSet<&Address> = self.signers.iter().collect();
        if unique.len() != self.signers.len() {
            return Err("signer set contains duplicates".to_string());
        }

        if let GateRule::Threshold { required } = self.rule {
            if required == 0 {
                return Err("threshold must be at least 1".to_string());
            }
            if usize::from(required) > self.signers.len() {
                return Err(format!(
                    "threshold {required} exceeds {} signers",
                    self.signers.len()
                ));
            }
        }

        Ok(())
    }
}

/// The policy account of one vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub vault: Address,
    pub terms: PolicyTerms,
}

impl GatePolicy {
    /// `derive(["policy", vault])`
    pub fn address_for(vault: &Address) -> Address {
        Address::derive(&[b"policy", vault.as_ref()])
    }
}

impl AccountLayout for GatePolicy {
    const NAME: &'static str = "GatePolicy";
    const SPACE: usize = POLICY_SPACE;
}

//! # Policy Evaluator
//!
//! A pure function from `(owner, policy, action, approvals, now)` to a
//! [`Decision`]. No storage, no clock of its own, no side effects.
//!
//! Checks run in a fixed order and the first one that fires decides:
//!
//! 1. Malformed action (zero amounts, invalid replacement terms, an attempt
//!    to move the unlock timestamp) is denied.
//! 2. Time lock: before `unlock_at` everything is denied, whatever the
//!    approval count. Nothing about approvals is reported while locked.
//! 3. Owner-only: allowed iff the owner approved. Listed signers count for
//!    nothing.
//! 4. Threshold: allowed once `required` distinct listed signers approved,
//!    otherwise deferred with the number still missing.
//!
//! Policy changes are judged against the current terms, never the proposed
//! ones.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use vault_gate_protocol::crypto::Address;

use crate::action::GateAction;
use crate::state::{GateRule, PolicyTerms};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    NotOwner,
    Locked { unlock_at: i64 },
    MalformedAction(String),
    InvalidPolicy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
    /// Not enough approvals yet; `missing` more are needed.
    Defer { missing: usize },
}

pub fn evaluate(
    owner: &Address,
    policy: &PolicyTerms,
    action: &GateAction,
    approvals: &[Address],
    now: i64,
) -> Decision {
    if let Err(reason) = check_action(policy, action) {
        return Decision::Deny(reason);
    }

    if let Some(unlock_at) = policy.unlock_at {
        if now < unlock_at {
            return Decision::Deny(DenyReason::Locked { unlock_at });
        }
    }

    match policy.rule {
        GateRule::OwnerOnly => {
            if approvals.contains(owner) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        GateRule::Threshold { required } => {
            let approved = approvals
                .iter()
                .filter(|a| policy.is_signer(a))
                .collect::<BTreeSet<_>>()
                .len();
            let required = usize::from(required);
            if approved >= required {
                Decision::Allow
            } else {
                Decision::Defer {
                    missing: required - approved,
                }
            }
        }
    }
}

/// Structural checks on the action, relative to the current policy.
fn check_action(current: &PolicyTerms, action: &GateAction) -> Result<(), DenyReason> {
    match action {
        GateAction::Deposit { amount }
        | GateAction::Withdraw { amount, .. }
        | GateAction::Slash { amount } => {
            if *amount == 0 {
                return Err(DenyReason::MalformedAction(format!(
                    "{} amount must be non-zero",
                    action.name()
                )));
            }
        }
        GateAction::SetAllowance { .. } => {}
        GateAction::UpdatePolicy { terms } => {
            terms.validate().map_err(DenyReason::InvalidPolicy)?;
            if terms.unlock_at != current.unlock_at {
                return Err(DenyReason::InvalidPolicy(
                    "unlock timestamp is immutable".to_string(),
                ));
            }
        }
    }
    Ok(())
}

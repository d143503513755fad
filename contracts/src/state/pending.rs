//! A proposed action waiting for approvals.

use serde::{Deserialize, Serialize};
use vault_gate_protocol::config::PENDING_SPACE;
use vault_gate_protocol::crypto::Address;

use super::layout::AccountLayout;
use crate::action::GateAction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub vault: Address,
    pub action: GateAction,
    pub proposer: Address,
    /// Distinct approving identities, in arrival order.
    pub approvals: Vec<Address>,
    pub created_sequence: u64,
    pub expiry_sequence: u64,
}

impl PendingAction {
    pub fn new(
        vault: Address,
        action: GateAction,
        proposer: Address,
        approvals: Vec<Address>,
        created_sequence: u64,
        expiry_window: u64,
    ) -> Self {
        let mut pending = Self {
            vault,
            action,
            proposer,
            approvals: Vec::with_capacity(approvals.len()),
            created_sequence,
            expiry_sequence: created_sequence.saturating_add(expiry_window),
        };
        pending.add_approvals(approvals);
        pending
    }

    /// `derive(["pending", vault, created_sequence LE])`
    ///
    /// Keyed by sequence, so two pending actions can never share one.
    pub fn address_for(vault: &Address, created_sequence: u64) -> Address {
        Address::derive(&[b"pending", vault.as_ref(), &created_sequence.to_le_bytes()])
    }

    pub fn address(&self) -> Address {
        Self::address_for(&self.vault, self.created_sequence)
    }

    /// Whether the action is past its window at `current_sequence`.
    pub fn is_expired(&self, current_sequence: u64) -> bool {
        current_sequence > self.expiry_sequence
    }

    /// Record approvals, skipping identities already present. Returns how
    /// many were new.
    pub fn add_approvals<I: IntoIterator<Item = Address>>(&mut self, approvers: I) -> usize {
        let before = self.approvals.len();
        for approver in approvers {
            if !self.approvals.contains(&approver) {
                self.approvals.push(approver);
            }
        }
        self.approvals.len() - before
    }
}

impl AccountLayout for PendingAction {
    const NAME: &'static str = "PendingAction";
    const SPACE: usize = PENDING_SPACE;
}

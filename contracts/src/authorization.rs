//! # Authorization Core
//!
//! Turns a set of verified signer identities into roles against one vault
//! and its policy. Pure: the caller supplies the vault owner and the policy
//! terms, and nothing here touches the ledger.
//!
//! Signature checking happens before any of this, in
//! [`SignedInstruction::verify`](crate::instruction::SignedInstruction::verify),
//! which is the only safe way to obtain a [`VerifiedSigners`] set from
//! untrusted input.

use std::fmt;

use serde::{Deserialize, Serialize};
use vault_gate_protocol::crypto::Address;

use crate::error::{GateError, GateResult};
use crate::state::PolicyTerms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Owner,
    AuthorizedSigner,
    Unauthorized,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::AuthorizedSigner => write!(f, "authorized-signer"),
            Role::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

/// Identities whose signatures over the current instruction have been
/// checked. Order follows the signature list; no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedSigners(Vec<Address>);

impl VerifiedSigners {
    /// Wrap identities that a trusted runtime has already authenticated.
    pub fn assume_verified(signers: Vec<Address>) -> Self {
        let mut deduped: Vec<Address> = Vec::with_capacity(signers.len());
        for signer in signers {
            if !deduped.contains(&signer) {
                deduped.push(signer);
            }
        }
        Self(deduped)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    pub fn as_slice(&self) -> &[Address] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Role of one signer. Owner wins when the owner is also listed.
pub fn resolve_role(owner: &Address, policy: &PolicyTerms, signer: &Address) -> Role {
    if signer == owner {
        Role::Owner
    } else if policy.is_signer(signer) {
        Role::AuthorizedSigner
    } else {
        Role::Unauthorized
    }
}

pub fn resolve_roles(
    owner: &Address,
    policy: &PolicyTerms,
    signers: &VerifiedSigners,
) -> Vec<(Address, Role)> {
    signers
        .as_slice()
        .iter()
        .map(|s| (*s, resolve_role(owner, policy, s)))
        .collect()
}

/// The signers that resolve above `Unauthorized`, in signature order.
///
/// Fails with `UnauthorizedSigner` if there are none.
pub fn require_authorized(
    owner: &Address,
    policy: &PolicyTerms,
    signers: &VerifiedSigners,
) -> GateResult<Vec<Address>> {
    let authorized: Vec<Address> = resolve_roles(owner, policy, signers)
        .into_iter()
        .filter(|(_, role)| *role != Role::Unauthorized)
        .map(|(address, _)| address)
        .collect();

    if authorized.is_empty() {
        return Err(GateError::UnauthorizedSigner);
    }
    Ok(authorized)
}

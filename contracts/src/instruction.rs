//! # Instructions
//!
//! What a caller submits to the gate. An [`Instruction`] names the vault,
//! the sequence number it was built against, and one of the four entry
//! points. It travels as a [`SignedInstruction`] carrying one Ed25519
//! signature per co-signer over [`Instruction::signable_bytes`].

use bincode::Options;
use serde::{Deserialize, Serialize};
use vault_gate_protocol::crypto::{verify_all, Address, Keypair, Signature};

use crate::action::GateAction;
use crate::authorization::VerifiedSigners;
use crate::error::{GateError, GateResult};
use crate::state::layout::codec;
use crate::state::{PolicyTerms, Vault};

/// Prefix on every signed message, so instruction signatures cannot be
/// replayed as signatures over anything else.
const SIGNING_DOMAIN: &[u8] = b"vault-gate/instruction/v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionPayload {
    /// Create the vault and its policy. The vault address must be
    /// `Vault::address_for(owner, vault_id)`.
    Initialize {
        owner: Address,
        vault_id: u64,
        policy: PolicyTerms,
    },
    Propose { action: GateAction },
    Approve { pending: Address },
    Cancel { pending: Address },
}

impl InstructionPayload {
    pub fn name(&self) -> &'static str {
        match self {
            InstructionPayload::Initialize { .. } => "initialize",
            InstructionPayload::Propose { .. } => "propose",
            InstructionPayload::Approve { .. } => "approve",
            InstructionPayload::Cancel { .. } => "cancel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub vault: Address,
    /// The vault sequence this instruction was built against. Ignored by
    /// `Initialize`.
    pub expected_sequence: u64,
    pub payload: InstructionPayload,
}

impl Instruction {
    /// The zero-argument initialize: owner-only, no signers, no time lock.
    pub fn initialize(owner: Address, vault_id: u64) -> Self {
        Self::initialize_with(owner, vault_id, PolicyTerms::owner_only())
    }

    pub fn initialize_with(owner: Address, vault_id: u64, policy: PolicyTerms) -> Self {
        Self {
            vault: Vault::address_for(&owner, vault_id),
            expected_sequence: 0,
            payload: InstructionPayload::Initialize {
                owner,
                vault_id,
                policy,
            },
        }
    }

    pub fn propose(vault: Address, expected_sequence: u64, action: GateAction) -> Self {
        Self {
            vault,
            expected_sequence,
            payload: InstructionPayload::Propose { action },
        }
    }

    pub fn approve(vault: Address, expected_sequence: u64, pending: Address) -> Self {
        Self {
            vault,
            expected_sequence,
            payload: InstructionPayload::Approve { pending },
        }
    }

    pub fn cancel(vault: Address, expected_sequence: u64, pending: Address) -> Self {
        Self {
            vault,
            expected_sequence,
            payload: InstructionPayload::Cancel { pending },
        }
    }

    /// Canonical bytes: domain prefix followed by the fixint bincode
    /// encoding of the instruction.
    pub fn signable_bytes(&self) -> GateResult<Vec<u8>> {
        let body = codec()
            .serialize(self)
            .map_err(|e| GateError::Serialization(e.to_string()))?;
        let mut message = Vec::with_capacity(SIGNING_DOMAIN.len() + body.len());
        message.extend_from_slice(SIGNING_DOMAIN);
        message.extend_from_slice(&body);
        Ok(message)
    }

    /// Sign with every keypair, in order.
    pub fn sign(self, signers: &[&Keypair]) -> GateResult<SignedInstruction> {
        let message = self.signable_bytes()?;
        let signatures = signers
            .iter()
            .map(|kp| (kp.address(), kp.sign(&message)))
            .collect();
        Ok(SignedInstruction {
            instruction: self,
            signatures,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub instruction: Instruction,
    pub signatures: Vec<(Address, Signature)>,
}

impl SignedInstruction {
    /// Check every signature and return the signer set.
    pub fn verify(&self) -> GateResult<VerifiedSigners> {
        if self.signatures.is_empty() {
            return Err(GateError::UnauthorizedSigner);
        }
        let message = self.instruction.signable_bytes()?;
        let signers = verify_all(&message, &self.signatures)?;
        Ok(VerifiedSigners::assume_verified(signers))
    }

    /// Add one more co-signature.
    pub fn cosign(&mut self, keypair: &Keypair) -> GateResult<()> {
        let message = self.instruction.signable_bytes()?;
        self.signatures.push((keypair.address(), keypair.sign(&message)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_gate_protocol::crypto::SignatureError;

    #[test]
    fn signed_instruction_verifies() {
        let owner = Keypair::from_seed(&[1; 32]);
        let other = Keypair::from_seed(&[2; 32]);
        let mut signed = Instruction::initialize(owner.address(), 0)
            .sign(&[&owner])
            .unwrap();
        signed.cosign(&other).unwrap();
        let signers = signed.verify().unwrap();
        assert_eq!(signers.as_slice(), &[owner.address(), other.address()]);
    }

    #[test]
    fn tampered_instruction_fails() {
        let owner = Keypair::from_seed(&[1; 32]);
        let vault = Address::new([9; 32]);
        let mut signed = Instruction::propose(vault, 3, GateAction::Deposit { amount: 5 })
            .sign(&[&owner])
            .unwrap();
        signed.instruction.expected_sequence = 4;
        assert!(matches!(
            signed.verify(),
            Err(GateError::InvalidSignature(SignatureError::VerificationFailed))
        ));
    }

    #[test]
    fn claimed_signer_without_key_fails() {
        let real = Keypair::from_seed(&[1; 32]);
        let victim = Keypair::from_seed(&[2; 32]);
        let vault = Address::new([9; 32]);
        let mut signed = Instruction::approve(vault, 1, Address::new([3; 32]))
            .sign(&[&real])
            .unwrap();
        // Reuse the real signature under someone else's identity.
        signed.signatures[0].0 = victim.address();
        assert!(matches!(signed.verify(), Err(GateError::InvalidSignature(_))));
    }

    #[test]
    fn unsigned_instruction_is_unauthorized() {
        let signed = SignedInstruction {
            instruction: Instruction::cancel(Address::new([9; 32]), 0, Address::new([3; 32])),
            signatures: vec![],
        };
        assert!(matches!(signed.verify(), Err(GateError::UnauthorizedSigner)));
    }

    #[test]
    fn signable_bytes_are_prefixed_and_stable() {
        let ix = Instruction::initialize(Address::new([1; 32]), 7);
        let a = ix.signable_bytes().unwrap();
        assert!(a.starts_with(SIGNING_DOMAIN));
        assert_eq!(a, ix.clone().signable_bytes().unwrap());
        assert_eq!(ix.payload.name(), "initialize");
    }

    #[test]
    fn json_roundtrip_for_transport() {
        let kp = Keypair::from_seed(&[5; 32]);
        let signed = Instruction::initialize(kp.address(), 0).sign(&[&kp]).unwrap();
        let json = serde_json::to_string(&signed).unwrap();
        let back: SignedInstruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signed);
        assert!(back.verify().is_ok());
    }
}

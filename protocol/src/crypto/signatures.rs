//! # Signature Verification
//!
//! The signature-verification primitive the gate consumes: given the
//! canonical bytes of an instruction and a list of `(address, signature)`
//! pairs, confirm that every claimed identity actually signed.
//!
//! Verification is all-or-nothing. One bad signature rejects the whole set;
//! we don't report which one failed.

use thiserror::Error;

use super::keys::{Address, Keypair, Signature};

/// Errors during signature operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("duplicate signer in signature set")]
    DuplicateSigner,
}

/// Sign a message with a keypair.
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verify one signature. `true` iff valid.
pub fn verify(address: &Address, message: &[u8], signature: &Signature) -> bool {
    address.verify(message, signature)
}

/// Verify that every `(address, signature)` pair signed `message`.
///
/// Returns the signer addresses in submission order. A signer listed twice
/// is rejected rather than silently collapsed.
pub fn verify_all(
    message: &[u8],
    signatures: &[(Address, Signature)],
) -> Result<Vec<Address>, SignatureError> {
    let mut signers = Vec::with_capacity(signatures.len());
    for (address, signature) in signatures {
        if signers.contains(address) {
            return Err(SignatureError::DuplicateSigner);
        }
        if !verify(address, message, signature) {
            return Err(SignatureError::VerificationFailed);
        }
        signers.push(*address);
    }
    Ok(signers)
}

//! # Keys and Addresses
//!
//! Ed25519 keypairs for the identities that sign gate instructions, and the
//! 32-byte [`Address`] type used for every identity and every account on
//! the ledger.
//!
//! An address is either:
//!
//! - the Ed25519 public key of a signer (owner, authorized signer,
//!   beneficiary), or
//! - a program-derived account address produced by [`Address::derive`] from
//!   a list of seeds. Derived addresses are hashes, not curve points, so
//!   nothing can ever sign for them.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (ed25519-dalek does this for us).
//! - Key generation uses `OsRng`.
//! - Secret key bytes are never logged or printed by `Debug`.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::hash::domain_separated_hash;

/// BLAKE3 derive-key context for program-derived addresses.
const DERIVE_CONTEXT: &str = "vault-gate 2026 program-derived address";

/// Errors that can occur during key and address parsing.
///
/// Deliberately terse about *why* parsing failed; error messages are not
/// the place to echo key material back.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: expected 32 hex-encoded bytes")]
    InvalidSecretKey,

    #[error("invalid address: expected 32 bytes in base58 or hex")]
    InvalidAddress,

    #[error("invalid signature bytes: expected 64 hex-encoded bytes")]
    InvalidSignature,
}

/// An Ed25519 signing identity.
///
/// Does not implement `Serialize`: exporting a secret key must be an
/// explicit call to [`to_hex`](Self::to_hex).
///
/// # Examples
///
/// ```
/// use vault_gate_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"approve pending action");
/// assert!(kp.address().verify(b"approve pending action", &sig));
/// ```
pub struct Keypair {
    signing_key: SigningKey,
}

/// A 32-byte ledger address: a signer's public key or a derived account id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address([u8; 32]);

/// An Ed25519 signature over an instruction's canonical bytes.
///
/// Stored as `Vec<u8>` for serde; always 64 bytes when produced by
/// [`Keypair::sign`]. A signature of any other length simply fails
/// verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

impl Keypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// Handy for tests and fixtures. A weak seed gives a weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte secret key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Export the secret key as hex. Handle with care.
    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// The address (public key) of this identity.
    pub fn address(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 signatures are deterministic.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(address={})", self.address())
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

impl Address {
    /// Wrap raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a program-owned account address from seeds.
    ///
    /// Each seed is length-prefixed before hashing so that `["ab", "c"]` and
    /// `["a", "bc"]` land on different addresses.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut preimage = Vec::with_capacity(seeds.iter().map(|s| s.len() + 4).sum());
        for seed in seeds {
            preimage.extend_from_slice(&(seed.len() as u32).to_le_bytes());
            preimage.extend_from_slice(seed);
        }
        Self(domain_separated_hash(DERIVE_CONTEXT, &preimage))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify an Ed25519 signature made by the key behind this address.
    ///
    /// Returns `false` for derived addresses (not curve points), wrong-length
    /// signatures, and plain bad signatures alike.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.bytes.as_slice()) else {
            return false;
        };
        verifying_key
            .verify(message, &DalekSignature::from_bytes(&sig_bytes))
            .is_ok()
    }

    /// Hex-encoded form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base58-encoded form. This is what `Display` prints.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = KeyError;

    /// Accepts base58 (the display form) or 64 hex characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = if s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(s).map_err(|_| KeyError::InvalidAddress)?
        } else {
            bs58::decode(s)
                .into_vec()
                .map_err(|_| KeyError::InvalidAddress)?
        };
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidAddress)?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    /// Create a signature from its raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-encoded form. 128 characters for a valid signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex-encoded 64-byte signature.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidSignature)?;
        if bytes.len() != 64 {
            return Err(KeyError::InvalidSignature);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "Signature({})", hex_str)
        }
    }
}

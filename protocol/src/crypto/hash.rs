//! # Hashing Utilities
//!
//! Two hash functions, each with a job:
//!
//! - **BLAKE3** for everything native to the gate: transaction ids and
//!   program-derived addresses (via `derive_key` domain separation).
//! - **SHA-256** for account discriminators, so the 8-byte type tags match
//!   the `sha256("account:<Name>")[..8]` convention used by on-chain
//!   account frameworks.

use sha2::{Digest, Sha256};

/// Compute SHA-256 and return a fixed-size array.
///
/// # Example
///
/// ```
/// use vault_gate_protocol::crypto::sha256_array;
///
/// let digest = sha256_array(b"account:Vault");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    output
}

/// Compute the BLAKE3 hash of the input data.
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated BLAKE3 using `derive_key` mode.
///
/// Two different contexts never collide, even over identical data, because
/// the context selects a different internal IV.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Hash several byte slices as if concatenated, without the buffer.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

//! # Cryptographic Primitives
//!
//! Thin, typed wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for signer identities and instruction
//!   signatures.
//! - **BLAKE3** for transaction ids and program-derived addresses.
//! - **SHA-256** for account discriminators.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash, sha256_array};
pub use keys::{Address, KeyError, Keypair, Signature};
pub use signatures::{sign, verify, verify_all, SignatureError};

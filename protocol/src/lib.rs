// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Vault Gate Protocol — Collaborator Primitives
//!
//! Everything the gate program consumes but does not decide:
//!
//! - **crypto** — Ed25519 identities and signatures, BLAKE3 and SHA-256,
//!   program-derived addresses.
//! - **storage** — the ledger: raw account slots with atomic multi-account
//!   commit, in memory or on sled.
//! - **clock** — the externally supplied unix timestamp.
//! - **config** — slot capacities, schema version, policy limits.
//!
//! The guarantees offered here are deliberately minimal: a commit is
//! atomic, the clock is read once per call, and a verified signer really
//! signed. The program must not assume more.

pub mod clock;
pub mod config;
pub mod crypto;
pub mod storage;

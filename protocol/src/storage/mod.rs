//! # Storage Module
//!
//! The ledger collaborator the gate commits through.
//!
//! ```text
//! ledger.rs  — Ledger trait, WriteSet, fixed-capacity slot rules
//! memory.rs  — In-memory ledger with staged commits and fault injection
//! db.rs      — sled-backed persistent ledger
//! ```
//!
//! Accounts are opaque byte slots here. Typed layouts (discriminators,
//! schema versions, payload encoding) belong to the program that owns them.

pub mod db;
pub mod ledger;
pub mod memory;

pub use db::SledLedger;
pub use ledger::{AccountWrite, Ledger, LedgerError, LedgerResult, WriteSet};
pub use memory::MemoryLedger;

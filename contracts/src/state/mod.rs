//! # Account Model
//!
//! Persisted gate records and their fixed byte layout. Each account type
//! implements [`AccountLayout`]; [`load`] and [`persist`] move them between
//! typed values and raw ledger slots.

pub mod allowance;
pub mod layout;
pub mod pending;
pub mod policy;
pub mod vault;

pub use allowance::Allowance;
pub use layout::{decode, encode, load, load_optional, persist, AccountLayout};
pub use pending::PendingAction;
pub use policy::{GatePolicy, GateRule, PolicyKind, PolicyTerms};
pub use vault::Vault;

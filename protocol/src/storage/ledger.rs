//! The ledger collaborator: raw account bytes keyed by [`Address`], plus an
//! atomic multi-account commit.
//!
//! The ledger knows nothing about vaults or policies. It stores opaque byte
//! slots and enforces two rules of its own:
//!
//! 1. A slot's length is fixed when it is created. A later write of a
//!    different length is rejected; growing an account means re-creating it.
//! 2. A [`WriteSet`] lands completely or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::MAX_ACCOUNT_SPACE;
use crate::crypto::Address;

/// Errors raised by ledger backends.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("write to account {0} failed")]
    WriteFailed(Address),

    #[error("account {address} has a fixed capacity of {capacity} bytes, write was {attempted}")]
    CapacityChanged {
        address: Address,
        capacity: usize,
        attempted: usize,
    },

    #[error("account {address} of {size} bytes exceeds the ledger maximum")]
    AccountTooLarge { address: Address, size: usize },

    #[error("corrupt ledger entry: {0}")]
    Corrupt(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// One staged change to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountWrite {
    /// Create the account or overwrite it in place.
    Put(Vec<u8>),
    /// Remove the account.
    Delete,
}

/// Every account change an instruction wants to make, committed together.
///
/// Keyed by address, so a later write to the same account replaces an
/// earlier one within the same set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: BTreeMap<Address, AccountWrite>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, address: Address, data: Vec<u8>) {
        self.writes.insert(address, AccountWrite::Put(data));
    }

    pub fn delete(&mut self, address: Address) {
        self.writes.insert(address, AccountWrite::Delete);
    }

    pub fn get(&self, address: &Address) -> Option<&AccountWrite> {
        self.writes.get(address)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AccountWrite)> {
        self.writes.iter()
    }
}

impl IntoIterator for WriteSet {
    type Item = (Address, AccountWrite);
    type IntoIter = std::collections::btree_map::IntoIter<Address, AccountWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

/// Account storage with atomic multi-account commit.
pub trait Ledger {
    /// Raw bytes of an account, or `None` if it does not exist.
    fn read(&self, address: &Address) -> LedgerResult<Option<Vec<u8>>>;

    /// Apply every write in the set, or none of them.
    fn commit(&self, writes: WriteSet) -> LedgerResult<()>;

    /// Whether an account exists at `address`.
    fn exists(&self, address: &Address) -> LedgerResult<bool> {
        Ok(self.read(address)?.is_some())
    }
}

impl<L: Ledger + ?Sized> Ledger for &L {
    fn read(&self, address: &Address) -> LedgerResult<Option<Vec<u8>>> {
        (**self).read(address)
    }

    fn commit(&self, writes: WriteSet) -> LedgerResult<()> {
        (**self).commit(writes)
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn read(&self, address: &Address) -> LedgerResult<Option<Vec<u8>>> {
        (**self).read(address)
    }

    fn commit(&self, writes: WriteSet) -> LedgerResult<()> {
        (**self).commit(writes)
    }
}

/// Enforce the fixed-capacity and size-ceiling rules for one `Put`.
pub(crate) fn check_slot(
    address: &Address,
    existing_len: Option<usize>,
    new_len: usize,
) -> LedgerResult<()> {
    if new_len > MAX_ACCOUNT_SPACE {
        return Err(LedgerError::AccountTooLarge {
            address: *address,
            size: new_len,
        });
    }
    match existing_len {
        Some(capacity) if capacity != new_len => Err(LedgerError::CapacityChanged {
            address: *address,
            capacity,
            attempted: new_len,
        }),
        _ => Ok(()),
    }
}

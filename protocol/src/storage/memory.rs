//! In-memory ledger.
//!
//! Used by tests, benches, and anything that wants a ledger without a disk.
//! Commits are staged on a copy of the account map and swapped in only once
//! every write has been applied, so a failure part-way leaves the ledger
//! exactly as it was.
//!
//! [`MemoryLedger::fail_writes_to`] arms a one-address write fault, which is
//! how the atomicity tests simulate a storage failure mid-commit.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::ledger::{check_slot, AccountWrite, Ledger, LedgerError, LedgerResult, WriteSet};
use crate::crypto::Address;

#[derive(Debug, Default)]
pub struct MemoryLedger {
    accounts: RwLock<BTreeMap<Address, Vec<u8>>>,
    fault: RwLock<Option<Address>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later commit that touches `address` fail.
    pub fn fail_writes_to(&self, address: Address) {
        *self.fault.write() = Some(address);
    }

    /// Disarm the write fault.
    pub fn clear_fault(&self) {
        *self.fault.write() = None;
    }

    /// A copy of every account, for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<Address, Vec<u8>> {
        self.accounts.read().clone()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn read(&self, address: &Address) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.accounts.read().get(address).cloned())
    }

    fn commit(&self, writes: WriteSet) -> LedgerResult<()> {
        let fault = *self.fault.read();
        let mut accounts = self.accounts.write();
        let mut staged = accounts.clone();

        for (address, write) in writes {
            if fault == Some(address) {
                tracing::debug!(%address, "injected ledger write failure");
                return Err(LedgerError::WriteFailed(address));
            }
            match write {
                AccountWrite::Put(data) => {
                    check_slot(&address, staged.get(&address).map(Vec::len), data.len())?;
                    staged.insert(address, data);
                }
                AccountWrite::Delete => {
                    staged.remove(&address);
                }
            }
        }

        *accounts = staged;
        Ok(())
    }
}

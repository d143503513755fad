//! # SledLedger — Persistent Account Storage
//!
//! A [`Ledger`] on top of sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree       | Key               | Value                    |
//! |------------|-------------------|--------------------------|
//! | `accounts` | address (32B)     | raw account slot bytes   |
//! | `metadata` | key (UTF-8)       | value (bytes)            |
//!
//! `metadata` holds a commit counter (`commit_count`, 8B BE), bumped in the
//! same transaction as the account writes.
//!
//! ## Atomicity
//!
//! A whole [`WriteSet`] becomes one sled `Batch`, and a batch is applied
//! atomically. Both trees are updated inside a single sled transaction so
//! the commit counter can never disagree with the accounts it counts.

use std::path::Path;

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Batch, Db, Transactional, Tree};

use super::ledger::{check_slot, AccountWrite, Ledger, LedgerError, LedgerResult, WriteSet};
use crate::crypto::Address;

/// Metadata key for the number of successful commits.
const META_COMMIT_COUNT: &[u8] = b"commit_count";

/// Persistent ledger backed by sled.
///
/// sled trees are thread-safe, so a `SledLedger` can be cloned or shared
/// via `Arc` without extra locking.
#[derive(Debug, Clone)]
pub struct SledLedger {
    db: Db,
    accounts: Tree,
    metadata: Tree,
}

impl SledLedger {
    /// Open or create a ledger at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> LedgerResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A throwaway ledger deleted when dropped. For tests.
    pub fn open_temporary() -> LedgerResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> LedgerResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let metadata = db.open_tree("metadata")?;
        Ok(Self {
            db,
            accounts,
            metadata,
        })
    }

    /// Number of commits applied since the ledger was created.
    pub fn commit_count(&self) -> LedgerResult<u64> {
        match self.metadata.get(META_COMMIT_COUNT)? {
            Some(bytes) => decode_counter(&bytes),
            None => Ok(0),
        }
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Block until all writes are durable.
    pub fn flush(&self) -> LedgerResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl Ledger for SledLedger {
    fn read(&self, address: &Address) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.accounts.get(address.as_bytes())?.map(|v| v.to_vec()))
    }

    fn commit(&self, writes: WriteSet) -> LedgerResult<()> {
        // Validate every slot before touching the trees.
        let mut batch = Batch::default();
        for (address, write) in writes.iter() {
            match write {
                AccountWrite::Put(data) => {
                    let existing = self.accounts.get(address.as_bytes())?.map(|v| v.len());
                    check_slot(address, existing, data.len())?;
                    batch.insert(address.as_bytes().as_slice(), data.as_slice());
                }
                AccountWrite::Delete => batch.remove(address.as_bytes().as_slice()),
            }
        }

        let next_count = self.commit_count()? + 1;

        (&self.accounts, &self.metadata)
            .transaction(|(accounts, metadata)| {
                accounts.apply_batch(&batch)?;
                metadata.insert(META_COMMIT_COUNT, next_count.to_be_bytes().to_vec())?;
                Ok::<(), ConflictableTransactionError<LedgerError>>(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(inner) => inner,
                TransactionError::Storage(err) => LedgerError::Sled(err),
            })?;

        self.db.flush()?;
        Ok(())
    }
}

fn decode_counter(bytes: &[u8]) -> LedgerResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| LedgerError::Corrupt("invalid commit counter bytes".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

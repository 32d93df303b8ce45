//! Append-only transaction storage.
//!
//! The ledger never updates or deletes rows; every store only needs to append
//! (atomically, for batches) and answer the two read projections below.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use thiserror::Error;

use crate::engine::Balances;
use crate::model::{Points, Transaction};

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    #[error("corrupt row {0}: {1}")]
    Corrupt(i64, String),
}

/// Storage collaborator of the [`Ledger`](crate::Ledger).
pub trait LedgerStore: Send + Sync {
    /// Record one transaction.
    fn append(&self, transaction: &Transaction) -> Result<(), StoreError> {
        self.append_many(std::slice::from_ref(transaction))
    }

    /// Record every transaction or none of them.
    fn append_many(&self, transactions: &[Transaction]) -> Result<(), StoreError>;

    /// All transactions by timestamp ascending, ties in insertion order.
    fn list_ordered(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Points summed by payer.
    fn balances(&self) -> Result<Balances, StoreError>;

    /// Points summed for one payer; zero if the payer never appeared.
    fn balance(&self, payer: &str) -> Result<Points, StoreError> {
        Ok(self.balances()?.get(payer))
    }

    /// Release the backend. The handle is unusable afterwards.
    fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Shared handle; the backend is released when the last clone drops.
impl<S: LedgerStore + ?Sized> LedgerStore for Arc<S> {
    fn append(&self, transaction: &Transaction) -> Result<(), StoreError> {
        (**self).append(transaction)
    }

    fn append_many(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        (**self).append_many(transactions)
    }

    fn list_ordered(&self) -> Result<Vec<Transaction>, StoreError> {
        (**self).list_ordered()
    }

    fn balances(&self) -> Result<Balances, StoreError> {
        (**self).balances()
    }

    fn balance(&self, payer: &str) -> Result<Points, StoreError> {
        (**self).balance(payer)
    }
}

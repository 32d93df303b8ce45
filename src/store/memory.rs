use std::sync::RwLock;

use super::{LedgerStore, StoreError};
use crate::engine::Balances;
use crate::model::Transaction;

/// Process-local store, used for CSV replays and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: RwLock<Vec<Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn append_many(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        let mut stored = self
            .transactions
            .write()
            .map_err(|_| StoreError::Poisoned("memory store"))?;
        stored.extend_from_slice(transactions);
        Ok(())
    }

    fn list_ordered(&self) -> Result<Vec<Transaction>, StoreError> {
        let mut ordered = self
            .transactions
            .read()
            .map_err(|_| StoreError::Poisoned("memory store"))?
            .clone();
        // stable: equal timestamps keep insertion order
        ordered.sort_by_key(|tx| tx.timestamp);
        Ok(ordered)
    }

    fn balances(&self) -> Result<Balances, StoreError> {
        let stored = self
            .transactions
            .read()
            .map_err(|_| StoreError::Poisoned("memory store"))?;
        Ok(Balances::from_transactions(stored.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn list_ordered_sorts_by_timestamp_and_keeps_ties_in_insertion_order() {
        let store = MemoryStore::new();
        let early = Utc.with_ymd_and_hms(2022, 10, 31, 10, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2022, 11, 1, 10, 0, 0).unwrap();

        store.append(&Transaction::new("LATE", 1, late)).unwrap();
        store.append(&Transaction::new("FIRST", 2, early)).unwrap();
        store.append(&Transaction::new("SECOND", 3, early)).unwrap();

        let payers: Vec<_> = store
            .list_ordered()
            .unwrap()
            .into_iter()
            .map(|tx| tx.payer)
            .collect();
        assert_eq!(payers, vec!["FIRST", "SECOND", "LATE"]);
    }

    #[test]
    fn balances_sum_by_payer() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .append_many(&[
                Transaction::new("DANNON", 300, now),
                Transaction::new("DANNON", -300, now),
                Transaction::new("UNILEVER", 200, now),
            ])
            .unwrap();

        let balances = store.balances().unwrap();
        assert_eq!(balances.get("DANNON"), 0);
        assert_eq!(balances.get("UNILEVER"), 200);
        assert_eq!(balances.len(), 2);
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        store.append_many(&[]).unwrap();
        assert!(store.list_ordered().unwrap().is_empty());
        assert!(store.balances().unwrap().is_empty());
    }
}

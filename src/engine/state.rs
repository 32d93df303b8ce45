use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Payer, Points, Transaction};

/// Per-payer point totals, derived from the ledger.
///
/// Payers that never appeared are absent and read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Balances(BTreeMap<Payer, Points>);

impl Balances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum every transaction's points by payer.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        let mut balances = Self::new();
        for tx in transactions {
            balances.add(&tx.payer, tx.points);
        }
        balances
    }

    pub fn add(&mut self, payer: &str, points: Points) {
        let balance = self.0.entry(payer.to_string()).or_default();
        *balance = balance.saturating_add(points);
    }

    pub fn get(&self, payer: &str) -> Points {
        self.0.get(payer).copied().unwrap_or_default()
    }

    pub fn total(&self) -> Points {
        self.0.values().fold(0, |acc, points| acc.saturating_add(*points))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Points)> + '_ {
        self.0.iter().map(|(payer, points)| (payer.as_str(), *points))
    }
}

impl FromIterator<(Payer, Points)> for Balances {
    fn from_iter<I: IntoIterator<Item = (Payer, Points)>>(iter: I) -> Self {
        let mut balances = Self::new();
        for (payer, points) in iter {
            balances.add(&payer, points);
        }
        balances
    }
}

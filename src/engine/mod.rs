//! Points ledger engine.
//!
//! The engine records credits and spends points oldest-first across payers.
//! All state lives in the [`LedgerStore`]; the engine only derives balances and
//! spend plans from it. [`Ledger::run`] applies a whole async stream of
//! operations, logging and skipping the ones that fail.

use std::sync::Mutex;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::model::{Operation, Points, Transaction};
use crate::store::{LedgerStore, StoreError};

mod allocator;
pub use allocator::{Debit, SpendPlan, allocate};

mod state;
pub use state::Balances;

mod error;
pub use error::{InsufficientPoints, LedgerError, ValidationError};

/// The points ledger.
///
/// Writes (credits, and the whole read-allocate-append sequence of a spend) are
/// serialized, so a committed spend never overdraws a payer even under
/// concurrent callers.
pub struct Ledger {
    store: Box<dyn LedgerStore>,
    writer: Mutex<()>,
}

/// Public API
impl Ledger {
    pub fn new(store: impl LedgerStore + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn LedgerStore>) -> Self {
        Self {
            store,
            writer: Mutex::new(()),
        }
    }

    /// Run the ledger over the given operation stream
    pub async fn run(&self, mut stream: impl Stream<Item = Operation> + Unpin) {
        while let Some(op) = stream.next().await {
            // failures are logged by `apply` and must not stop the run
            let _ = self.apply(op);
        }
    }

    /// Apply a single operation, returning the spend plan for spends.
    pub fn apply(&self, op: Operation) -> Result<Option<SpendPlan>, LedgerError> {
        match op {
            Operation::AddCredit {
                payer,
                points,
                timestamp,
            } => self.add_credit(&payer, points, timestamp).map(|()| None),
            Operation::Spend { points } => self.spend(points).map(Some),
        }
    }

    /// Record a transaction for `payer`. Any sign is accepted, as long as the
    /// payer's balance stays within range. The timestamp is kept to the
    /// microsecond.
    pub fn add_credit(
        &self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let result = self.record(payer, points, timestamp);
        match &result {
            Ok(()) => info!(payer, points, %timestamp, "credit applied"),
            Err(e) => warn!(payer, points, %timestamp, reason = %e, "credit skipped"),
        }
        result
    }

    /// Spend exactly `points`, oldest points first.
    ///
    /// Either the whole plan is written or nothing is.
    pub fn spend(&self, points: Points) -> Result<SpendPlan, LedgerError> {
        let result = self.commit_spend(points);
        match &result {
            Ok(plan) => {
                for debit in plan.iter() {
                    info!(payer = %debit.payer, points = debit.points, "debit applied");
                }
                info!(points, payers = plan.len(), "spend applied");
            }
            Err(e) => warn!(points, reason = %e, "spend skipped"),
        }
        result
    }

    /// Current balance of every payer seen so far, including those at zero.
    pub fn balances(&self) -> Result<Balances, LedgerError> {
        Ok(self.store.balances()?)
    }

    /// Close the underlying store.
    pub fn close(self) -> Result<(), LedgerError> {
        Ok(self.store.close()?)
    }
}

/// Private API
impl Ledger {
    fn lock_writer(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.writer
            .lock()
            .map_err(|_| StoreError::Poisoned("ledger writer"))
    }

    fn record(
        &self,
        payer: &str,
        points: Points,
        timestamp: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if payer.is_empty() {
            return Err(ValidationError::EmptyPayer.into());
        }
        let timestamp = ledger_instant(timestamp)?;

        let _guard = self.lock_writer()?;
        let balance = self.store.balance(payer)?;
        if balance.checked_add(points).is_none() {
            return Err(ValidationError::Overflow(payer.to_string(), points).into());
        }
        self.store
            .append(&Transaction::new(payer, points, timestamp))?;
        Ok(())
    }

    /// Read a snapshot, allocate, and append the debits as one batch.
    fn commit_spend(&self, points: Points) -> Result<SpendPlan, LedgerError> {
        if points < 0 {
            return Err(ValidationError::NegativeSpend(points).into());
        }

        let _guard = self.lock_writer()?;
        let history = self.store.list_ordered()?;
        let balances = self.store.balances()?;
        let plan = allocate(&history, &balances, points)?;
        if plan.is_empty() {
            return Ok(plan);
        }

        let timestamp = debit_timestamp(&history, Utc::now())?;
        let debits: Vec<Transaction> = plan
            .iter()
            .map(|debit| Transaction::new(debit.payer.clone(), debit.points, timestamp))
            .collect();
        self.store.append_many(&debits)?;

        Ok(plan)
    }
}

/// Ledger timestamps have microsecond resolution in every store. A credit must
/// also leave room for a debit to be ordered after it.
fn ledger_instant(timestamp: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    let truncated = timestamp.trunc_subsecs(6);
    match truncated.checked_add_signed(Duration::microseconds(1)) {
        Some(_) => Ok(truncated),
        None => Err(ValidationError::TimestampOutOfRange(timestamp)),
    }
}

/// Debits must sort after every transaction that funded them, even when
/// credits were recorded with future timestamps.
fn debit_timestamp(
    history: &[Transaction],
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ValidationError> {
    let now = now.trunc_subsecs(6);
    match history.iter().map(|tx| tx.timestamp).max() {
        Some(latest) if latest >= now => latest
            .checked_add_signed(Duration::microseconds(1))
            .ok_or(ValidationError::TimestampOutOfRange(latest)),
        _ => Ok(now),
    }
}

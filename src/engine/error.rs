//! Error types for ledger operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::Points;
use crate::store::StoreError;

/// Top-level error returned by [`Ledger`](super::Ledger) operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    InsufficientPoints(#[from] InsufficientPoints),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Malformed input rejected before touching the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payer must not be empty")]
    EmptyPayer,
    #[error("cannot spend a negative amount of points ({0})")]
    NegativeSpend(Points),
    #[error("adding {1} points would overflow the balance of {0}")]
    Overflow(String, Points),
    #[error("timestamp {0} leaves no room for later transactions")]
    TimestampOutOfRange(DateTime<Utc>),
}

/// A spend that cannot be covered by the current balances.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsufficientPoints {
    #[error("cannot spend {0} points: only {1} points available")]
    Exceeds(Points, Points),
    #[error("unable to allocate {0} of the {1} requested points")]
    Unallocated(Points, Points),
}

//! Core domain types for the points ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payer identifier.
pub type Payer = String;

/// Signed whole points.
pub type Points = i64;

/// An immutable ledger entry. Positive points are credits, negative points debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(payer: impl Into<Payer>, points: Points, timestamp: DateTime<Utc>) -> Self {
        Self {
            payer: payer.into(),
            points,
            timestamp,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.points > 0
    }
}

/// An operation submitted to the ledger.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Record a transaction for a payer (any sign).
    AddCredit {
        payer: Payer,
        points: Points,
        timestamp: DateTime<Utc>,
    },
    /// Redeem points oldest-first across payers.
    Spend { points: Points },
}

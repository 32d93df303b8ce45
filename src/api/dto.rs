//! Request bodies accepted by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Payer, Points};

/// Body of `POST /add`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRequest {
    pub payer: Payer,
    pub points: Points,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /spend`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpendRequest {
    pub points: Points,
}

//! Route handlers. Ledger calls run on the blocking pool.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tokio::task::spawn_blocking;

use super::AppState;
use super::dto::{AddRequest, SpendRequest};
use super::error::ApiResult;
use crate::engine::{Balances, SpendPlan};

/// `GET /`
pub async fn version() -> String {
    format!("points-ledger v{}", env!("CARGO_PKG_VERSION"))
}

/// `POST /add`
pub async fn add(
    State(state): State<AppState>,
    body: Result<Json<AddRequest>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(req) = body?;
    let ledger = state.ledger.clone();
    spawn_blocking(move || ledger.add_credit(&req.payer, req.points, req.timestamp)).await??;
    Ok(StatusCode::OK)
}

/// `POST /spend`
pub async fn spend(
    State(state): State<AppState>,
    body: Result<Json<SpendRequest>, JsonRejection>,
) -> ApiResult<Json<SpendPlan>> {
    let Json(req) = body?;
    let ledger = state.ledger.clone();
    let plan = spawn_blocking(move || ledger.spend(req.points)).await??;
    Ok(Json(plan))
}

/// `GET /balance`
pub async fn balance(State(state): State<AppState>) -> ApiResult<Json<Balances>> {
    let ledger = state.ledger.clone();
    let balances = spawn_blocking(move || ledger.balances()).await??;
    Ok(Json(balances))
}

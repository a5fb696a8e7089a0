//! Ledger history and balance endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use repasseweb_core::{ActorBalance, BalanceQuery, HistoryEntry, LedgerQueryParams};

use crate::{ApiError, AppState};

pub async fn ledger_history(
    State(state): State<AppState>,
    params: Result<Query<LedgerQueryParams>, QueryRejection>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let Query(params) = params?;
    let rows = state
        .dashboard
        .ledger_history(params)
        .await
        .map_err(|e| ApiError::core("ledger_history", e))?;
    Ok(Json(rows))
}

pub async fn actor_balances(
    State(state): State<AppState>,
    params: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<Vec<ActorBalance>>, ApiError> {
    let Query(params) = params?;
    let balances = state
        .dashboard
        .actor_balances(params)
        .await
        .map_err(|e| ApiError::core("actor_balances", e))?;
    Ok(Json(balances))
}

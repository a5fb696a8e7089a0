//! Payout endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};

use repasseweb_core::{
    ActorKind, ConfirmDraft, PayoutDraft, PayoutReceipt, PendingPayoutReport, SettleDraft,
};

use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct PendingParams {
    #[serde(default)]
    pub tipo: Option<String>,
}

/// Body returned by process and settle
#[derive(Debug, Serialize)]
pub struct PayoutResponse {
    pub sucesso: bool,
    #[serde(flatten)]
    pub receipt: PayoutReceipt,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub sucesso: bool,
    pub mensagem: Option<String>,
}

pub async fn pending_payouts(
    State(state): State<AppState>,
    params: Result<Query<PendingParams>, QueryRejection>,
) -> Result<Json<PendingPayoutReport>, ApiError> {
    let Query(params) = params?;
    let kind = ActorKind::from_filter(params.tipo.as_deref());
    let report = state
        .dashboard
        .pending_payouts(kind)
        .await
        .map_err(|e| ApiError::core("pending_payouts", e))?;
    Ok(Json(report))
}

pub async fn process_payout(
    State(state): State<AppState>,
    payload: Result<Json<PayoutDraft>, JsonRejection>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let Json(draft) = payload?;
    let receipt = state
        .dashboard
        .process_payout(draft)
        .await
        .map_err(|e| ApiError::core("process_payout", e))?;
    Ok(Json(PayoutResponse { sucesso: true, receipt }))
}

pub async fn confirm_payout(
    State(state): State<AppState>,
    payload: Result<Json<ConfirmDraft>, JsonRejection>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let Json(draft) = payload?;
    let mensagem = state
        .dashboard
        .confirm_payout(draft)
        .await
        .map_err(|e| ApiError::core("confirm_payout", e))?;
    Ok(Json(ConfirmResponse { sucesso: true, mensagem }))
}

pub async fn settle_payout(
    State(state): State<AppState>,
    payload: Result<Json<SettleDraft>, JsonRejection>,
) -> Result<Json<PayoutResponse>, ApiError> {
    let Json(draft) = payload?;
    let receipt = state
        .dashboard
        .settle_payout(draft)
        .await
        .map_err(|e| ApiError::core("settle_payout", e))?;
    Ok(Json(PayoutResponse { sucesso: true, receipt }))
}

//! Manual transfer endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};

use crate::{ApiError, AppState};

/// Accepts the tagged body or either legacy shape
pub async fn confirm_transfer(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let request = state
        .dashboard
        .confirm_transfer(body)
        .await
        .map_err(|e| ApiError::core("confirm_transfer", e))?;
    Ok(Json(json!({
        "ok": true,
        "tipo_usuario": request.actor_kind(),
        "id_usuario": request.actor_id(),
    })))
}

//! Cash closure endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde_json::{json, Value};

use repasseweb_core::{ApproveClosureDraft, Closure, ClosureQueryParams};

use crate::{ApiError, AppState};

pub async fn list_closures(
    State(state): State<AppState>,
    params: Result<Query<ClosureQueryParams>, QueryRejection>,
) -> Result<Json<Vec<Closure>>, ApiError> {
    let Query(params) = params?;
    let closures = state
        .dashboard
        .closures(params)
        .await
        .map_err(|e| ApiError::core("list_closures", e))?;
    Ok(Json(closures))
}

pub async fn approve_closure(
    State(state): State<AppState>,
    payload: Result<Json<ApproveClosureDraft>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(draft) = payload?;
    let closure = state
        .dashboard
        .approve_closure(draft)
        .await
        .map_err(|e| ApiError::core("approve_closure", e))?;
    Ok(Json(json!({ "success": true, "fechamento": closure })))
}

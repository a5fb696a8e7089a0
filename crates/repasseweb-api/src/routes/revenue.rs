//! Platform revenue endpoint

use axum::{extract::State, Json};
use chrono::Utc;

use repasseweb_core::RevenueReport;

use crate::{ApiError, AppState};

pub async fn platform_revenue(State(state): State<AppState>) -> Result<Json<RevenueReport>, ApiError> {
    let today = Utc::now().date_naive();
    let report = state
        .dashboard
        .platform_revenue(today)
        .await
        .map_err(|e| ApiError::core("platform_revenue", e))?;
    Ok(Json(report))
}

//! Authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::session::{credentials_match, removal_cookie, session_cookie, Session};
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), ApiError> {
    let Json(login) = payload?;
    let auth = &state.config.auth;

    if !credentials_match(auth, &login.email, &login.password) {
        log::warn!("Rejected login attempt for {}", login.email.trim());
        return Err(ApiError::InvalidCredentials);
    }

    let session = state.sessions.create(&login.email).await;
    log::info!("Admin {} signed in until {}", session.email, session.expires_at);
    Ok((jar.add(session_cookie(auth, &session.token)), Json(json!({ "ok": true }))))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let auth = &state.config.auth;
    if let Some(cookie) = jar.get(&auth.cookie_name) {
        if state.sessions.revoke(cookie.value()).await {
            log::info!("Admin session closed");
        }
    }
    (jar.remove(removal_cookie(auth)), Json(json!({ "ok": true })))
}

pub async fn current_session(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

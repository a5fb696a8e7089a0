//! Admin sessions
//!
//! A successful login stores a [`Session`] under a random token and hands the
//! token back in an HttpOnly cookie. Protected routes go through
//! [`require_session`], which resolves the cookie to a live session.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use repasseweb_config::{AuthConfig, MAX_SESSION_TTL_HOURS};

use crate::{ApiError, AppState};

/// An authenticated admin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    pub email: String,
    #[serde(rename = "emitida_em")]
    pub issued_at: DateTime<Utc>,
    #[serde(rename = "expira_em")]
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// In-process session store keyed by token
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Lifetimes above [`MAX_SESSION_TTL_HOURS`] are capped
    pub fn new(ttl_hours: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::try_hours(capped_hours(ttl_hours)).unwrap_or_else(Duration::zero),
        }
    }

    pub async fn create(&self, email: &str) -> Session {
        self.create_at(email, Utc::now()).await
    }

    /// Open a session at `now`, dropping expired ones first
    pub async fn create_at(&self, email: &str, now: DateTime<Utc>) -> Session {
        let session = Session {
            token: uuid::Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            issued_at: now,
            expires_at: now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.get_at(token, Utc::now()).await
    }

    /// Live session for a token; an expired one is removed
    pub async fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if session.is_expired(now) {
            self.sessions.write().await.remove(token);
            log::info!("Session for {} expired", session.email);
            return None;
        }
        Some(session)
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn capped_hours(ttl_hours: u64) -> i64 {
    i64::try_from(ttl_hours.min(MAX_SESSION_TTL_HOURS)).unwrap_or(0)
}

/// Compare login credentials with the configured admin in constant time
pub fn credentials_match(auth: &AuthConfig, email: &str, password: &str) -> bool {
    let email = email.trim().to_lowercase();
    let expected_email = auth.admin_email.trim().to_lowercase();
    let email_ok: bool = email.as_bytes().ct_eq(expected_email.as_bytes()).into();
    let password_ok: bool = password.as_bytes().ct_eq(auth.admin_password.as_bytes()).into();
    email_ok & password_ok
}

/// Cookie carrying the session token
pub fn session_cookie(auth: &AuthConfig, token: &str) -> Cookie<'static> {
    Cookie::build((auth.cookie_name.clone(), token.to_string()))
        .path("/")
        .http_only(true)
        .secure(auth.secure_cookie)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(capped_hours(auth.session_ttl_hours)))
        .build()
}

/// Cookie that clears the session token
pub fn removal_cookie(auth: &AuthConfig) -> Cookie<'static> {
    Cookie::build((auth.cookie_name.clone(), "")).path("/").build()
}

/// Reject requests without a live session; the session is passed on as an extension
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(&state.config.auth.cookie_name)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;
    let session = state
        .sessions
        .get(&token)
        .await
        .ok_or(ApiError::Unauthorized)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

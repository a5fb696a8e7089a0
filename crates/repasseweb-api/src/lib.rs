//! JSON API server for the payout dashboard
//!
//! Routes are organized into modules:
//! - routes::auth: admin login and session
//! - routes::payouts: pending payouts and the payout workflow
//! - routes::transfers: manual transfers
//! - routes::closures: cash closures
//! - routes::revenue: platform revenue
//! - routes::ledger: history and balances

pub mod error;
pub mod routes;
pub mod session;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};

use repasseweb_config::Config;
use repasseweb_core::Dashboard;

pub use error::ApiError;
pub use session::{Session, SessionStore};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    pub sessions: Arc<SessionStore>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            sessions: Arc::new(SessionStore::new(config.auth.session_ttl_hours)),
            config: Arc::new(config),
        }
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::auth::{current_session, login, logout};
    use routes::closures::{approve_closure, list_closures};
    use routes::ledger::{actor_balances, ledger_history};
    use routes::payouts::{confirm_payout, pending_payouts, process_payout, settle_payout};
    use routes::revenue::platform_revenue;
    use routes::transfers::confirm_transfer;

    let protected = Router::new()
        .route("/api/auth/sessao", get(current_session))
        .route("/api/entregadores/pendentes", get(pending_payouts))
        .route("/api/pagamentos/processar", post(process_payout))
        .route("/api/pagamentos/confirmar", post(confirm_payout))
        .route("/api/pagamentos/liquidar", post(settle_payout))
        .route("/api/repasses/confirmar", post(confirm_transfer))
        .route("/api/fechamentos/listar", get(list_closures))
        .route("/api/fechamentos/aprovar", post(approve_closure))
        .route("/api/receita-plataforma", get(platform_revenue))
        .route("/api/extrato", get(ledger_history))
        .route("/api/saldos", get(actor_balances))
        .route_layer(middleware::from_fn_with_state(state.clone(), session::require_session));

    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .merge(protected)
        .with_state(state.clone());

    match cors_layer(&state.config.server.allowed_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the configured dashboard origins; `None` when none are set
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
    )
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Start the HTTP server
///
/// Serves until Ctrl-C is received.
pub async fn start_server(config: Config, dashboard: Dashboard) -> std::io::Result<()> {
    let addr = config.bind_address();
    let backend = dashboard.backend_name();
    let router = create_router(AppState::new(config, dashboard));

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting repasseweb on http://{} ({} backend)", addr, backend);
    log::info!("Available routes:");
    log::info!("  - /api/auth/* (Admin session)");
    log::info!("  - /api/entregadores/pendentes (Pending payouts)");
    log::info!("  - /api/pagamentos/* (Process, confirm and settle payouts)");
    log::info!("  - /api/repasses/confirmar (Manual transfers)");
    log::info!("  - /api/fechamentos/* (Cash closures)");
    log::info!("  - /api/receita-plataforma (Platform revenue)");
    log::info!("  - /api/extrato, /api/saldos (Ledger history and balances)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use repasseweb_api::{create_router, AppState};
use repasseweb_config::{Config, QueryConfig};
use repasseweb_core::Dashboard;
use repasseweb_store::{MemoryBackend, Seed};

const EMAIL: &str = "admin@example.com";
const PASSWORD: &str = "correct horse";

fn app() -> Router {
    let mut config = Config::default();
    config.auth.admin_email = EMAIL.to_string();
    config.auth.admin_password = PASSWORD.to_string();
    config.auth.secure_cookie = false;

    let backend = MemoryBackend::from_seed(Seed::demo().unwrap())
        .with_fixed_time(Utc.with_ymd_and_hms(2024, 6, 8, 15, 0, 0).unwrap());
    let dashboard = Dashboard::new(Arc::new(backend), QueryConfig::default());
    create_router(AppState::new(config, dashboard))
}

struct Reply {
    status: StatusCode,
    body: Value,
    set_cookie: Option<String>,
}

async fn send(app: &Router, request: Request<Body>) -> Reply {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    Reply { status, body, set_cookie }
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login(app: &Router) -> String {
    let reply = send(app, post("/api/auth/login", "", json!({ "email": EMAIL, "password": PASSWORD }))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "ok": true }));
    let cookie = reply.set_cookie.expect("login sets the session cookie");
    assert!(cookie.contains("HttpOnly"));
    cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = app();
    let reply = send(&app, Request::builder().uri("/api/health").body(Body::empty()).unwrap()).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = app();
    for uri in ["/api/saldos", "/api/entregadores/pendentes", "/api/auth/sessao"] {
        let reply = send(&app, get(uri, "")).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(reply.body["ok"], false);
        assert_eq!(reply.body["code"], "UNAUTHORIZED");
    }

    let forged = send(&app, get("/api/saldos", "admin_token=not-a-session")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_credentials() {
    let app = app();
    let reply = send(
        &app,
        post("/api/auth/login", "", json!({ "email": EMAIL, "password": "wrong" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.set_cookie.is_none());
    assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn test_session_and_logout() {
    let app = app();
    let cookie = login(&app).await;

    let session = send(&app, get("/api/auth/sessao", &cookie)).await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["email"], EMAIL);
    assert!(session.body.get("token").is_none());

    let logout = send(&app, post("/api/auth/logout", &cookie, json!({}))).await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = send(&app, get("/api/auth/sessao", &cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pending_payout_report() {
    let app = app();
    let cookie = login(&app).await;

    let reply = send(&app, get("/api/entregadores/pendentes", &cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    let resumo = &reply.body["resumo"];
    assert_eq!(resumo["total"], 4);
    assert_eq!(resumo["total_entregadores"], 3);
    assert_eq!(resumo["total_restaurantes"], 1);
    assert_eq!(resumo["total_alertas"], 1);
    assert_eq!(reply.body["alertas"][0]["status_validacao"], "SEM_CHAVE_PIX");

    let only_restaurants = send(&app, get("/api/entregadores/pendentes?tipo=restaurante", &cookie)).await;
    assert_eq!(only_restaurants.body["resumo"]["total"], 1);

    // unknown kinds fall back to everything
    let unknown = send(&app, get("/api/entregadores/pendentes?tipo=admin", &cookie)).await;
    assert_eq!(unknown.body["resumo"]["total"], 4);
}

#[tokio::test]
async fn test_process_and_confirm_payout() {
    let app = app();
    let cookie = login(&app).await;

    let processed = send(
        &app,
        post(
            "/api/pagamentos/processar",
            &cookie,
            json!({ "id_entregador": "ent-001", "valor": 20, "chave_pix": "ana.souza@pix.example" }),
        ),
    )
    .await;
    assert_eq!(processed.status, StatusCode::OK);
    assert_eq!(processed.body["sucesso"], true);
    assert_eq!(processed.body["saldo_anterior"].as_f64(), Some(60.0));
    assert_eq!(processed.body["saldo_posterior"].as_f64(), Some(40.0));
    let movement = processed.body["id_movimentacao"].as_str().unwrap().to_string();

    let again = send(
        &app,
        post(
            "/api/pagamentos/processar",
            &cookie,
            json!({ "id_entregador": "ent-001", "valor": 5, "chave_pix": "ana.souza@pix.example" }),
        ),
    )
    .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["code"], "ALREADY_PROCESSED");

    let confirmed = send(
        &app,
        post(
            "/api/pagamentos/confirmar",
            &cookie,
            json!({ "id_movimentacao": movement, "comprovante_url": "https://receipts.example/1.pdf" }),
        ),
    )
    .await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.body["sucesso"], true);

    let history = send(&app, get("/api/extrato?id_usuario=ent-001&status=pago", &cookie)).await;
    assert_eq!(history.status, StatusCode::OK);
    let rows = history.body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id_movimentacao"], movement.as_str());
    assert_eq!(rows[0]["nome_usuario"], "Ana Souza");
}

#[tokio::test]
async fn test_payout_validation_happens_first() {
    let app = app();
    let cookie = login(&app).await;

    let zero = send(
        &app,
        post(
            "/api/pagamentos/processar",
            &cookie,
            json!({ "id_entregador": "ent-001", "valor": 0, "chave_pix": "ana.souza@pix.example" }),
        ),
    )
    .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);
    assert_eq!(zero.body["code"], "VALIDATION_ERROR");

    let missing = send(&app, post("/api/pagamentos/processar", &cookie, json!({ "valor": 10 }))).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let no_id = send(&app, post("/api/pagamentos/confirmar", &cookie, json!({}))).await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/pagamentos/processar")
        .header(header::COOKIE, &cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let reply = send(&app, malformed).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["ok"], false);

    let unknown = send(&app, post("/api/pagamentos/confirmar", &cookie, json!({ "id_movimentacao": "nope" }))).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settle_clears_balance() {
    let app = app();
    let cookie = login(&app).await;

    let settled = send(
        &app,
        post(
            "/api/pagamentos/liquidar",
            &cookie,
            json!({ "id_entregador": "ent-002", "valor": "42.50", "chave_pix": "11987654321" }),
        ),
    )
    .await;
    assert_eq!(settled.status, StatusCode::OK);
    assert_eq!(settled.body["saldo_posterior"].as_f64(), Some(0.0));

    let balances = send(&app, get("/api/saldos?tipo_usuario=entregador", &cookie)).await;
    let ids: Vec<&str> = balances
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id_usuario"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ent-001", "ent-003"]);
}

#[tokio::test]
async fn test_active_balances() {
    let app = app();
    let cookie = login(&app).await;

    let reply = send(&app, get("/api/saldos", &cookie)).await;
    let rows = reply.body.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["id_usuario"], "rest-001");
    assert_eq!(rows[0]["saldo_pendente"].as_f64(), Some(870.0));
    assert!(rows.iter().all(|r| r["id_usuario"] != "rest-002"));

    let search = send(&app, get("/api/saldos?busca=ANA", &cookie)).await;
    let rows = search.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["nome_usuario"], "Ana Souza");
    assert_eq!(rows[0]["saldo_pendente"].as_f64(), Some(60.0));
}

#[tokio::test]
async fn test_manual_transfers() {
    let app = app();
    let cookie = login(&app).await;

    let unsupported = send(&app, post("/api/repasses/confirmar", &cookie, json!({ "foo": 1 }))).await;
    assert_eq!(unsupported.status, StatusCode::BAD_REQUEST);
    assert_eq!(unsupported.body["code"], "INVALID_FORMAT");

    let legacy = send(
        &app,
        post("/api/repasses/confirmar", &cookie, json!({ "restauranteId": "rest-001", "valor": 100 })),
    )
    .await;
    assert_eq!(legacy.status, StatusCode::OK);
    assert_eq!(legacy.body["ok"], true);

    let tagged = send(
        &app,
        post(
            "/api/repasses/confirmar",
            &cookie,
            json!({
                "variant": "usuario",
                "id_usuario": "ent-003",
                "tipo_usuario": "entregador",
                "valor": 18,
                "observacao": "Pago em dinheiro"
            }),
        ),
    )
    .await;
    assert_eq!(tagged.status, StatusCode::OK);

    let balances = send(&app, get("/api/saldos", &cookie)).await;
    let restaurant = balances
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id_usuario"] == "rest-001")
        .cloned()
        .unwrap();
    assert_eq!(restaurant["saldo_pendente"].as_f64(), Some(770.0));
    assert!(balances.body.as_array().unwrap().iter().all(|b| b["id_usuario"] != "ent-003"));

    let negative = send(
        &app,
        post("/api/repasses/confirmar", &cookie, json!({ "restauranteId": "rest-001", "valor": -5 })),
    )
    .await;
    assert_eq!(negative.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_closure_listing_and_approval() {
    let app = app();
    let cookie = login(&app).await;

    let pending = send(&app, get("/api/fechamentos/listar", &cookie)).await;
    let rows = pending.body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "fech-001");
    assert_eq!(rows[0]["nome_usuario"], "Pizzaria Bella Napoli");

    let all = send(&app, get("/api/fechamentos/listar?status=todos", &cookie)).await;
    assert_eq!(all.body.as_array().unwrap().len(), 2);

    let bogus = send(&app, get("/api/fechamentos/listar?status=arquivado", &cookie)).await;
    assert_eq!(bogus.status, StatusCode::BAD_REQUEST);

    let approved = send(
        &app,
        post(
            "/api/fechamentos/aprovar",
            &cookie,
            json!({ "id_fechamento": "fech-001", "observacoes": "Conferido" }),
        ),
    )
    .await;
    assert_eq!(approved.status, StatusCode::OK);
    assert_eq!(approved.body["success"], true);
    assert_eq!(approved.body["fechamento"]["status"], "aprovado");

    let again = send(
        &app,
        post("/api/fechamentos/aprovar", &cookie, json!({ "id_fechamento": "fech-001" })),
    )
    .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.body["code"], "ALREADY_PROCESSED");

    let history = send(&app, get("/api/extrato?id_usuario=rest-001&tipo_usuario=restaurante", &cookie)).await;
    let exits: Vec<&Value> = history
        .body
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["tipo"] == "saida")
        .collect();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0]["valor"].as_f64(), Some(870.0));

    let missing = send(
        &app,
        post("/api/fechamentos/aprovar", &cookie, json!({ "id_fechamento": "fech-999" })),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let no_id = send(&app, post("/api/fechamentos/aprovar", &cookie, json!({}))).await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_filters() {
    let app = app();
    let cookie = login(&app).await;

    let window = send(&app, get("/api/extrato?de=2024-06-02&ate=2024-06-02", &cookie)).await;
    let ids: Vec<&str> = window
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id_movimentacao"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["mov-0006", "mov-0004", "mov-0007", "mov-0002"]);

    let limited = send(&app, get("/api/extrato?limite=2", &cookie)).await;
    assert_eq!(limited.body.as_array().unwrap().len(), 2);

    let inverted = send(&app, get("/api/extrato?de=2024-06-05&ate=2024-06-01", &cookie)).await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_query_strings_get_json_errors() {
    let app = app();
    let cookie = login(&app).await;

    for uri in [
        "/api/fechamentos/listar?status=pendente&status=todos",
        "/api/saldos?busca=a&busca=b",
        "/api/entregadores/pendentes?tipo=a&tipo=b",
        "/api/extrato?limite=dez",
    ] {
        let reply = send(&app, get(uri, &cookie)).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(reply.body["ok"], false, "{}", uri);
        assert!(reply.body["error"].is_string(), "{}", uri);
        assert_eq!(reply.body["code"], "VALIDATION_ERROR", "{}", uri);
    }
}

#[tokio::test]
async fn test_platform_revenue() {
    let app = app();
    let cookie = login(&app).await;

    let reply = send(&app, get("/api/receita-plataforma", &cookie)).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["receita_diaria"].as_array().unwrap().len(), 3);
    assert_eq!(reply.body["top_restaurantes"][0]["nome_fantasia"], "Pizzaria Bella Napoli");
    assert_eq!(reply.body["resumo"]["qtd_pedidos_total"], 26);
}

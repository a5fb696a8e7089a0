//! Ledger backend for a hosted database reached through PostgREST
//!
//! Reads go to the dashboard views with filters encoded as PostgREST query
//! parameters. Payout and transfer mutations call the stored procedures over
//! `/rpc`. Closure approval is a guarded update followed by an insert.

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{header, Method};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use repasseweb_config::BackendConfig;
use repasseweb_core::closure;
use repasseweb_core::wire;
use repasseweb_core::{
    ActorKind, ActorName, ApproveClosure, Closure, ClosureQuery, ClosureStatus, ConfirmPayout,
    CoreError, CoreResult, EntryStatus, LedgerBackend, LedgerEntry, LedgerQuery, PayoutReceipt,
    PendingPayout, ProcessPayout, RevenueDay, TopRestaurant, TransferRequest,
};

use crate::error::{StoreError, StoreResult};

const LEDGER_VIEW: &str = "view_extrato_carteira";
const LEDGER_COLUMNS: &str =
    "id_movimentacao,id_usuario,tipo_usuario,tipo,descricao,valor,status,criado_em,tipo_pedido";
const PAYOUT_VIEW: &str = "view_pagamentos_unificada";
const REVENUE_VIEW: &str = "view_receita_plataforma";
const RESTAURANT_SUMMARY_VIEW: &str = "view_resumo_repasses_restaurante";
const CLOSURES_TABLE: &str = "fechamentos_caixa";
const WALLETS_TABLE: &str = "carteiras";
const MOVEMENTS_TABLE: &str = "movimentacoes_carteira";
const RESTAURANTS_TABLE: &str = "restaurantes_app";
const COURIERS_TABLE: &str = "entregadores_app";

const PROCESS_PAYOUT_FN: &str = "processar_pagamento_entregador";
const CONFIRM_PAYOUT_FN: &str = "confirmar_pagamento_entregador";
const MANUAL_TRANSFER_FN: &str = "confirmar_repasso_manual";

/// PostgREST query string builder
///
/// Filters keep insertion order; `order` and `limit` are emitted last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return
    pub fn select(mut self, columns: &str) -> Self {
        self.filters.push(("select".to_string(), columns.to_string()));
        self
    }

    fn filter(mut self, column: &str, operator: &str, value: impl std::fmt::Display) -> Self {
        self.filters
            .push((column.to_string(), format!("{}.{}", operator, value)));
        self
    }

    pub fn eq(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn gte(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, "gte", value)
    }

    pub fn lte(self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filter(column, "lte", value)
    }

    /// Membership filter; values are quoted so ids may contain reserved characters
    pub fn in_list<S: AsRef<str>>(self, column: &str, values: &[S]) -> Self {
        let list = values
            .iter()
            .map(|v| quote(v.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        self.filter(column, "in", format!("({})", list))
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order.push(format!("{}.{}", column, direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Key/value pairs ready for URL encoding
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.filters.clone();
        if !self.order.is_empty() {
            pairs.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}

/// Parameters for a history read
pub fn ledger_params(query: &LedgerQuery) -> QueryParams {
    let mut params = QueryParams::new().select(LEDGER_COLUMNS);
    if let Some(kind) = query.actor_kind {
        params = params.eq("tipo_usuario", kind);
    }
    if let Some(actor_id) = &query.actor_id {
        params = params.eq("id_usuario", actor_id);
    }
    if let Some(status) = query.status {
        params = params.eq("status", status);
    }
    if let Some(start) = query.window.start_bound() {
        params = params.gte("criado_em", start.to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    if let Some(end) = query.window.end_bound() {
        params = params.lte("criado_em", end.to_rfc3339_opts(SecondsFormat::Millis, true));
    }
    params.order("criado_em", false).limit(query.limit)
}

/// Parameters for the entries feeding balance aggregation
pub fn balance_params(kind: Option<ActorKind>) -> QueryParams {
    let counted = [EntryStatus::Pending, EntryStatus::Confirmed, EntryStatus::Paid]
        .map(|s| s.as_str());
    let mut params = QueryParams::new()
        .select(LEDGER_COLUMNS)
        .in_list("status", &counted);
    if let Some(kind) = kind {
        params = params.eq("tipo_usuario", kind);
    }
    params.order("criado_em", false)
}

/// Parameters for the unified payout view
pub fn pending_params(kind: Option<ActorKind>) -> QueryParams {
    let mut params = QueryParams::new().select("*");
    if let Some(kind) = kind {
        params = params.eq("tipo_usuario", kind);
    }
    params
        .order("tipo_usuario", true)
        .order("deve_pagar_hoje", false)
        .order("saldo_disponivel", false)
}

/// Parameters for a closure listing
pub fn closure_params(query: &ClosureQuery) -> QueryParams {
    let mut params = QueryParams::new().select("*");
    if let Some(status) = query.status {
        params = params.eq("status", status);
    }
    if let Some(kind) = query.actor_kind {
        params = params.eq("tipo_usuario", kind);
    }
    params.order("criado_em", false)
}

/// Arguments of the manual transfer procedure for either request shape
pub fn transfer_args(request: &TransferRequest) -> Value {
    match request {
        TransferRequest::Restaurant(t) => json!({
            "p_id_restaurante": t.restaurant_id,
            "p_valor": t.amount,
            "p_comprovante_url": t.receipt_url,
            "p_observacao": t.note,
        }),
        TransferRequest::Actor(t) => json!({
            "p_id_usuario": t.actor_id,
            "p_tipo_usuario": t.actor_kind,
            "p_valor": t.amount,
            "p_admin_id": t.admin_id,
            "p_observacao": t.note,
        }),
    }
}

/// Decode rows one by one, dropping the ones that do not fit the model
pub fn decode_rows<T: DeserializeOwned>(resource: &str, body: Value) -> StoreResult<Vec<T>> {
    let rows = match body {
        Value::Null => return Ok(vec![]),
        Value::Array(rows) => rows,
        other => {
            return Err(StoreError::Decode {
                resource: resource.to_string(),
                message: format!("expected an array, got {}", other),
            })
        }
    };

    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Skipping malformed row from {}: {}", resource, e);
                None
            }
        })
        .collect();
    if decoded.len() < total {
        log::warn!("{}: kept {} of {} rows", resource, decoded.len(), total);
    }
    Ok(decoded)
}

/// Decode the first row strictly; a row that does not fit the model is an error
pub fn decode_first<T: DeserializeOwned>(resource: &str, body: Value) -> StoreResult<Option<T>> {
    let row = match body {
        Value::Null => return Ok(None),
        Value::Array(rows) => match rows.into_iter().next() {
            Some(row) => row,
            None => return Ok(None),
        },
        other => {
            return Err(StoreError::Decode {
                resource: resource.to_string(),
                message: format!("expected an array, got {}", other),
            })
        }
    };

    serde_json::from_value(row)
        .map(Some)
        .map_err(|e| StoreError::Decode {
            resource: resource.to_string(),
            message: e.to_string(),
        })
}

/// First row returned by a stored procedure
#[derive(Debug, Clone, Deserialize)]
pub struct ProcedureOutcome {
    #[serde(default)]
    pub sucesso: bool,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub id_movimentacao: Option<Value>,
    #[serde(default, deserialize_with = "wire::amount::deserialize")]
    pub saldo_anterior: Decimal,
    #[serde(default, deserialize_with = "wire::amount::deserialize")]
    pub saldo_posterior: Decimal,
}

impl ProcedureOutcome {
    /// Extract the outcome from an rpc response (a set or a single row)
    pub fn from_response(function: &str, body: Value) -> StoreResult<Self> {
        let row = match body {
            Value::Array(rows) => rows.into_iter().next(),
            row @ Value::Object(_) => Some(row),
            _ => None,
        }
        .ok_or_else(|| StoreError::Decode {
            resource: function.to_string(),
            message: "procedure returned no rows".to_string(),
        })?;

        serde_json::from_value(row).map_err(|e| StoreError::Decode {
            resource: function.to_string(),
            message: e.to_string(),
        })
    }

    /// Turn `sucesso = false` into a rejection carrying the procedure's message
    pub fn into_result(self, fallback: &str) -> CoreResult<Self> {
        if !self.sucesso {
            return Err(CoreError::Rejected {
                message: self.mensagem.unwrap_or_else(|| fallback.to_string()),
            });
        }
        Ok(self)
    }
}

/// Message of a PostgREST error body, or the raw body
pub fn error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                trimmed.to_string()
            }
        })
}

/// Ledger backend speaking to PostgREST
pub struct PostgrestBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestBackend {
    /// Create a backend for a project URL and API key
    pub fn new(base_url: &str, api_key: &str) -> StoreResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(StoreError::MissingUrl);
        }
        header::HeaderValue::from_str(api_key)
            .map_err(|e| StoreError::InvalidApiKey(e.to_string()))?;

        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Create a backend from the `backend` config section
    pub fn from_config(config: &BackendConfig) -> StoreResult<Self> {
        Self::new(&config.url, &config.api_key)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.rest_url(path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// GET on a table or view
    pub fn build_select(&self, table: &str, params: &QueryParams) -> Result<reqwest::Request, reqwest::Error> {
        self.request(Method::GET, table).query(&params.pairs()).build()
    }

    /// POST to a stored procedure
    pub fn build_rpc(&self, function: &str, args: &Value) -> Result<reqwest::Request, reqwest::Error> {
        self.request(Method::POST, &format!("rpc/{}", function))
            .json(args)
            .build()
    }

    /// PATCH rows matching the filters, returning the updated rows
    pub fn build_update(
        &self,
        table: &str,
        params: &QueryParams,
        body: &Value,
    ) -> Result<reqwest::Request, reqwest::Error> {
        self.request(Method::PATCH, table)
            .query(&params.pairs())
            .header("Prefer", "return=representation")
            .json(body)
            .build()
    }

    /// POST a new row
    pub fn build_insert(&self, table: &str, body: &Value) -> Result<reqwest::Request, reqwest::Error> {
        self.request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(body)
            .build()
    }

    async fn send(&self, request: reqwest::Request, resource: &str) -> StoreResult<Value> {
        log::debug!("{} {}", request.method(), request.url().path());
        let response = self.client.execute(request).await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: error_message(&text, status.as_u16()),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode {
            resource: resource.to_string(),
            message: e.to_string(),
        })
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, params: &QueryParams) -> CoreResult<Vec<T>> {
        let request = self.build_select(table, params).map_err(StoreError::from)?;
        let body = self.send(request, table).await?;
        Ok(decode_rows(table, body)?)
    }

    async fn select_one<T: DeserializeOwned>(&self, table: &str, params: &QueryParams) -> CoreResult<Option<T>> {
        let request = self.build_select(table, params).map_err(StoreError::from)?;
        let body = self.send(request, table).await?;
        Ok(decode_first(table, body)?)
    }

    async fn rpc(&self, function: &str, args: &Value) -> StoreResult<Value> {
        let request = self.build_rpc(function, args)?;
        self.send(request, function).await
    }
}

#[async_trait]
impl LedgerBackend for PostgrestBackend {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn ledger_entries(&self, query: &LedgerQuery) -> CoreResult<Vec<LedgerEntry>> {
        self.select(LEDGER_VIEW, &ledger_params(query)).await
    }

    async fn balance_entries(&self, kind: Option<ActorKind>) -> CoreResult<Vec<LedgerEntry>> {
        self.select(LEDGER_VIEW, &balance_params(kind)).await
    }

    async fn actor_names(&self, ids: &[(ActorKind, String)]) -> CoreResult<Vec<ActorName>> {
        let mut names = Vec::new();
        for (kind, table, column) in [
            (ActorKind::Restaurant, RESTAURANTS_TABLE, "nome_fantasia"),
            (ActorKind::Courier, COURIERS_TABLE, "nome"),
        ] {
            let wanted: Vec<&str> = ids
                .iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, id)| id.as_str())
                .collect();
            if wanted.is_empty() {
                continue;
            }

            let params = QueryParams::new()
                .select(&format!("id,{}", column))
                .in_list("id", wanted.as_slice());
            let rows: Vec<Value> = self.select(table, &params).await?;
            names.extend(rows.iter().filter_map(|row| {
                Some(ActorName {
                    id: wire::id_text(row.get("id")?)?,
                    kind,
                    name: row.get(column)?.as_str()?.to_string(),
                })
            }));
        }
        Ok(names)
    }

    async fn pending_payouts(&self, kind: Option<ActorKind>) -> CoreResult<Vec<PendingPayout>> {
        self.select(PAYOUT_VIEW, &pending_params(kind)).await
    }

    async fn process_payout(&self, request: &ProcessPayout) -> CoreResult<PayoutReceipt> {
        let args = json!({
            "p_id_entregador": request.courier_id,
            "p_valor": request.amount,
            "p_chave_pix": request.pix_key,
            "p_admin_id": Value::Null,
            "p_observacao": request.note,
        });
        let body = self.rpc(PROCESS_PAYOUT_FN, &args).await?;
        let outcome = ProcedureOutcome::from_response(PROCESS_PAYOUT_FN, body)?
            .into_result("Payout was not processed")?;

        let movement_id = outcome
            .id_movimentacao
            .as_ref()
            .and_then(wire::id_text)
            .ok_or_else(|| CoreError::backend(format!("{} returned no id_movimentacao", PROCESS_PAYOUT_FN)))?;

        Ok(PayoutReceipt {
            movement_id,
            message: outcome.mensagem,
            balance_before: outcome.saldo_anterior,
            balance_after: outcome.saldo_posterior,
        })
    }

    async fn confirm_payout(&self, request: &ConfirmPayout) -> CoreResult<Option<String>> {
        let args = json!({
            "p_id_movimentacao": request.movement_id,
            "p_comprovante_url": request.receipt_url,
            "p_admin_id": Value::Null,
        });
        let body = self.rpc(CONFIRM_PAYOUT_FN, &args).await?;
        let outcome = ProcedureOutcome::from_response(CONFIRM_PAYOUT_FN, body)?
            .into_result("Payout was not confirmed")?;
        Ok(outcome.mensagem)
    }

    async fn confirm_transfer(&self, request: &TransferRequest) -> CoreResult<()> {
        // the procedure reports business refusals as errors
        match self.rpc(MANUAL_TRANSFER_FN, &transfer_args(request)).await {
            Ok(_) => Ok(()),
            Err(StoreError::Status { message, .. }) => Err(CoreError::Rejected { message }),
            Err(e) => Err(e.into()),
        }
    }

    async fn closures(&self, query: &ClosureQuery) -> CoreResult<Vec<Closure>> {
        self.select(CLOSURES_TABLE, &closure_params(query)).await
    }

    async fn approve_closure(&self, request: &ApproveClosure) -> CoreResult<Closure> {
        let params = QueryParams::new()
            .select("*")
            .eq("id", &request.closure_id)
            .limit(1);
        let mut target: Closure = self
            .select_one::<Closure>(CLOSURES_TABLE, &params)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("Closure {}", request.closure_id),
            })?;
        closure::ensure_approvable(&target)?;

        let wallet_params = QueryParams::new()
            .select("id")
            .eq("id_usuario", &target.actor_id)
            .eq("tipo_usuario", target.actor_kind)
            .limit(1);
        let wallets: Vec<Value> = self.select(WALLETS_TABLE, &wallet_params).await?;
        let wallet_id = wallets
            .first()
            .and_then(|w| w.get("id"))
            .and_then(wire::id_text)
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("Wallet for {} {}", target.actor_kind, target.actor_id),
            })?;

        let exit = closure::approve(&mut target, request.notes.clone())?;

        // only a row still pending is updated, so a concurrent approval loses here
        let guard = QueryParams::new()
            .eq("id", &target.id)
            .eq("status", ClosureStatus::Pending);
        let update = json!({ "status": target.status, "observacoes": target.notes });
        let request_update = self
            .build_update(CLOSURES_TABLE, &guard, &update)
            .map_err(StoreError::from)?;
        let updated: Vec<Value> = decode_rows(CLOSURES_TABLE, self.send(request_update, CLOSURES_TABLE).await?)?;
        if updated.is_empty() {
            return Err(CoreError::AlreadyProcessed {
                resource: format!("Closure {}", target.id),
            });
        }

        let movement = json!({
            "id_carteira": wallet_id,
            "tipo": exit.direction,
            "origem": exit.origin,
            "referencia_id": exit.reference_id,
            "descricao": exit.description,
            "valor": exit.amount,
            "status": exit.status,
        });
        let insert = self
            .build_insert(MOVEMENTS_TABLE, &movement)
            .map_err(StoreError::from)?;
        if let Err(e) = self.send(insert, MOVEMENTS_TABLE).await {
            log::error!(
                "Closure {} approved but its exit entry was not recorded: {}",
                target.id,
                e
            );
            return Err(e.into());
        }

        Ok(target)
    }

    async fn daily_revenue(&self, days: usize) -> CoreResult<Vec<RevenueDay>> {
        let params = QueryParams::new().select("*").order("data", false).limit(days);
        self.select(REVENUE_VIEW, &params).await
    }

    async fn top_restaurants(&self, limit: usize) -> CoreResult<Vec<TopRestaurant>> {
        let params = QueryParams::new()
            .select("nome_fantasia,total_taxa_plataforma,qtd_pedidos,qtd_itens_total")
            .order("total_taxa_plataforma", false)
            .limit(limit);
        self.select(RESTAURANT_SUMMARY_VIEW, &params).await
    }
}

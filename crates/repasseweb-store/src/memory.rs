//! In-process ledger backend
//!
//! Holds actors, entries, closures and revenue rows behind one lock and
//! reproduces what the database procedures do, so the dashboard can run
//! locally and in tests without a database.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

use repasseweb_core::balance::{balance_effect, balance_of};
use repasseweb_core::closure;
use repasseweb_core::models::{VALIDATION_MISSING_PIX, VALIDATION_NEGATIVE_BALANCE, VALIDATION_OK};
use repasseweb_core::{
    ActorKind, ActorName, ApproveClosure, Closure, ClosureQuery, ConfirmPayout, CoreError,
    CoreResult, Direction, EntryStatus, LedgerBackend, LedgerEntry, LedgerQuery, NewLedgerEntry,
    PayoutReceipt, PendingPayout, ProcessPayout, RevenueDay, TopRestaurant, TransferRequest,
};
use repasseweb_utils::{format_brl, mask_pix_key};

use crate::error::{StoreError, StoreResult};

/// Origin recorded on payout exits
pub const PAYOUT_ORIGIN: &str = "pagamento_entregador";
/// Origin recorded on manual transfer exits
pub const TRANSFER_ORIGIN: &str = "repasse_manual";
/// Payment frequency used when an actor has none configured
pub const DEFAULT_FREQUENCY_DAYS: i64 = 7;

/// Demo data embedded in the binary
pub const DEMO_SEED: &str = include_str!("../templates/demo_seed.yaml");

/// Courier or restaurant known to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: String,
    #[serde(rename = "tipo_usuario")]
    pub kind: ActorKind,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "chave_pix", default)]
    pub pix_key: Option<String>,
    /// Days between scheduled payments
    #[serde(rename = "frequencia_pagamento", default)]
    pub payment_frequency_days: Option<i64>,
}

impl ActorRecord {
    fn registered_pix_key(&self) -> Option<&str> {
        self.pix_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    fn frequency_days(&self) -> i64 {
        self.payment_frequency_days
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_FREQUENCY_DAYS)
    }
}

/// Initial contents of a memory backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub actors: Vec<ActorRecord>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub closures: Vec<Closure>,
    #[serde(default)]
    pub revenue: Vec<RevenueDay>,
    #[serde(default)]
    pub top_restaurants: Vec<TopRestaurant>,
}

impl Seed {
    /// Parse seed YAML; `origin` names the source in errors
    pub fn from_yaml(content: &str, origin: &str) -> StoreResult<Self> {
        serde_yaml::from_str(content).map_err(|e| StoreError::SeedParse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Read and parse a seed file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::SeedIo {
            path: display.clone(),
            source: e,
        })?;
        Self::from_yaml(&content, &display)
    }

    /// The embedded demo data
    pub fn demo() -> StoreResult<Self> {
        Self::from_yaml(DEMO_SEED, "demo_seed.yaml")
    }
}

fn describe_frequency(days: i64) -> String {
    match days {
        1 => "Diário".to_string(),
        7 => "Semanal".to_string(),
        14 => "Quinzenal".to_string(),
        30 => "Mensal".to_string(),
        n => format!("A cada {} dias", n),
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    actors: Vec<ActorRecord>,
    entries: Vec<LedgerEntry>,
    closures: Vec<Closure>,
    revenue: Vec<RevenueDay>,
    top_restaurants: Vec<TopRestaurant>,
    /// Receipt URLs by movement id
    receipts: HashMap<String, String>,
}

impl MemoryState {
    fn actor(&self, kind: ActorKind, id: &str) -> Option<&ActorRecord> {
        self.actors.iter().find(|a| a.kind == kind && a.id == id)
    }

    fn entries_of<'a>(&'a self, kind: ActorKind, id: &'a str) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.actor_kind == kind && e.actor_id == id)
    }

    fn balance(&self, kind: ActorKind, id: &str) -> Decimal {
        balance_of(self.entries_of(kind, id))
    }

    fn append(&mut self, entry: NewLedgerEntry, now: DateTime<Utc>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries.push(entry.into_entry(id.clone(), now));
        id
    }

    fn pending_payout(&self, actor: &ActorRecord, now: DateTime<Utc>) -> Option<PendingPayout> {
        let entries: Vec<&LedgerEntry> = self.entries_of(actor.kind, &actor.id).collect();
        let balance = balance_of(entries.iter().copied());
        if balance.is_zero() {
            return None;
        }

        let today = now.date_naive();
        let frequency = actor.frequency_days();
        let next_payment = entries
            .iter()
            .filter(|e| e.is_paid_exit())
            .map(|e| e.created_at.date_naive())
            .max()
            .map(|last| last + Duration::days(frequency))
            .unwrap_or(today);

        let validation = if actor.registered_pix_key().is_none() {
            VALIDATION_MISSING_PIX
        } else if balance < Decimal::ZERO {
            VALIDATION_NEGATIVE_BALANCE
        } else {
            VALIDATION_OK
        };

        let counted = entries
            .iter()
            .filter(|e| !balance_effect(e.direction, e.status, e.amount).is_zero())
            .count();

        Some(PendingPayout {
            id: actor.id.clone(),
            name: Some(actor.name.clone()),
            actor_kind: actor.kind,
            pix_key: actor.pix_key.clone(),
            available_balance: balance,
            payment_frequency_days: Some(frequency),
            frequency_description: Some(describe_frequency(frequency)),
            next_payment_date: Some(next_payment),
            due_today: next_payment <= today,
            validation_status: Some(validation.to_string()),
            transaction_count: counted as i64,
            wallet_id: None,
        })
    }
}

/// Ledger backend held in process memory
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
    fixed_now: Option<DateTime<Utc>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::from_seed(Seed::default())
    }
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding the seed data
    pub fn from_seed(seed: Seed) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                actors: seed.actors,
                entries: seed.entries,
                closures: seed.closures,
                revenue: seed.revenue,
                top_restaurants: seed.top_restaurants,
                receipts: HashMap::new(),
            }),
            fixed_now: None,
        }
    }

    /// Create a backend from a seed file
    pub fn from_seed_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        let seed = Seed::load(path.as_ref())?;
        log::info!(
            "Loaded seed {}: {} actors, {} entries, {} closures",
            path.as_ref().display(),
            seed.actors.len(),
            seed.entries.len(),
            seed.closures.len()
        );
        Ok(Self::from_seed(seed))
    }

    /// Freeze the clock, for reproducible due dates
    pub fn with_fixed_time(mut self, now: DateTime<Utc>) -> Self {
        self.fixed_now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    /// Snapshot of every entry, in insertion order
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.entries.clone()
    }

    /// Receipt URL stored for a movement
    pub async fn receipt_for(&self, movement_id: &str) -> Option<String> {
        self.state.read().await.receipts.get(movement_id).cloned()
    }
}

#[async_trait]
impl LedgerBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ledger_entries(&self, query: &LedgerQuery) -> CoreResult<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(query.limit);
        Ok(entries)
    }

    async fn balance_entries(&self, kind: Option<ActorKind>) -> CoreResult<Vec<LedgerEntry>> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| kind.map_or(true, |k| e.actor_kind == k))
            .cloned()
            .collect())
    }

    async fn actor_names(&self, ids: &[(ActorKind, String)]) -> CoreResult<Vec<ActorName>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|(kind, id)| state.actor(*kind, id))
            .map(|actor| ActorName {
                id: actor.id.clone(),
                kind: actor.kind,
                name: actor.name.clone(),
            })
            .collect())
    }

    async fn pending_payouts(&self, kind: Option<ActorKind>) -> CoreResult<Vec<PendingPayout>> {
        let now = self.now();
        let state = self.state.read().await;
        let mut rows: Vec<PendingPayout> = state
            .actors
            .iter()
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .filter_map(|a| state.pending_payout(a, now))
            .collect();

        rows.sort_by(|a, b| {
            a.actor_kind
                .cmp(&b.actor_kind)
                .then_with(|| b.due_today.cmp(&a.due_today))
                .then_with(|| b.available_balance.cmp(&a.available_balance))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    async fn process_payout(&self, request: &ProcessPayout) -> CoreResult<PayoutReceipt> {
        let now = self.now();
        let mut state = self.state.write().await;

        let courier = state
            .actor(ActorKind::Courier, &request.courier_id)
            .cloned()
            .ok_or_else(|| CoreError::Rejected {
                message: format!("Courier {} not found", request.courier_id),
            })?;
        if courier.registered_pix_key().is_none() {
            return Err(CoreError::Rejected {
                message: format!("Courier {} has no PIX key registered", courier.id),
            });
        }
        if state
            .entries_of(ActorKind::Courier, &courier.id)
            .any(|e| e.is_unconfirmed_payout())
        {
            return Err(CoreError::AlreadyProcessed {
                resource: format!("Payout for courier {}", courier.id),
            });
        }

        let balance_before = state.balance(ActorKind::Courier, &courier.id);
        if request.amount > balance_before {
            return Err(CoreError::Rejected {
                message: format!(
                    "Insufficient balance: available {}, requested {}",
                    format_brl(balance_before),
                    format_brl(request.amount)
                ),
            });
        }

        let description = request
            .note
            .clone()
            .unwrap_or_else(|| format!("Pagamento PIX {}", mask_pix_key(&request.pix_key)));
        let movement_id = state.append(
            NewLedgerEntry {
                actor_id: courier.id.clone(),
                actor_kind: ActorKind::Courier,
                direction: Direction::Debit,
                status: EntryStatus::Pending,
                amount: request.amount,
                description: Some(description),
                origin: Some(PAYOUT_ORIGIN.to_string()),
                reference_id: None,
            },
            now,
        );

        Ok(PayoutReceipt {
            movement_id,
            message: Some("Payout processed".to_string()),
            balance_before,
            balance_after: balance_before - request.amount,
        })
    }

    async fn confirm_payout(&self, request: &ConfirmPayout) -> CoreResult<Option<String>> {
        let mut state = self.state.write().await;

        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.id == request.movement_id)
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("Movement {}", request.movement_id),
            })?;
        if !entry.is_unconfirmed_payout() {
            return Err(CoreError::Rejected {
                message: format!("Movement {} is not a pending payout", request.movement_id),
            });
        }
        entry.status = EntryStatus::Paid;

        if let Some(url) = &request.receipt_url {
            state.receipts.insert(request.movement_id.clone(), url.clone());
        }
        Ok(Some("Payout confirmed".to_string()))
    }

    async fn confirm_transfer(&self, request: &TransferRequest) -> CoreResult<()> {
        let now = self.now();
        let mut state = self.state.write().await;

        let kind = request.actor_kind();
        if state.actor(kind, request.actor_id()).is_none() {
            return Err(CoreError::Rejected {
                message: format!("Unknown {} {}", kind, request.actor_id()),
            });
        }

        let movement_id = state.append(
            NewLedgerEntry {
                actor_id: request.actor_id().to_string(),
                actor_kind: kind,
                direction: Direction::Debit,
                status: EntryStatus::Paid,
                amount: request.amount(),
                description: Some(request.note().unwrap_or("Repasse manual").to_string()),
                origin: Some(TRANSFER_ORIGIN.to_string()),
                reference_id: None,
            },
            now,
        );

        if let TransferRequest::Restaurant(transfer) = request {
            if let Some(url) = &transfer.receipt_url {
                state.receipts.insert(movement_id, url.clone());
            }
        }
        Ok(())
    }

    async fn closures(&self, query: &ClosureQuery) -> CoreResult<Vec<Closure>> {
        let state = self.state.read().await;
        let mut closures: Vec<Closure> = state
            .closures
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect();
        closures.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(closures)
    }

    async fn approve_closure(&self, request: &ApproveClosure) -> CoreResult<Closure> {
        let now = self.now();
        let mut state = self.state.write().await;

        let target = state
            .closures
            .iter_mut()
            .find(|c| c.id == request.closure_id)
            .ok_or_else(|| CoreError::NotFound {
                resource: format!("Closure {}", request.closure_id),
            })?;
        let exit = closure::approve(target, request.notes.clone())?;
        let approved = target.clone();

        state.append(exit, now);
        Ok(approved)
    }

    async fn daily_revenue(&self, days: usize) -> CoreResult<Vec<RevenueDay>> {
        let state = self.state.read().await;
        let mut revenue = state.revenue.clone();
        revenue.sort_by(|a, b| b.date.cmp(&a.date));
        revenue.truncate(days);
        Ok(revenue)
    }

    async fn top_restaurants(&self, limit: usize) -> CoreResult<Vec<TopRestaurant>> {
        let state = self.state.read().await;
        let mut top = state.top_restaurants.clone();
        top.sort_by(|a, b| b.platform_fee_total.cmp(&a.platform_fee_total));
        top.truncate(limit);
        Ok(top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use repasseweb_core::ClosureStatus;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn demo() -> MemoryBackend {
        MemoryBackend::from_seed(Seed::demo().unwrap())
            .with_fixed_time(Utc.with_ymd_and_hms(2024, 6, 8, 15, 0, 0).unwrap())
    }

    fn payout(courier: &str, amount: Decimal) -> ProcessPayout {
        ProcessPayout {
            courier_id: courier.to_string(),
            amount,
            pix_key: "ana.souza@pix.example".to_string(),
            note: None,
        }
    }

    async fn balance(backend: &MemoryBackend, kind: ActorKind, id: &str) -> Decimal {
        backend.state.read().await.balance(kind, id)
    }

    #[test]
    fn test_demo_seed_parses() {
        let seed = Seed::demo().unwrap();
        assert_eq!(seed.actors.len(), 5);
        assert_eq!(seed.entries.len(), 9);
        assert_eq!(seed.closures[0].net_total, dec!(870));
    }

    #[test]
    fn test_seed_parse_error_names_source() {
        let error = Seed::from_yaml("actors: 3", "broken.yaml").unwrap_err();
        assert!(error.to_string().contains("broken.yaml"));
    }

    #[tokio::test]
    async fn test_process_then_confirm() {
        let backend = demo();
        assert_eq!(balance(&backend, ActorKind::Courier, "ent-001").await, dec!(60));

        let receipt = backend.process_payout(&payout("ent-001", dec!(45))).await.unwrap();
        assert_eq!(receipt.balance_before, dec!(60));
        assert_eq!(receipt.balance_after, dec!(15));
        // a pending exit does not move the balance yet
        assert_eq!(balance(&backend, ActorKind::Courier, "ent-001").await, dec!(60));

        let confirm = ConfirmPayout {
            movement_id: receipt.movement_id.clone(),
            receipt_url: Some("https://receipts.example/1.pdf".to_string()),
        };
        backend.confirm_payout(&confirm).await.unwrap();
        assert_eq!(balance(&backend, ActorKind::Courier, "ent-001").await, dec!(15));
        assert_eq!(
            backend.receipt_for(&receipt.movement_id).await.as_deref(),
            Some("https://receipts.example/1.pdf")
        );

        let again = backend.confirm_payout(&confirm).await;
        assert!(matches!(again, Err(CoreError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_process_rejections() {
        let backend = demo();

        let unknown = backend.process_payout(&payout("ent-999", dec!(1))).await;
        assert!(matches!(unknown, Err(CoreError::Rejected { .. })));

        let no_pix = backend.process_payout(&payout("ent-003", dec!(1))).await;
        assert!(matches!(no_pix, Err(CoreError::Rejected { .. })));

        let too_much = backend.process_payout(&payout("ent-001", dec!(60.01))).await;
        assert!(matches!(too_much, Err(CoreError::Rejected { .. })));

        let restaurant = backend.process_payout(&payout("rest-001", dec!(1))).await;
        assert!(matches!(restaurant, Err(CoreError::Rejected { .. })));

        assert_eq!(backend.entries().await.len(), 9);
    }

    #[tokio::test]
    async fn test_second_process_is_already_processed() {
        let backend = demo();
        backend.process_payout(&payout("ent-001", dec!(10))).await.unwrap();
        let second = backend.process_payout(&payout("ent-001", dec!(10))).await;
        assert!(matches!(second, Err(CoreError::AlreadyProcessed { .. })));
    }

    #[tokio::test]
    async fn test_confirm_unknown_movement() {
        let backend = demo();
        let result = backend
            .confirm_payout(&ConfirmPayout { movement_id: "nope".to_string(), receipt_url: None })
            .await;
        assert!(matches!(result, Err(CoreError::NotFound { .. })));

        let credit = backend
            .confirm_payout(&ConfirmPayout { movement_id: "mov-0001".to_string(), receipt_url: None })
            .await;
        assert!(matches!(credit, Err(CoreError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_manual_transfer_appends_paid_exit() {
        let backend = demo();
        let request = TransferRequest::from_json(serde_json::json!({
            "restauranteId": "rest-001",
            "valor": 500,
            "comprovanteUrl": "https://receipts.example/r.pdf"
        }))
        .unwrap();
        backend.confirm_transfer(&request).await.unwrap();
        assert_eq!(balance(&backend, ActorKind::Restaurant, "rest-001").await, dec!(370));

        let unknown = TransferRequest::from_json(serde_json::json!({
            "variant": "usuario",
            "id_usuario": "rest-404",
            "tipo_usuario": "restaurante",
            "valor": 5
        }))
        .unwrap();
        assert!(backend.confirm_transfer(&unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_approve_closure_appends_one_exit() {
        let backend = demo();
        let request = ApproveClosure { closure_id: "fech-001".to_string(), notes: None };

        let approved = backend.approve_closure(&request).await.unwrap();
        assert_eq!(approved.status, ClosureStatus::Approved);

        let entries = backend.entries().await;
        assert_eq!(entries.len(), 10);
        let exit = entries.last().unwrap();
        assert_eq!(exit.amount, dec!(870));
        assert_eq!(exit.direction, Direction::Debit);
        assert_eq!(exit.status, EntryStatus::Confirmed);
        assert_eq!(exit.reference_id.as_deref(), Some("fech-001"));
        assert_eq!(exit.description.as_deref(), Some("Fechamento de caixa - 15/06/2024"));

        let again = backend.approve_closure(&request).await;
        assert!(matches!(again, Err(CoreError::AlreadyProcessed { .. })));
        assert_eq!(backend.entries().await.len(), 10);
    }

    #[tokio::test]
    async fn test_approve_missing_or_processed_closure() {
        let backend = demo();
        let missing = backend
            .approve_closure(&ApproveClosure { closure_id: "fech-999".to_string(), notes: None })
            .await;
        assert!(matches!(missing, Err(CoreError::NotFound { .. })));

        let processed = backend
            .approve_closure(&ApproveClosure { closure_id: "fech-002".to_string(), notes: None })
            .await;
        assert!(matches!(processed, Err(CoreError::AlreadyProcessed { .. })));
        assert_eq!(backend.entries().await.len(), 9);
    }

    #[tokio::test]
    async fn test_concurrent_approvals_append_once() {
        let backend = Arc::new(demo());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .approve_closure(&ApproveClosure { closure_id: "fech-001".to_string(), notes: None })
                    .await
                    .is_ok()
            }));
        }

        let mut approved = 0;
        for handle in handles {
            if handle.await.unwrap() {
                approved += 1;
            }
        }
        assert_eq!(approved, 1);
        assert_eq!(backend.entries().await.len(), 10);
    }

    #[tokio::test]
    async fn test_pending_payout_view() {
        let backend = demo();
        let rows = backend.pending_payouts(None).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        // couriers first, due today first, then balance descending; rest-002 nets to zero
        assert_eq!(ids, vec!["ent-002", "ent-003", "ent-001", "rest-001"]);

        let ana = &rows[2];
        assert_eq!(ana.available_balance, dec!(60));
        assert_eq!(ana.next_payment_date, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert!(!ana.due_today);
        assert!(ana.is_valid());
        assert_eq!(ana.frequency_description.as_deref(), Some("Semanal"));

        let carla = &rows[1];
        assert!(carla.due_today);
        assert_eq!(carla.validation_status.as_deref(), Some(VALIDATION_MISSING_PIX));

        let restaurants = backend.pending_payouts(Some(ActorKind::Restaurant)).await.unwrap();
        assert_eq!(restaurants.len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_entries_newest_first_limited() {
        let backend = demo();
        let mut query = LedgerQuery::latest(3);
        let entries = backend.ledger_entries(&query).await.unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["mov-0009", "mov-0008", "mov-0005"]);

        query.actor_kind = Some(ActorKind::Courier);
        query.status = Some(EntryStatus::Pending);
        let entries = backend.ledger_entries(&query).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "mov-0002");
    }

    #[tokio::test]
    async fn test_revenue_rows_sorted() {
        let backend = demo();
        let days = backend.daily_revenue(2).await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());

        let top = backend.top_restaurants(1).await.unwrap();
        assert_eq!(top[0].name.as_deref(), Some("Pizzaria Bella Napoli"));
    }
}

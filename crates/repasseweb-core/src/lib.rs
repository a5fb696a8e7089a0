//! Payout, balance and closure logic for the admin dashboard
//!
//! [`Dashboard`] is the service every HTTP handler goes through. It validates
//! requests, calls the [`LedgerBackend`] and shapes results into reports.

pub mod backend;
pub mod balance;
pub mod closure;
pub mod error;
pub mod models;
pub mod payout;
pub mod query;
pub mod reports;
pub mod time;
pub mod types;
pub mod wire;

use chrono::NaiveDate;
use repasseweb_config::QueryConfig;
use repasseweb_utils::{format_brl, mask_pix_key};

pub use backend::{BackendRef, LedgerBackend};
pub use closure::{ApproveClosure, ApproveClosureDraft};
pub use error::{log_failure, CoreError, CoreResult, ErrorCode, ErrorDetails, ErrorSeverity};
pub use models::{
    ActorBalance, ActorName, Closure, HistoryEntry, LedgerEntry, NewLedgerEntry, PayoutReceipt,
    PendingPayout, RevenueDay, TopRestaurant,
};
pub use payout::{
    ActorTransfer, ConfirmDraft, ConfirmPayout, PayoutDraft, ProcessPayout, RestaurantTransfer,
    SettleDraft, TransferRequest,
};
pub use query::{BalanceQuery, ClosureQuery, ClosureQueryParams, LedgerQuery, LedgerQueryParams, NameIndex};
pub use reports::{PendingPayoutReport, RevenueReport, RevenueSummary};
pub use types::{ActorKind, ClosureStatus, Direction, EntryStatus};

/// Dashboard service over a ledger backend
#[derive(Clone)]
pub struct Dashboard {
    backend: BackendRef,
    limits: QueryConfig,
}

impl Dashboard {
    /// Create a dashboard over a backend
    pub fn new(backend: BackendRef, limits: QueryConfig) -> Self {
        Self { backend, limits }
    }

    /// Name of the backend in use
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn names_for(&self, ids: Vec<(ActorKind, String)>) -> CoreResult<NameIndex> {
        if ids.is_empty() {
            return Ok(NameIndex::default());
        }
        Ok(NameIndex::new(self.backend.actor_names(&ids).await?))
    }

    // ==================== Payouts ====================

    /// Pending payouts grouped for the payout screen
    pub async fn pending_payouts(&self, kind: Option<ActorKind>) -> CoreResult<PendingPayoutReport> {
        let rows = self.backend.pending_payouts(kind).await?;
        let report = PendingPayoutReport::build(rows);
        log::info!(
            "Pending payouts: {} total, {} due today, {} alerts",
            report.resumo.total,
            report.resumo.total_hoje,
            report.resumo.total_alertas
        );
        Ok(report)
    }

    /// Create a pending payout exit for a courier
    pub async fn process_payout(&self, draft: PayoutDraft) -> CoreResult<PayoutReceipt> {
        let request = draft.validate()?;
        let receipt = self.backend.process_payout(&request).await?;
        log::info!(
            "Payout {} processed for courier {}: {} to {} (balance {} -> {})",
            receipt.movement_id,
            request.courier_id,
            format_brl(request.amount),
            mask_pix_key(&request.pix_key),
            format_brl(receipt.balance_before),
            format_brl(receipt.balance_after)
        );
        Ok(receipt)
    }

    /// Mark a processed payout as paid
    pub async fn confirm_payout(&self, draft: ConfirmDraft) -> CoreResult<Option<String>> {
        let request = draft.validate()?;
        let message = self.backend.confirm_payout(&request).await?;
        log::info!("Payout {} confirmed", request.movement_id);
        Ok(message)
    }

    /// Process a payout and confirm it straight away
    ///
    /// A confirmation failure leaves the processed exit in place and is
    /// reported with its movement id so it can be confirmed by hand.
    pub async fn settle_payout(&self, draft: SettleDraft) -> CoreResult<PayoutReceipt> {
        let (request, receipt_url) = draft.validate()?;
        let receipt = self.backend.process_payout(&request).await?;

        let confirm = ConfirmPayout {
            movement_id: receipt.movement_id.clone(),
            receipt_url,
        };
        if let Err(e) = self.backend.confirm_payout(&confirm).await {
            log::warn!(
                "Payout {} was processed but confirmation failed: {}",
                receipt.movement_id,
                e
            );
            return Err(CoreError::UnconfirmedPayout {
                movement_id: receipt.movement_id,
                reason: e.to_string(),
            });
        }

        log::info!(
            "Payout {} settled for courier {}: {}",
            receipt.movement_id,
            request.courier_id,
            format_brl(request.amount)
        );
        Ok(receipt)
    }

    /// Record a manual transfer from a tagged or legacy body
    pub async fn confirm_transfer(&self, body: serde_json::Value) -> CoreResult<TransferRequest> {
        let request = TransferRequest::from_json(body)?;
        self.backend.confirm_transfer(&request).await?;
        log::info!(
            "Manual transfer of {} recorded for {} {}",
            format_brl(request.amount()),
            request.actor_kind(),
            request.actor_id()
        );
        Ok(request)
    }

    // ==================== Closures ====================

    /// Closures with actor names joined
    pub async fn closures(&self, params: ClosureQueryParams) -> CoreResult<Vec<Closure>> {
        let query = params.into_query()?;
        let mut closures = self.backend.closures(&query).await?;

        let names = self
            .names_for(query::actor_ids(
                closures.iter().map(|c| (c.actor_kind, c.actor_id.as_str())),
            ))
            .await?;
        for closure in closures.iter_mut() {
            closure.actor_name = Some(names.name_for(closure.actor_kind, &closure.actor_id));
        }
        Ok(closures)
    }

    /// Approve a pending closure
    pub async fn approve_closure(&self, draft: ApproveClosureDraft) -> CoreResult<Closure> {
        let request = draft.validate()?;
        let closure = self.backend.approve_closure(&request).await?;
        log::info!(
            "Closure {} approved for {} {}: {}",
            closure.id,
            closure.actor_kind,
            closure.actor_id,
            format_brl(closure.net_total)
        );
        Ok(closure)
    }

    // ==================== Reads ====================

    /// Ledger history with names joined and the name search applied
    pub async fn ledger_history(&self, params: LedgerQueryParams) -> CoreResult<Vec<HistoryEntry>> {
        let query = params.into_query(self.limits.history_limit)?;
        let entries = self.backend.ledger_entries(&query).await?;
        let names = self
            .names_for(query::actor_ids(
                entries.iter().map(|e| (e.actor_kind, e.actor_id.as_str())),
            ))
            .await?;
        Ok(query.join_names(entries, &names))
    }

    /// Non-zero balances, highest first, optionally narrowed by name
    pub async fn actor_balances(&self, params: BalanceQuery) -> CoreResult<Vec<ActorBalance>> {
        let entries = self.backend.balance_entries(params.actor_kind()).await?;
        let mut active = balance::active_balances(&entries);

        let names = self
            .names_for(query::actor_ids(
                active.iter().map(|b| (b.actor_kind, b.actor_id.as_str())),
            ))
            .await?;
        for summary in active.iter_mut() {
            summary.name = Some(names.name_for(summary.actor_kind, &summary.actor_id));
        }

        active.retain(|b| query::matches_search(b.name.as_deref().unwrap_or_default(), params.busca.as_deref()));
        Ok(active)
    }

    /// Revenue over the configured window, relative to `today`
    pub async fn platform_revenue(&self, today: NaiveDate) -> CoreResult<RevenueReport> {
        let days = self.backend.daily_revenue(self.limits.revenue_days).await?;
        let top = self.backend.top_restaurants(self.limits.top_restaurants).await?;
        let report = RevenueReport::build(days, top, today);
        log::info!(
            "Platform revenue: {} over {} days, {} orders",
            format_brl(report.resumo.receita_total),
            report.receita_diaria.len(),
            report.resumo.qtd_pedidos_total
        );
        Ok(report)
    }
}

// ==================== Tests ====================

//! Storage seam for ledger data and the stored procedures that mutate it

use async_trait::async_trait;
use std::sync::Arc;

use crate::closure::ApproveClosure;
use crate::error::CoreResult;
use crate::models::{
    ActorName, Closure, LedgerEntry, PayoutReceipt, PendingPayout, RevenueDay, TopRestaurant,
};
use crate::payout::{ConfirmPayout, ProcessPayout, TransferRequest};
use crate::query::{ClosureQuery, LedgerQuery};
use crate::types::ActorKind;

/// Backend holding the ledger
///
/// Mutating calls map one-to-one onto stored procedures, and every
/// implementation must make each of them atomic on its own.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Entries matching the row-level filters, newest first, at most `query.limit`
    async fn ledger_entries(&self, query: &LedgerQuery) -> CoreResult<Vec<LedgerEntry>>;

    /// Every entry that may affect a balance, optionally for one actor kind
    async fn balance_entries(&self, kind: Option<ActorKind>) -> CoreResult<Vec<LedgerEntry>>;

    /// Display names for the given actors; unknown actors are simply absent
    async fn actor_names(&self, ids: &[(ActorKind, String)]) -> CoreResult<Vec<ActorName>>;

    /// Unified payout view, ordered by kind, due today first, then balance descending
    async fn pending_payouts(&self, kind: Option<ActorKind>) -> CoreResult<Vec<PendingPayout>>;

    /// Create a pending payout exit for a courier
    async fn process_payout(&self, request: &ProcessPayout) -> CoreResult<PayoutReceipt>;

    /// Mark a pending payout exit as paid, returning the procedure's message
    async fn confirm_payout(&self, request: &ConfirmPayout) -> CoreResult<Option<String>>;

    /// Record a manual transfer already made out of band
    async fn confirm_transfer(&self, request: &TransferRequest) -> CoreResult<()>;

    /// Closures matching the filter, newest first
    async fn closures(&self, query: &ClosureQuery) -> CoreResult<Vec<Closure>>;

    /// Approve a pending closure and append its exit entry
    async fn approve_closure(&self, request: &ApproveClosure) -> CoreResult<Closure>;

    /// Most recent daily revenue rows, newest first
    async fn daily_revenue(&self, days: usize) -> CoreResult<Vec<RevenueDay>>;

    /// Restaurants ranked by platform fee, highest first
    async fn top_restaurants(&self, limit: usize) -> CoreResult<Vec<TopRestaurant>>;
}

/// Backend reference type
pub type BackendRef = Arc<dyn LedgerBackend>;

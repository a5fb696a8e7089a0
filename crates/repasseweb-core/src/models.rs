//! Core data models for ledger entries, closures and payout rows

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{ActorKind, ClosureStatus, Direction, EntryStatus};
use super::wire;

/// One row of the unified wallet movement view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Movement identifier
    #[serde(rename = "id_movimentacao", deserialize_with = "wire::id::deserialize")]
    pub id: String,
    /// Courier or restaurant id
    #[serde(rename = "id_usuario", deserialize_with = "wire::id::deserialize")]
    pub actor_id: String,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    #[serde(rename = "tipo")]
    pub direction: Direction,
    pub status: EntryStatus,
    #[serde(rename = "valor", deserialize_with = "wire::amount::deserialize")]
    pub amount: Decimal,
    #[serde(rename = "descricao", default)]
    pub description: Option<String>,
    #[serde(rename = "criado_em", deserialize_with = "wire::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    /// Workflow that produced the movement (e.g. `fechamento_caixa`)
    #[serde(rename = "origem", default)]
    pub origin: Option<String>,
    /// Id of the originating record
    #[serde(rename = "referencia_id", default)]
    pub reference_id: Option<String>,
    #[serde(rename = "tipo_pedido", default)]
    pub order_kind: Option<String>,
}

impl LedgerEntry {
    /// Exit entry created by the payout procedure and not yet confirmed
    pub fn is_unconfirmed_payout(&self) -> bool {
        self.direction == Direction::Debit && self.status == EntryStatus::Pending
    }

    /// Exit entry that already left the platform
    pub fn is_paid_exit(&self) -> bool {
        self.direction == Direction::Debit && self.status == EntryStatus::Paid
    }
}

/// Ledger entry to be appended by a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    #[serde(rename = "id_usuario")]
    pub actor_id: String,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    #[serde(rename = "tipo")]
    pub direction: Direction,
    pub status: EntryStatus,
    #[serde(rename = "valor")]
    pub amount: Decimal,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "origem")]
    pub origin: Option<String>,
    #[serde(rename = "referencia_id")]
    pub reference_id: Option<String>,
}

impl NewLedgerEntry {
    /// Materialise the entry with an id and creation time
    pub fn into_entry(self, id: String, created_at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            actor_id: self.actor_id,
            actor_kind: self.actor_kind,
            direction: self.direction,
            status: self.status,
            amount: self.amount,
            description: self.description,
            created_at,
            origin: self.origin,
            reference_id: self.reference_id,
            order_kind: None,
        }
    }
}

/// Ledger entry with the actor's display name joined in
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    #[serde(rename = "nome_usuario")]
    pub actor_name: String,
}

/// Display name of an actor, as read from the actor tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorName {
    pub id: String,
    #[serde(rename = "tipo_usuario")]
    pub kind: ActorKind,
    #[serde(rename = "nome")]
    pub name: String,
}

/// Cash-register closure batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    #[serde(deserialize_with = "wire::id::deserialize")]
    pub id: String,
    #[serde(rename = "id_usuario", deserialize_with = "wire::id::deserialize")]
    pub actor_id: String,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    /// Joined display name, `#<id>` when the actor row is missing
    #[serde(rename = "nome_usuario", default)]
    pub actor_name: Option<String>,
    #[serde(
        rename = "data_abertura",
        default,
        deserialize_with = "wire::timestamp_option::deserialize"
    )]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(rename = "data_fechamento", deserialize_with = "wire::timestamp::deserialize")]
    pub closed_at: DateTime<Utc>,
    #[serde(rename = "total_bruto", default, deserialize_with = "wire::amount::deserialize")]
    pub gross_total: Decimal,
    #[serde(rename = "total_descontos", default, deserialize_with = "wire::amount::deserialize")]
    pub deductions_total: Decimal,
    #[serde(rename = "total_liquido", deserialize_with = "wire::amount::deserialize")]
    pub net_total: Decimal,
    #[serde(rename = "qtd_transacoes", default, deserialize_with = "wire::count::deserialize")]
    pub transaction_count: i64,
    #[serde(default)]
    pub status: ClosureStatus,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
    #[serde(rename = "criado_em", deserialize_with = "wire::timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// Row of the unified pending-payout view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPayout {
    #[serde(deserialize_with = "wire::id::deserialize")]
    pub id: String,
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    #[serde(rename = "chave_pix", default)]
    pub pix_key: Option<String>,
    #[serde(rename = "saldo_disponivel", default, deserialize_with = "wire::amount::deserialize")]
    pub available_balance: Decimal,
    /// Days between scheduled payments
    #[serde(rename = "frequencia_pagamento", default)]
    pub payment_frequency_days: Option<i64>,
    #[serde(rename = "descricao_frequencia", default)]
    pub frequency_description: Option<String>,
    #[serde(
        rename = "proxima_data_pagamento",
        default,
        deserialize_with = "wire::date_option::deserialize"
    )]
    pub next_payment_date: Option<NaiveDate>,
    #[serde(rename = "deve_pagar_hoje", default)]
    pub due_today: bool,
    /// `OK` when payable, otherwise the reason it is not
    #[serde(rename = "status_validacao", default)]
    pub validation_status: Option<String>,
    #[serde(rename = "qtd_transacoes", default, deserialize_with = "wire::count::deserialize")]
    pub transaction_count: i64,
    #[serde(rename = "id_carteira", default)]
    pub wallet_id: Option<String>,
}

/// Validation status of a payable row
pub const VALIDATION_OK: &str = "OK";
/// Validation status when the actor has no PIX key
pub const VALIDATION_MISSING_PIX: &str = "SEM_CHAVE_PIX";
/// Validation status when the actor owes the platform
pub const VALIDATION_NEGATIVE_BALANCE: &str = "SALDO_NEGATIVO";

impl PendingPayout {
    /// True when the row passes the view's validation
    pub fn is_valid(&self) -> bool {
        self.validation_status.as_deref() == Some(VALIDATION_OK)
    }
}

/// Platform revenue for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDay {
    #[serde(rename = "data", deserialize_with = "wire::date::deserialize")]
    pub date: NaiveDate,
    #[serde(rename = "receita_dia", default, deserialize_with = "wire::amount::deserialize")]
    pub revenue: Decimal,
    #[serde(rename = "qtd_pedidos", default, deserialize_with = "wire::count::deserialize")]
    pub order_count: i64,
}

/// Restaurant ranked by platform fee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopRestaurant {
    #[serde(rename = "nome_fantasia", default)]
    pub name: Option<String>,
    #[serde(rename = "total_taxa_plataforma", default, deserialize_with = "wire::amount::deserialize")]
    pub platform_fee_total: Decimal,
    #[serde(rename = "qtd_pedidos", default, deserialize_with = "wire::count::deserialize")]
    pub order_count: i64,
    #[serde(rename = "qtd_itens_total", default, deserialize_with = "wire::count::deserialize")]
    pub item_count: i64,
}

/// Derived balance of one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorBalance {
    #[serde(rename = "id_usuario")]
    pub actor_id: String,
    #[serde(rename = "tipo_usuario")]
    pub actor_kind: ActorKind,
    #[serde(rename = "nome_usuario", default)]
    pub name: Option<String>,
    /// Counted credits minus paid exits
    #[serde(rename = "saldo_pendente")]
    pub balance: Decimal,
    #[serde(rename = "total_entradas")]
    pub total_credits: Decimal,
    #[serde(rename = "total_pago")]
    pub total_paid: Decimal,
}

/// Outcome of the payout procedure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutReceipt {
    #[serde(rename = "id_movimentacao", deserialize_with = "wire::id::deserialize")]
    pub movement_id: String,
    #[serde(rename = "mensagem", default)]
    pub message: Option<String>,
    #[serde(rename = "saldo_anterior", default, deserialize_with = "wire::amount::deserialize")]
    pub balance_before: Decimal,
    #[serde(rename = "saldo_posterior", default, deserialize_with = "wire::amount::deserialize")]
    pub balance_after: Decimal,
}

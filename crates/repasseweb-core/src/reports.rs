//! Report structures for API responses

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{PendingPayout, RevenueDay, TopRestaurant};
use crate::time::MonthKey;
use crate::types::ActorKind;

/// Totals of the pending-payout listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingSummary {
    pub total: usize,
    pub total_entregadores: usize,
    pub total_restaurantes: usize,
    pub total_hoje: usize,
    pub total_proximos: usize,
    pub total_alertas: usize,
    pub valor_total_hoje: Decimal,
    pub valor_total_geral: Decimal,
    pub valor_entregadores: Decimal,
    pub valor_restaurantes: Decimal,
}

/// Pending payouts grouped the way the payout screen shows them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PendingPayoutReport {
    pub todos: Vec<PendingPayout>,
    pub entregadores: Vec<PendingPayout>,
    pub restaurantes: Vec<PendingPayout>,
    /// Due today
    pub hoje: Vec<PendingPayout>,
    /// Not due yet
    pub proximos: Vec<PendingPayout>,
    /// Rows failing validation (no PIX key, negative balance, ...)
    pub alertas: Vec<PendingPayout>,
    pub resumo: PendingSummary,
}

fn total_balance<'a>(rows: impl IntoIterator<Item = &'a PendingPayout>) -> Decimal {
    rows.into_iter().map(|r| r.available_balance).sum()
}

impl PendingPayoutReport {
    /// Group rows that arrive already ordered by the backend
    pub fn build(rows: Vec<PendingPayout>) -> Self {
        let of_kind = |kind: ActorKind| -> Vec<PendingPayout> {
            rows.iter().filter(|r| r.actor_kind == kind).cloned().collect()
        };
        let entregadores = of_kind(ActorKind::Courier);
        let restaurantes = of_kind(ActorKind::Restaurant);
        let hoje: Vec<PendingPayout> = rows.iter().filter(|r| r.due_today).cloned().collect();
        let proximos: Vec<PendingPayout> = rows.iter().filter(|r| !r.due_today).cloned().collect();
        let alertas: Vec<PendingPayout> = rows.iter().filter(|r| !r.is_valid()).cloned().collect();

        let resumo = PendingSummary {
            total: rows.len(),
            total_entregadores: entregadores.len(),
            total_restaurantes: restaurantes.len(),
            total_hoje: hoje.len(),
            total_proximos: proximos.len(),
            total_alertas: alertas.len(),
            valor_total_hoje: total_balance(&hoje),
            valor_total_geral: total_balance(&rows),
            valor_entregadores: total_balance(&entregadores),
            valor_restaurantes: total_balance(&restaurantes),
        };

        Self {
            todos: rows,
            entregadores,
            restaurantes,
            hoje,
            proximos,
            alertas,
            resumo,
        }
    }
}

/// Revenue totals over the fetched days
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueSummary {
    pub receita_total: Decimal,
    pub receita_mes_atual: Decimal,
    pub receita_mes_anterior: Decimal,
    pub qtd_pedidos_total: i64,
    pub qtd_pedidos_mes: i64,
    /// Average platform fee per order
    pub taxa_media: Decimal,
    /// Current month against the previous one, in percent
    pub crescimento_percentual: Decimal,
}

impl RevenueSummary {
    /// Summarise daily revenue relative to `today`
    pub fn compute(days: &[RevenueDay], today: NaiveDate) -> Self {
        let current = MonthKey::of(today);
        let previous = current.previous();

        let receita_total: Decimal = days.iter().map(|d| d.revenue).sum();
        let qtd_pedidos_total: i64 = days.iter().map(|d| d.order_count).sum();

        let in_current = || days.iter().filter(|d| current.contains(&d.date));
        let receita_mes_atual: Decimal = in_current().map(|d| d.revenue).sum();
        let qtd_pedidos_mes: i64 = in_current().map(|d| d.order_count).sum();
        let receita_mes_anterior: Decimal = days
            .iter()
            .filter(|d| previous.contains(&d.date))
            .map(|d| d.revenue)
            .sum();

        let taxa_media = if qtd_pedidos_total > 0 {
            (receita_total / Decimal::from(qtd_pedidos_total)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        let crescimento_percentual = if receita_mes_anterior > Decimal::ZERO {
            ((receita_mes_atual - receita_mes_anterior) / receita_mes_anterior * Decimal::ONE_HUNDRED)
                .round_dp(2)
        } else {
            Decimal::ZERO
        };

        Self {
            receita_total,
            receita_mes_atual,
            receita_mes_anterior,
            qtd_pedidos_total,
            qtd_pedidos_mes,
            taxa_media,
            crescimento_percentual,
        }
    }
}

/// Platform revenue page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueReport {
    /// Newest first
    pub receita_diaria: Vec<RevenueDay>,
    pub resumo: RevenueSummary,
    pub top_restaurantes: Vec<TopRestaurant>,
}

impl RevenueReport {
    pub fn build(days: Vec<RevenueDay>, top: Vec<TopRestaurant>, today: NaiveDate) -> Self {
        let resumo = RevenueSummary::compute(&days, today);
        Self {
            receita_diaria: days,
            resumo,
            top_restaurantes: top,
        }
    }
}

//! Balance aggregation over ledger entries
//!
//! This is the only place that decides how an entry moves an actor's
//! balance. Credits count while `pendente` or `confirmado`, exits count once
//! `pago`, everything else is history only.

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::models::{ActorBalance, LedgerEntry};
use crate::types::{ActorKind, Direction, EntryStatus};

/// Signed contribution of one entry to its actor's balance
pub fn balance_effect(direction: Direction, status: EntryStatus, amount: Decimal) -> Decimal {
    match (direction, status) {
        (Direction::Credit, EntryStatus::Pending | EntryStatus::Confirmed) => amount,
        (Direction::Debit, EntryStatus::Paid) => -amount,
        _ => Decimal::ZERO,
    }
}

/// Balance of a set of entries belonging to one actor
pub fn balance_of<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Decimal {
    entries
        .into_iter()
        .map(|e| balance_effect(e.direction, e.status, e.amount))
        .sum()
}

/// Reduce entries into one summary per actor
///
/// Entries are keyed by `(kind, actor_id)` so a courier and a restaurant
/// sharing an id never merge. Output order is unspecified; use
/// [`active_balances`] for listings.
pub fn summarize(entries: &[LedgerEntry]) -> Vec<ActorBalance> {
    let mut by_actor: HashMap<(ActorKind, &str), ActorBalance> = HashMap::new();

    for entry in entries {
        let summary = by_actor
            .entry((entry.actor_kind, entry.actor_id.as_str()))
            .or_insert_with(|| ActorBalance {
                actor_id: entry.actor_id.clone(),
                actor_kind: entry.actor_kind,
                name: None,
                balance: Decimal::ZERO,
                total_credits: Decimal::ZERO,
                total_paid: Decimal::ZERO,
            });

        let effect = balance_effect(entry.direction, entry.status, entry.amount);
        summary.balance += effect;
        if effect > Decimal::ZERO {
            summary.total_credits += effect;
        } else if effect < Decimal::ZERO {
            summary.total_paid -= effect;
        }
    }

    by_actor.into_values().collect()
}

/// Map of actor id to balance for entries of one actor class
pub fn compute_balances(entries: &[LedgerEntry], kind: ActorKind) -> HashMap<String, Decimal> {
    let mut balances: HashMap<String, Decimal> = HashMap::new();
    for entry in entries.iter().filter(|e| e.actor_kind == kind) {
        *balances.entry(entry.actor_id.clone()).or_default() +=
            balance_effect(entry.direction, entry.status, entry.amount);
    }
    balances
}

/// Summaries with a non-zero balance, highest balance first
///
/// Equal balances are ordered by kind then actor id.
pub fn active_balances(entries: &[LedgerEntry]) -> Vec<ActorBalance> {
    let mut active: Vec<ActorBalance> = summarize(entries)
        .into_iter()
        .filter(|s| !s.balance.is_zero())
        .collect();

    active.sort_by(|a, b| {
        b.balance
            .cmp(&a.balance)
            .then_with(|| a.actor_kind.cmp(&b.actor_kind))
            .then_with(|| a.actor_id.cmp(&b.actor_id))
    });
    active
}

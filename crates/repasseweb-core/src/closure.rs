//! Closure approval rules
//!
//! A closure moves from `pendente` to `aprovado` exactly once, and that move
//! appends one confirmed exit entry for its net total.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{Closure, NewLedgerEntry};
use crate::types::{ClosureStatus, Direction, EntryStatus};
use crate::wire;
use repasseweb_utils::format_date_br;

/// Origin recorded on exit entries created by closure approval
pub const CLOSURE_ORIGIN: &str = "fechamento_caixa";

/// Approval request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApproveClosureDraft {
    #[serde(rename = "id_fechamento", default, deserialize_with = "wire::id_option::deserialize")]
    pub closure_id: Option<String>,
    #[serde(rename = "observacoes", default)]
    pub notes: Option<String>,
}

impl ApproveClosureDraft {
    pub fn validate(self) -> CoreResult<ApproveClosure> {
        let closure_id = self
            .closure_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::validation("id_fechamento is required"))?;
        Ok(ApproveClosure {
            closure_id,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
        })
    }
}

/// Validated approval request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproveClosure {
    pub closure_id: String,
    /// Replaces the stored notes only when present
    pub notes: Option<String>,
}

/// Reject closures that already left `pendente`
pub fn ensure_approvable(closure: &Closure) -> CoreResult<()> {
    if closure.status != ClosureStatus::Pending {
        return Err(CoreError::AlreadyProcessed {
            resource: format!("Closure {}", closure.id),
        });
    }
    Ok(())
}

/// Description written on the exit entry, e.g. `Fechamento de caixa - 15/06/2024`
pub fn closure_description(closure: &Closure) -> String {
    format!(
        "Fechamento de caixa - {}",
        format_date_br(closure.closed_at.date_naive())
    )
}

/// Exit entry appended when a closure is approved
pub fn closure_exit_entry(closure: &Closure) -> NewLedgerEntry {
    NewLedgerEntry {
        actor_id: closure.actor_id.clone(),
        actor_kind: closure.actor_kind,
        direction: Direction::Debit,
        status: EntryStatus::Confirmed,
        amount: closure.net_total,
        description: Some(closure_description(closure)),
        origin: Some(CLOSURE_ORIGIN.to_string()),
        reference_id: Some(closure.id.clone()),
    }
}

/// Apply an approval to a closure, returning the entry to append
///
/// Stores call this while holding whatever guard makes the status check
/// and the append atomic.
pub fn approve(closure: &mut Closure, notes: Option<String>) -> CoreResult<NewLedgerEntry> {
    ensure_approvable(closure)?;
    closure.status = ClosureStatus::Approved;
    if let Some(notes) = notes {
        closure.notes = Some(notes);
    }
    Ok(closure_exit_entry(closure))
}

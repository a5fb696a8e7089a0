//! Filter composition for ledger history, balances and closure listings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::models::{ActorName, Closure, HistoryEntry, LedgerEntry};
use crate::time::DateWindow;
use crate::types::{ActorKind, ClosureStatus, EntryStatus};

/// Filter value meaning "no filter"
pub const ALL: &str = "todos";

/// Upper bound on rows a caller may ask for
pub const MAX_LIMIT: usize = 500;

fn blank_or_all(value: &Option<String>) -> bool {
    match value.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(v) => v.eq_ignore_ascii_case(ALL),
    }
}

fn parse_date(field: &str, value: Option<&str>) -> CoreResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| CoreError::validation(format!("{} must be a YYYY-MM-DD date", field))),
    }
}

/// Case-insensitive substring match used by every name search
pub fn matches_search(name: &str, search: Option<&str>) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(s) => name.to_lowercase().contains(&s.to_lowercase()),
    }
}

/// Display name to show when an actor has no name row
pub fn fallback_name(actor_id: &str) -> String {
    format!("#{}", actor_id)
}

/// Names of actors keyed by kind and id
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    names: HashMap<(ActorKind, String), String>,
}

impl NameIndex {
    pub fn new(rows: Vec<ActorName>) -> Self {
        let names = rows
            .into_iter()
            .filter(|row| !row.name.trim().is_empty())
            .map(|row| ((row.kind, row.id), row.name))
            .collect();
        Self { names }
    }

    /// Name of an actor, `#<id>` when unknown
    pub fn name_for(&self, kind: ActorKind, actor_id: &str) -> String {
        self.names
            .get(&(kind, actor_id.to_string()))
            .cloned()
            .unwrap_or_else(|| fallback_name(actor_id))
    }
}

/// Distinct actor ids per kind, for the name lookup round-trip
pub fn actor_ids<'a>(pairs: impl IntoIterator<Item = (ActorKind, &'a str)>) -> Vec<(ActorKind, String)> {
    let mut ids: Vec<(ActorKind, String)> = pairs
        .into_iter()
        .map(|(kind, id)| (kind, id.to_string()))
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

/// History query string (`/api/extrato`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerQueryParams {
    #[serde(default)]
    pub tipo_usuario: Option<String>,
    #[serde(default)]
    pub id_usuario: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub de: Option<String>,
    #[serde(default)]
    pub ate: Option<String>,
    #[serde(default)]
    pub busca: Option<String>,
    #[serde(default)]
    pub limite: Option<usize>,
}

impl LedgerQueryParams {
    /// Parse the raw strings into a query
    pub fn into_query(self, default_limit: usize) -> CoreResult<LedgerQuery> {
        let actor_kind = if blank_or_all(&self.tipo_usuario) {
            None
        } else {
            let raw = self.tipo_usuario.as_deref().unwrap_or_default();
            Some(raw.parse::<ActorKind>().map_err(CoreError::validation)?)
        };

        let status = if blank_or_all(&self.status) {
            None
        } else {
            let raw = self.status.as_deref().unwrap_or_default();
            Some(raw.parse::<EntryStatus>().map_err(CoreError::validation)?)
        };

        let window = DateWindow::new(
            parse_date("de", self.de.as_deref())?,
            parse_date("ate", self.ate.as_deref())?,
        );
        if !window.is_valid() {
            return Err(CoreError::validation("de must not be after ate"));
        }

        Ok(LedgerQuery {
            actor_kind,
            actor_id: self.id_usuario.filter(|id| !id.trim().is_empty()),
            status,
            window,
            search: self.busca.filter(|s| !s.trim().is_empty()),
            limit: self.limite.unwrap_or(default_limit).clamp(1, MAX_LIMIT),
        })
    }
}

/// Ledger history filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub actor_kind: Option<ActorKind>,
    pub actor_id: Option<String>,
    pub status: Option<EntryStatus>,
    pub window: DateWindow,
    /// Name search, applied after the name join
    pub search: Option<String>,
    /// Most recent rows to return
    pub limit: usize,
}

impl LedgerQuery {
    /// Unfiltered query returning the latest `limit` rows
    pub fn latest(limit: usize) -> Self {
        Self {
            actor_kind: None,
            actor_id: None,
            status: None,
            window: DateWindow::default(),
            search: None,
            limit,
        }
    }

    /// Check the row-level filters (everything except the name search)
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.actor_kind.map_or(true, |k| entry.actor_kind == k)
            && self.actor_id.as_deref().map_or(true, |id| entry.actor_id == id)
            && self.status.map_or(true, |s| entry.status == s)
            && self.window.contains(&entry.created_at)
    }

    /// Join names onto entries and apply the name search
    pub fn join_names(&self, entries: Vec<LedgerEntry>, names: &NameIndex) -> Vec<HistoryEntry> {
        entries
            .into_iter()
            .map(|entry| {
                let actor_name = names.name_for(entry.actor_kind, &entry.actor_id);
                HistoryEntry { entry, actor_name }
            })
            .filter(|row| matches_search(&row.actor_name, self.search.as_deref()))
            .collect()
    }
}

/// Closure listing query string (`/api/fechamentos/listar`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClosureQueryParams {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tipo_usuario: Option<String>,
}

impl ClosureQueryParams {
    /// Status defaults to `pendente`; `todos` lists every status
    pub fn into_query(self) -> CoreResult<ClosureQuery> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => Some(ClosureStatus::Pending),
            Some(v) if v.eq_ignore_ascii_case(ALL) => None,
            Some(v) => Some(v.parse::<ClosureStatus>().map_err(CoreError::validation)?),
        };
        Ok(ClosureQuery {
            status,
            actor_kind: ActorKind::from_filter(self.tipo_usuario.as_deref()),
        })
    }
}

/// Closure listing filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureQuery {
    pub status: Option<ClosureStatus>,
    pub actor_kind: Option<ActorKind>,
}

impl Default for ClosureQuery {
    fn default() -> Self {
        Self {
            status: Some(ClosureStatus::Pending),
            actor_kind: None,
        }
    }
}

impl ClosureQuery {
    pub fn matches(&self, closure: &Closure) -> bool {
        self.status.map_or(true, |s| closure.status == s)
            && self.actor_kind.map_or(true, |k| closure.actor_kind == k)
    }
}

/// Active balances query string (`/api/saldos`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceQuery {
    #[serde(default)]
    pub tipo_usuario: Option<String>,
    #[serde(default)]
    pub busca: Option<String>,
}

impl BalanceQuery {
    pub fn actor_kind(&self) -> Option<ActorKind> {
        ActorKind::from_filter(self.tipo_usuario.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn entry(id: &str, actor: &str, kind: ActorKind, day: u32) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            actor_id: actor.to_string(),
            actor_kind: kind,
            direction: Direction::Credit,
            status: EntryStatus::Confirmed,
            amount: dec!(10),
            description: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, day, 22, 30, 0).unwrap(),
            origin: None,
            reference_id: None,
            order_kind: None,
        }
    }

    #[test]
    fn test_params_into_query() {
        let query = LedgerQueryParams {
            tipo_usuario: Some("restaurante".to_string()),
            status: Some("todos".to_string()),
            de: Some("2024-06-01".to_string()),
            ate: Some("2024-06-30".to_string()),
            busca: Some("  ".to_string()),
            ..Default::default()
        }
        .into_query(50)
        .unwrap();

        assert_eq!(query.actor_kind, Some(ActorKind::Restaurant));
        assert_eq!(query.status, None);
        assert_eq!(query.search, None);
        assert_eq!(query.limit, 50);
        assert_eq!(query.window.end, NaiveDate::from_ymd_opt(2024, 6, 30));
    }

    #[test]
    fn test_params_reject_bad_values() {
        let bad_date = LedgerQueryParams { de: Some("01/06/2024".to_string()), ..Default::default() };
        assert!(bad_date.into_query(50).is_err());

        let bad_status = LedgerQueryParams { status: Some("estornado".to_string()), ..Default::default() };
        assert!(bad_status.into_query(50).is_err());

        let reversed = LedgerQueryParams {
            de: Some("2024-06-02".to_string()),
            ate: Some("2024-06-01".to_string()),
            ..Default::default()
        };
        assert!(reversed.into_query(50).is_err());
    }

    #[test]
    fn test_limit_clamped() {
        let query = LedgerQueryParams { limite: Some(100_000), ..Default::default() }
            .into_query(50)
            .unwrap();
        assert_eq!(query.limit, MAX_LIMIT);
    }

    #[test]
    fn test_end_date_includes_late_entries() {
        let mut query = LedgerQuery::latest(50);
        query.window = DateWindow::new(None, NaiveDate::from_ymd_opt(2024, 6, 10));
        assert!(query.matches(&entry("m-1", "e-1", ActorKind::Courier, 10)));
        assert!(!query.matches(&entry("m-2", "e-1", ActorKind::Courier, 11)));
    }

    #[test]
    fn test_join_names_with_fallback_and_search() {
        let names = NameIndex::new(vec![
            ActorName { id: "r-1".to_string(), kind: ActorKind::Restaurant, name: "Pizzaria Bella".to_string() },
            ActorName { id: "e-1".to_string(), kind: ActorKind::Courier, name: "Ana Souza".to_string() },
        ]);
        let entries = vec![
            entry("m-1", "r-1", ActorKind::Restaurant, 1),
            entry("m-2", "e-1", ActorKind::Courier, 2),
            entry("m-3", "r-9", ActorKind::Restaurant, 3),
        ];

        let all = LedgerQuery::latest(50).join_names(entries.clone(), &names);
        assert_eq!(all[2].actor_name, "#r-9");

        let mut query = LedgerQuery::latest(50);
        query.search = Some("BELLA".to_string());
        let found = query.join_names(entries, &names);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entry.id, "m-1");
    }

    #[test]
    fn test_names_keyed_by_kind() {
        let names = NameIndex::new(vec![ActorName {
            id: "1".to_string(),
            kind: ActorKind::Courier,
            name: "Caio".to_string(),
        }]);
        assert_eq!(names.name_for(ActorKind::Courier, "1"), "Caio");
        assert_eq!(names.name_for(ActorKind::Restaurant, "1"), "#1");
    }

    #[test]
    fn test_closure_params() {
        assert_eq!(
            ClosureQueryParams::default().into_query().unwrap().status,
            Some(ClosureStatus::Pending)
        );
        let all = ClosureQueryParams { status: Some("todos".to_string()), tipo_usuario: Some("entregador".to_string()) }
            .into_query()
            .unwrap();
        assert_eq!(all.status, None);
        assert_eq!(all.actor_kind, Some(ActorKind::Courier));
    }

    #[test]
    fn test_actor_ids_dedup() {
        let ids = actor_ids(vec![
            (ActorKind::Courier, "b"),
            (ActorKind::Courier, "a"),
            (ActorKind::Courier, "b"),
        ]);
        assert_eq!(ids.len(), 2);
    }
}

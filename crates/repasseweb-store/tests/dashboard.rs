use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

use repasseweb_config::QueryConfig;
use repasseweb_core::{
    ActorKind, BalanceQuery, CoreError, Dashboard, LedgerQueryParams, SettleDraft,
};
use repasseweb_store::{MemoryBackend, Seed};

fn dashboard() -> (Dashboard, Arc<MemoryBackend>) {
    let backend = Arc::new(
        MemoryBackend::from_seed(Seed::demo().unwrap())
            .with_fixed_time(Utc.with_ymd_and_hms(2024, 6, 8, 15, 0, 0).unwrap()),
    );
    (Dashboard::new(backend.clone(), QueryConfig::default()), backend)
}

#[tokio::test]
async fn test_pending_view_agrees_with_balances() {
    let (dashboard, _) = dashboard();

    let report = dashboard.pending_payouts(None).await.unwrap();
    let balances = dashboard.actor_balances(BalanceQuery::default()).await.unwrap();

    assert_eq!(report.todos.len(), balances.len());
    for row in &report.todos {
        let summary = balances
            .iter()
            .find(|b| b.actor_id == row.id && b.actor_kind == row.actor_kind)
            .unwrap();
        assert_eq!(summary.balance, row.available_balance, "{}", row.id);
    }
    assert_eq!(report.resumo.valor_total_geral, dec!(990.5));
}

#[tokio::test]
async fn test_due_dates_follow_last_payment() {
    let (dashboard, _) = dashboard();
    let report = dashboard.pending_payouts(Some(ActorKind::Courier)).await.unwrap();

    let ana = report.todos.iter().find(|r| r.id == "ent-001").unwrap();
    // paid on 2024-06-03, weekly
    assert_eq!(ana.next_payment_date, NaiveDate::from_ymd_opt(2024, 6, 10));
    assert!(!ana.due_today);

    let bruno = report.todos.iter().find(|r| r.id == "ent-002").unwrap();
    assert!(bruno.due_today);
    assert_eq!(report.hoje.len() + report.proximos.len(), report.todos.len());
}

#[tokio::test]
async fn test_settle_without_pix_key_is_rejected_before_ledger_changes() {
    let (dashboard, backend) = dashboard();
    let draft = SettleDraft {
        payout: repasseweb_core::PayoutDraft {
            courier_id: Some("ent-003".to_string()),
            amount: Some(dec!(18)),
            pix_key: Some("carla@pix.example".to_string()),
            note: None,
        },
        receipt_url: None,
    };

    let result = dashboard.settle_payout(draft).await;
    assert!(matches!(result, Err(CoreError::Rejected { .. })));
    assert_eq!(backend.entries().await.len(), 9);
}

#[tokio::test]
async fn test_history_search_runs_after_name_join() {
    let (dashboard, _) = dashboard();
    let params = LedgerQueryParams {
        busca: Some("kento".to_string()),
        ..LedgerQueryParams::default()
    };
    let rows = dashboard.ledger_history(params).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.actor_name == "Sushi Kento"));
}

//! Integration tests for end-to-end session lifecycle.
//!
//! Validates:
//! - create → scope → complete/errored → summary
//! - `max_concurrent_sessions` admission with retired sessions
//! - audit records for every lifecycle event
//! - registry construction from configuration

use std::time::Duration;

use chrono::Utc;
use session_warden::audit::AuditEventType;
use session_warden::models::session::SessionState;
use session_warden::models::stats::StatsPatch;
use session_warden::{AppError, GlobalConfig, SessionRegistry};

use super::test_helpers::{audited_registry, player};

#[tokio::test]
async fn capacity_scenario_only_active_sessions_count() {
    let registry = SessionRegistry::new(2);
    registry.create("a", player("A", 1)).expect("a");
    registry.create("b", player("B", 1)).expect("b");

    let err = registry.create("c", player("C", 1)).expect_err("c at capacity");
    assert!(matches!(err, AppError::CapacityExceeded(_)));

    registry
        .acquire("a")
        .await
        .expect("scope a")
        .complete()
        .expect("complete a");
    assert_eq!(registry.get("a").expect("a").state, SessionState::Completed);

    let c = registry.create("c", player("C", 1)).expect("c admitted after a retired");
    assert_eq!(c.state, SessionState::Active);
    assert_eq!(registry.len(), 3, "retired sessions stay registered");
    assert_eq!(registry.counters().active, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn errored_state_visible_to_other_tasks_after_failure() {
    let registry = SessionRegistry::new(2);
    registry.create("a", player("A", 1)).expect("a");

    let (tx, rx) = tokio::sync::oneshot::channel();
    let observer_registry = registry.clone();
    let observer = tokio::spawn(async move {
        let failure: AppError = rx.await.expect("failure notice");
        (failure, observer_registry.get("a").expect("get").state)
    });

    let result: Result<(), AppError> = registry
        .with_scope("a", |_| Err(AppError::Failed("lost connection".into())))
        .await;
    tx.send(result.expect_err("body failed")).expect("send");

    let (failure, observed) = observer.await.expect("observer");
    assert_eq!(failure, AppError::Failed("lost connection".into()));
    assert_eq!(observed, SessionState::Errored);
}

#[tokio::test]
async fn lifecycle_events_are_audited() {
    let (registry, audit) = audited_registry(1);

    registry.create("a", player("A", 1)).expect("a");
    registry.create("a", player("A", 1)).expect("duplicate");
    registry.create("b", player("B", 1)).expect_err("over capacity");
    assert!(registry.update_player_stats("a", &StatsPatch::default().level(2)).await);
    assert!(!registry.update_player_stats("a", &StatsPatch::default().level(0)).await);

    let kinds: Vec<AuditEventType> = audit.entries().iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            AuditEventType::SessionCreated,
            AuditEventType::SessionDuplicate,
            AuditEventType::SessionRejected,
            AuditEventType::ScopeCompleted,
            AuditEventType::ScopeErrored,
        ]
    );

    let scopes = audit.entries_of(AuditEventType::ScopeCompleted);
    assert!(scopes[0].scope_id.is_some());
    assert_eq!(scopes[0].state, Some(SessionState::Completed));
}

#[tokio::test]
async fn summary_reflects_registry_activity() {
    let registry = SessionRegistry::new(10);
    assert!(registry.summary().average_lifetime_seconds.abs() < f64::EPSILON);

    registry.create("a", player("A", 1)).expect("a");
    registry.create("b", player("B", 2)).expect("b");
    registry.create("c", player("C", 2)).expect("c");
    registry.create("c", player("C", 2)).expect("dup");

    assert!(registry.update_player_stats("a", &StatsPatch::default().level(2)).await);
    assert!(!registry.update_player_stats("b", &StatsPatch::default().health(-1)).await);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let summary = registry.summary();

    assert_eq!(summary.created_count, 3);
    assert_eq!(summary.active_count, 1);
    assert_eq!(summary.completed_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.duplicate_count, 1);
    assert_eq!(summary.level_distribution.get(&2), Some(&3));
    assert!(summary.average_lifetime_seconds > 0.0);
}

#[tokio::test]
async fn summary_tolerates_concurrent_scopes() {
    let registry = SessionRegistry::new(16);
    for i in 0..8 {
        registry.create(format!("s{i}"), player("P", 1)).expect("create");
    }

    let held = registry.acquire("s0").await.expect("hold");
    let summary = registry.summary();
    assert_eq!(summary.created_count, 8);
    assert_eq!(summary.level_distribution.get(&1), Some(&8));

    let workers: Vec<_> = (1..8)
        .map(|i| {
            let registry = registry.clone();
            tokio::spawn(async move {
                for round in 0..10 {
                    registry
                        .update_player_stats(&format!("s{i}"), &StatsPatch::default().experience(round))
                        .await;
                }
            })
        })
        .collect();
    for _ in 0..10 {
        let summary = registry.summary();
        assert_eq!(summary.level_distribution.values().sum::<u64>(), 8);
        tokio::task::yield_now().await;
    }
    for worker in workers {
        worker.await.expect("worker");
    }

    held.complete().expect("complete");
    assert_eq!(registry.summary().completed_count, 71);
}

#[tokio::test]
async fn registry_from_config_writes_audit_log() {
    let temp = tempfile::tempdir().expect("tempdir");
    let log_dir = temp.path().join("audit");
    let toml = format!(
        "max_concurrent_sessions = 3\n\n[audit]\nlog_dir = '{}'\n",
        log_dir.to_str().expect("utf8")
    );
    let config = GlobalConfig::from_toml_str(&toml).expect("config");

    let registry = SessionRegistry::from_config(&config).expect("registry");
    assert_eq!(registry.max_concurrent(), 3);
    registry.create("a", player("A", 1)).expect("a");

    let path = log_dir.join(format!("audit-{}.jsonl", Utc::now().date_naive()));
    let raw = std::fs::read_to_string(path).expect("audit file");
    assert!(raw.contains("\"session_created\""));
}

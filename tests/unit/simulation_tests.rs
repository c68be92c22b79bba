//! Unit tests for the simulation driver.

use session_warden::config::SimulationConfig;
use session_warden::models::session::SessionState;
use session_warden::orchestrator::simulation::{round_update, run, simulated_session, timed};
use session_warden::{AppError, SessionRegistry};

#[test]
fn simulated_session_stats_follow_index() {
    let first = simulated_session(0);
    assert_eq!(first.owner.name, "TestPlayer0");
    assert_eq!(first.stats.health, Some(100));
    assert_eq!(first.stats.mana, Some(50));
    assert_eq!(first.stats.experience, Some(0));
    assert_eq!(first.stats.level, Some(1));

    let seventh = simulated_session(7);
    assert_eq!(seventh.stats.health, Some(65));
    assert_eq!(seventh.stats.mana, Some(64));
    assert_eq!(seventh.stats.experience, Some(700));
    assert_eq!(seventh.stats.level, Some(3));
}

#[test]
fn simulated_health_never_negative() {
    assert_eq!(simulated_session(40).stats.health, Some(0));
}

#[test]
fn round_update_floors_health() {
    let early = round_update(5);
    assert_eq!(early.experience, Some(50));
    assert_eq!(early.health, Some(95));

    let late = round_update(89);
    assert_eq!(late.health, Some(11));

    let wrapped = round_update(95);
    assert_eq!(wrapped.health, Some(95));

    assert_eq!(round_update(170).health, Some(20));
    assert_eq!(round_update(88).health, Some(12));
}

#[tokio::test]
async fn timed_passes_result_through() {
    let ok: Result<u32, AppError> = timed("ok", async { Ok(3) }).await;
    assert_eq!(ok, Ok(3));

    let err: Result<u32, AppError> =
        timed("err", async { Err(AppError::Failed("nope".into())) }).await;
    assert_eq!(err, Err(AppError::Failed("nope".into())));
}

#[tokio::test]
async fn run_completes_every_session() {
    let registry = SessionRegistry::new(50);
    let config = SimulationConfig {
        session_count: 4,
        iterations: 6,
        tick_millis: 0,
    };

    let summary = run(&registry, &config).await.expect("simulation");

    assert_eq!(summary.created_count, 4);
    assert_eq!(summary.completed_count, 24);
    assert_eq!(summary.failed_count, 0);
    assert_eq!(summary.active_count, 0);
    for index in 0..4 {
        let session = registry.get(&format!("test_session_{index}")).expect("session");
        assert_eq!(session.state, SessionState::Completed);
        assert_eq!(session.stats.experience, 50);
    }
}

#[tokio::test]
async fn run_caps_sessions_at_iterations() {
    let registry = SessionRegistry::new(50);
    let config = SimulationConfig {
        session_count: 10,
        iterations: 3,
        tick_millis: 0,
    };

    let summary = run(&registry, &config).await.expect("simulation");
    assert_eq!(summary.created_count, 3);
}

#[tokio::test]
async fn run_skips_sessions_over_capacity() {
    let registry = SessionRegistry::new(2);
    let config = SimulationConfig {
        session_count: 5,
        iterations: 5,
        tick_millis: 0,
    };

    let summary = run(&registry, &config).await.expect("simulation");
    assert_eq!(summary.created_count, 2);
    assert_eq!(summary.rejected_count, 3);
}

//! Load simulation that drives a registry through create/update rounds.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{error, info, info_span, Instrument};

use super::registry::SessionRegistry;
use crate::config::SimulationConfig;
use crate::models::session::{NewSession, SessionOwner};
use crate::models::stats::StatsPatch;
use crate::models::summary::SessionSummary;
use crate::{AppError, Result};

/// Await `fut`, logging how long it took and whether it failed.
///
/// # Errors
///
/// Returns whatever `fut` returns.
pub async fn timed<T, E, F>(label: &str, fut: F) -> std::result::Result<T, E>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Display,
{
    let start = Instant::now();
    let result = fut.await;
    let elapsed = start.elapsed().as_secs_f64();
    match &result {
        Ok(_) => info!(label, elapsed_secs = elapsed, "completed"),
        Err(err) => error!(label, elapsed_secs = elapsed, %err, "failed"),
    }
    result
}

/// Creation payload for the `index`-th simulated session.
#[must_use]
pub fn simulated_session(index: u32) -> NewSession {
    let i = i32::try_from(index).unwrap_or(i32::MAX);
    let stats = StatsPatch::default()
        .health(100_i32.saturating_sub(i.saturating_mul(5)).max(0))
        .mana(50_i32.saturating_add(i.saturating_mul(2)))
        .experience(i64::from(index) * 100)
        .level((i / 2).max(1));
    NewSession::new(SessionOwner::named(format!("TestPlayer{index}"))).with_stats(stats)
}

/// Stat update applied in round `iteration`.
#[must_use]
pub fn round_update(iteration: u32) -> StatsPatch {
    let health = 100 - i32::try_from(iteration % 90).unwrap_or(0);
    StatsPatch::default()
        .experience(i64::from(iteration) * 10)
        .health(health.max(10))
}

/// Create the simulated sessions, run every update round, and summarize.
///
/// Creation failures are logged and the session skipped; update failures
/// are logged by [`SessionRegistry::update_player_stats`] and do not stop
/// the round.
///
/// # Errors
///
/// Returns `AppError::Failed` if sessions were requested but none could
/// be created.
pub async fn run(registry: &SessionRegistry, config: &SimulationConfig) -> Result<SessionSummary> {
    let span = info_span!(
        "simulation",
        sessions = config.session_count,
        iterations = config.iterations
    );
    async {
        info!("starting simulation");

        let mut ids = Vec::new();
        for index in 0..config.session_count.min(config.iterations) {
            let id = format!("test_session_{index}");
            match registry.create(id.clone(), simulated_session(index)) {
                Ok(session) => ids.push(session.id),
                Err(err) => error!(session_id = %id, %err, "failed to create simulated session"),
            }
        }

        if ids.is_empty() && config.session_count > 0 && config.iterations > 0 {
            return Err(AppError::Failed(
                "no simulated sessions could be created".into(),
            ));
        }

        let tick = Duration::from_millis(config.tick_millis);
        for iteration in 0..config.iterations {
            let patch = round_update(iteration);
            for id in &ids {
                registry.update_player_stats(id, &patch).await;
            }
            tokio::time::sleep(tick).await;
        }

        Ok(registry.summary())
    }
    .instrument(span)
    .await
}

//! Read-only statistics derived from registry snapshots.
//!
//! The registry lock is held only while [`SessionRegistry::snapshot`]
//! copies entries; every derivation here runs on the copy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::registry::SessionRegistry;
use crate::models::session::SessionState;
use crate::models::summary::{RegistrySnapshot, SessionSummary};

/// Mean of `now - created_at` across the snapshot, `0.0` when empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_lifetime_seconds(snapshot: &RegistrySnapshot, now: DateTime<Utc>) -> f64 {
    if snapshot.sessions.is_empty() {
        return 0.0;
    }
    let total: f64 = snapshot
        .sessions
        .values()
        .map(|session| session.lifetime_seconds(now))
        .sum();
    total / snapshot.sessions.len() as f64
}

/// Number of sessions at each level, across all states.
#[must_use]
pub fn level_distribution(snapshot: &RegistrySnapshot) -> BTreeMap<i32, u64> {
    let mut distribution = BTreeMap::new();
    for session in snapshot.sessions.values() {
        *distribution.entry(session.stats.level).or_insert(0) += 1;
    }
    distribution
}

#[allow(clippy::cast_precision_loss)]
fn approx_size_kb(snapshot: &RegistrySnapshot) -> f64 {
    serde_json::to_vec(&snapshot.sessions).map_or(0.0, |raw| raw.len() as f64 / 1024.0)
}

impl SessionSummary {
    /// Derive the summary for `snapshot` as observed at `now`.
    #[must_use]
    pub fn from_snapshot(snapshot: &RegistrySnapshot, now: DateTime<Utc>) -> Self {
        let active_count = snapshot
            .sessions
            .values()
            .filter(|session| session.state == SessionState::Active)
            .count() as u64;

        Self {
            created_count: snapshot.counters.created,
            active_count,
            completed_count: snapshot.counters.completed,
            failed_count: snapshot.counters.failed,
            rejected_count: snapshot.counters.rejected,
            duplicate_count: snapshot.counters.duplicates,
            average_lifetime_seconds: average_lifetime_seconds(snapshot, now),
            level_distribution: level_distribution(snapshot),
            approx_size_kb: approx_size_kb(snapshot),
        }
    }
}

impl SessionRegistry {
    /// Summarize the registry as of now.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let snapshot = self.snapshot();
        SessionSummary::from_snapshot(&snapshot, Utc::now())
    }
}

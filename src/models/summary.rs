//! Lifecycle counters, registry snapshots, and derived summaries.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::session::Session;

/// Lifecycle bookkeeping maintained by the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LifecycleCounters {
    /// Sessions successfully inserted.
    pub created: u64,
    /// Sessions currently `Active`.
    pub active: u64,
    /// Scopes that ended `Completed`.
    pub completed: u64,
    /// Scopes that ended `Errored`.
    pub failed: u64,
    /// Creates refused by validation or capacity.
    pub rejected: u64,
    /// Idempotent duplicate creates.
    pub duplicates: u64,
}

/// Point-in-time copy of the registry contents.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    /// Copied sessions keyed by id.
    pub sessions: HashMap<String, Session>,
    /// Counters as of the copy.
    pub counters: LifecycleCounters,
}

/// Read-only statistics derived from a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionSummary {
    /// Sessions successfully created.
    pub created_count: u64,
    /// Sessions in the snapshot currently `Active`.
    pub active_count: u64,
    /// Scopes that ended `Completed`.
    pub completed_count: u64,
    /// Scopes that ended `Errored`.
    pub failed_count: u64,
    /// Creates refused by validation or capacity.
    pub rejected_count: u64,
    /// Idempotent duplicate creates.
    pub duplicate_count: u64,
    /// Mean age of the sessions in the snapshot; `0.0` when empty.
    pub average_lifetime_seconds: f64,
    /// Level value to number of sessions at that level, across all states.
    pub level_distribution: BTreeMap<i32, u64>,
    /// Rough footprint of the serialized snapshot in KiB.
    pub approx_size_kb: f64,
}

//! Session model and lifecycle helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{PlayerStats, StatsPatch};

/// Lifecycle state for a tracked session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Admitted and counted against the concurrency bound.
    Active,
    /// Last scope finished normally.
    Completed,
    /// Last scope failed or was abandoned.
    Errored,
}

impl SessionState {
    /// Whether the session is in a terminal (retired) state.
    #[must_use]
    pub fn is_retired(self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }
}

/// Spatial position of the owning entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// Free-form reference to the entity controlling a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SessionOwner {
    /// Display name.
    #[serde(default = "default_owner_name")]
    pub name: String,
    /// Items held by the owner.
    #[serde(default)]
    pub inventory: Vec<String>,
    /// Current position.
    #[serde(default)]
    pub position: Position,
    /// Opaque caller metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_owner_name() -> String {
    "Unknown".into()
}

impl Default for SessionOwner {
    fn default() -> Self {
        Self {
            name: default_owner_name(),
            inventory: Vec::new(),
            position: Position::default(),
            metadata: serde_json::Value::Null,
        }
    }
}

impl SessionOwner {
    /// Owner with the given display name and default everything else.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Caller-supplied payload for [`SessionRegistry::create`](crate::orchestrator::registry::SessionRegistry::create).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct NewSession {
    /// Controlling entity.
    #[serde(default)]
    pub owner: SessionOwner,
    /// Initial stat overrides; omitted fields take defaults.
    #[serde(default)]
    pub stats: StatsPatch,
}

impl NewSession {
    /// Payload for an owner with default stats.
    #[must_use]
    pub fn new(owner: SessionOwner) -> Self {
        Self {
            owner,
            stats: StatsPatch::default(),
        }
    }

    /// Replace the initial stat overrides.
    #[must_use]
    pub fn with_stats(mut self, stats: StatsPatch) -> Self {
        self.stats = stats;
        self
    }
}

/// Tracked session entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Session {
    /// Caller-assigned identifier; immutable after creation.
    pub id: String,
    /// Controlling entity.
    pub owner: SessionOwner,
    /// Validated mutable attributes.
    pub stats: PlayerStats,
    /// Creation timestamp; immutable.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every scope entry.
    pub last_activity: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: SessionState,
}

impl Session {
    /// Build a validated, `Active` session from a creation payload.
    ///
    /// # Errors
    ///
    /// Returns the violation message if the initial stats are out of bounds.
    pub fn from_new(id: String, new: NewSession) -> std::result::Result<Self, String> {
        let stats = PlayerStats::default().patched(&new.stats);
        stats.check()?;

        let now = Utc::now();
        Ok(Self {
            id,
            owner: new.owner,
            stats,
            created_at: now,
            last_activity: now,
            state: SessionState::Active,
        })
    }

    /// Seconds elapsed between creation and `now`, clamped at zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lifetime_seconds(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.created_at).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }
}

//! Validated mutable session fields and partial-update patches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default vitality for a new session.
pub const DEFAULT_HEALTH: i32 = 100;
/// Default mana for a new session.
pub const DEFAULT_MANA: i32 = 50;
/// Lowest permitted level.
pub const MIN_LEVEL: i32 = 1;

/// Numeric attributes of a session subject to bounded validation.
///
/// `health` is the vitality attribute and must never go below zero;
/// `level` is the tier attribute and must be at least [`MIN_LEVEL`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlayerStats {
    /// Vitality; must be `>= 0`.
    pub health: i32,
    /// Spendable resource; unbounded.
    pub mana: i32,
    /// Accumulated experience; unbounded.
    pub experience: i64,
    /// Tier; must be `>= 1`.
    pub level: i32,
    /// When the stats were last replaced.
    pub last_updated: DateTime<Utc>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            health: DEFAULT_HEALTH,
            mana: DEFAULT_MANA,
            experience: 0,
            level: MIN_LEVEL,
            last_updated: Utc::now(),
        }
    }
}

impl PlayerStats {
    /// Check the field invariants, returning a description of the first
    /// violation.
    ///
    /// # Errors
    ///
    /// Returns the violation message when `health < 0` or `level < 1`.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.health < 0 {
            return Err(format!("health cannot be negative (got {})", self.health));
        }
        if self.level < MIN_LEVEL {
            return Err(format!(
                "level must be at least {MIN_LEVEL} (got {})",
                self.level
            ));
        }
        Ok(())
    }

    /// Produce the stats that would result from applying `patch`.
    ///
    /// Fields absent from the patch keep their current value. The result
    /// is not validated; callers run [`check`](Self::check) before
    /// committing.
    #[must_use]
    pub fn patched(&self, patch: &StatsPatch) -> Self {
        Self {
            health: patch.health.unwrap_or(self.health),
            mana: patch.mana.unwrap_or(self.mana),
            experience: patch.experience.unwrap_or(self.experience),
            level: patch.level.unwrap_or(self.level),
            last_updated: Utc::now(),
        }
    }
}

/// Initial stat values supplied at creation; omitted fields take defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct StatsPatch {
    /// Replacement vitality.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    /// Replacement mana.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana: Option<i32>,
    /// Replacement experience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<i64>,
    /// Replacement level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

impl StatsPatch {
    /// Set the replacement health.
    #[must_use]
    pub fn health(mut self, value: i32) -> Self {
        self.health = Some(value);
        self
    }

    /// Set the replacement mana.
    #[must_use]
    pub fn mana(mut self, value: i32) -> Self {
        self.mana = Some(value);
        self
    }

    /// Set the replacement experience.
    #[must_use]
    pub fn experience(mut self, value: i64) -> Self {
        self.experience = Some(value);
        self
    }

    /// Set the replacement level.
    #[must_use]
    pub fn level(mut self, value: i32) -> Self {
        self.level = Some(value);
        self
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.health.is_none()
            && self.mana.is_none()
            && self.experience.is_none()
            && self.level.is_none()
    }
}

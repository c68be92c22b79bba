//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Audit log destination.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct AuditConfig {
    /// Directory receiving `audit-YYYY-MM-DD.jsonl` files.
    pub log_dir: PathBuf,
}

/// Parameters for the built-in load simulation.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SimulationConfig {
    /// Sessions created before the update loop starts.
    #[serde(default = "default_session_count")]
    pub session_count: u32,
    /// Update rounds applied to every session.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Pause between rounds.
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            session_count: default_session_count(),
            iterations: default_iterations(),
            tick_millis: default_tick_millis(),
        }
    }
}

fn default_session_count() -> u32 {
    10
}

fn default_iterations() -> u32 {
    100
}

fn default_tick_millis() -> u64 {
    10
}

fn default_max_concurrent_sessions() -> u32 {
    100
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct GlobalConfig {
    /// Upper bound on sessions simultaneously `Active`.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u32,
    /// Optional JSONL audit log.
    #[serde(default)]
    pub audit: Option<AuditConfig>,
    /// Simulation driver parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: default_max_concurrent_sessions(),
            audit: None,
            simulation: SimulationConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_sessions == 0 {
            return Err(AppError::Config(
                "max_concurrent_sessions must be greater than zero".into(),
            ));
        }

        if self
            .audit
            .as_ref()
            .is_some_and(|audit| audit.log_dir.as_os_str().is_empty())
        {
            return Err(AppError::Config("audit.log_dir must not be empty".into()));
        }

        Ok(())
    }
}

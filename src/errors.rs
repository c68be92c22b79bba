//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Admission refused because the active-session bound is reached.
    CapacityExceeded(String),
    /// Initial session fields failed validation; nothing was registered.
    InvalidInitialState(String),
    /// A field write inside a scope failed validation.
    InvalidUpdate(String),
    /// Requested session does not exist.
    NotFound(String),
    /// Scope acquisition was abandoned before the session lock was granted.
    Cancelled(String),
    /// Unit of work inside a scope signalled failure.
    Failed(String),
    /// Audit log write or rotation failure.
    Audit(String),
}

impl AppError {
    /// Whether a caller may reasonably retry the operation later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CapacityExceeded(_) | Self::Cancelled(_))
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {msg}"),
            Self::InvalidInitialState(msg) => write!(f, "invalid initial state: {msg}"),
            Self::InvalidUpdate(msg) => write!(f, "invalid update: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Cancelled(msg) => write!(f, "cancelled: {msg}"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
            Self::Audit(msg) => write!(f, "audit: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

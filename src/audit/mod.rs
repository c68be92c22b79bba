//! Structured audit records for session lifecycle events.
//!
//! Provides the [`AuditLogger`] trait and associated types. The primary
//! implementation, [`JsonlAuditWriter`], appends JSONL records to
//! daily-rotating files. [`MemoryAuditLog`] keeps entries in memory for
//! callers that want to inspect them directly.

pub mod writer;

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::session::SessionState;

/// Event type classification for audit log entries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A new session was admitted.
    SessionCreated,
    /// Create was called for an id that already exists.
    SessionDuplicate,
    /// Create was refused (capacity or validation).
    SessionRejected,
    /// A scope ended normally.
    ScopeCompleted,
    /// A scope ended in failure or was abandoned.
    ScopeErrored,
}

/// A structured record of a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// ISO 8601 timestamp with timezone.
    pub timestamp: DateTime<Utc>,
    /// Session the event concerns.
    pub session_id: String,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Scope invocation identifier (scope events only).
    pub scope_id: Option<String>,
    /// State committed by the event, if any.
    pub state: Option<SessionState>,
    /// Failure or rejection reason.
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Construct a minimal audit entry for the given event type.
    #[must_use]
    pub fn new(event_type: AuditEventType, session_id: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            event_type,
            scope_id: None,
            state: None,
            reason: None,
        }
    }

    /// Set the scope invocation identifier for this entry.
    #[must_use]
    pub fn with_scope(mut self, scope_id: String) -> Self {
        self.scope_id = Some(scope_id);
        self
    }

    /// Set the committed state for this entry.
    #[must_use]
    pub fn with_state(mut self, state: SessionState) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the failure or rejection reason for this entry.
    #[must_use]
    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Writes structured audit entries to a persistent store.
///
/// Implementations must be [`Send`] and [`Sync`] to allow sharing across
/// async task boundaries via [`std::sync::Arc`].
pub trait AuditLogger: Send + Sync {
    /// Record a single audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write operation fails.
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()>;
}

/// In-memory audit sink.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    /// Copy of every entry recorded so far, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Entries of one event type, oldest first.
    #[must_use]
    pub fn entries_of(&self, event_type: AuditEventType) -> Vec<AuditEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.event_type == event_type)
            .collect()
    }
}

impl AuditLogger for MemoryAuditLog {
    fn log_entry(&self, entry: AuditEntry) -> crate::Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(entry);
        Ok(())
    }
}

pub use writer::JsonlAuditWriter;

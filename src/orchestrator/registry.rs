//! Session registry: entry ownership and admission control.
//!
//! The registry is the only writer of entry existence. It owns the map
//! from session id to committed [`Session`] state, enforces the
//! `max_concurrent` bound on `Active` sessions, and keeps the lifecycle
//! counters that summaries report.
//!
//! All structural changes and every committed state transition happen
//! under a single `std::sync::RwLock`. The lock is never held across an
//! `.await`, so it is safe to take from async callers and from `Drop`.
//! Per-session scope exclusivity is a separate `tokio::sync::Mutex` per
//! entry (see [`super::scope`]).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::audit::{AuditEntry, AuditEventType, AuditLogger, JsonlAuditWriter};
use crate::config::GlobalConfig;
use crate::models::session::{NewSession, Session, SessionOwner, SessionState};
use crate::models::stats::PlayerStats;
use crate::models::summary::{LifecycleCounters, RegistrySnapshot};
use crate::{AppError, Result};

/// Registry entry: committed state plus the lock serializing scopes.
struct Entry {
    session: Session,
    scope_lock: Arc<Mutex<()>>,
}

struct RegistryState {
    entries: HashMap<String, Entry>,
    counters: LifecycleCounters,
}

struct Shared {
    max_concurrent: u64,
    state: RwLock<RegistryState>,
    audit: Option<Arc<dyn AuditLogger>>,
}

/// How a scope ends, as committed by [`SessionRegistry::finish`].
pub(crate) enum ScopeExit {
    /// Commit the scope's field writes and mark `Completed`.
    Completed {
        /// Stats as left by the scope body.
        stats: PlayerStats,
        /// Owner as left by the scope body.
        owner: SessionOwner,
    },
    /// Discard the scope's field writes and mark `Errored`.
    Errored,
}

/// Concurrent registry of tracked sessions.
///
/// Cheap to clone; clones share the same underlying state. The registry
/// lives as long as its last clone (including any in-flight
/// [`SessionScope`](super::scope::SessionScope)).
#[derive(Clone)]
pub struct SessionRegistry {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("max_concurrent", &self.shared.max_concurrent)
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    /// Create an empty registry admitting at most `max_concurrent` active
    /// sessions.
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self::build(max_concurrent, None)
    }

    /// Create an empty registry that reports lifecycle events to `audit`.
    #[must_use]
    pub fn with_audit(max_concurrent: u32, audit: Arc<dyn AuditLogger>) -> Self {
        Self::build(max_concurrent, Some(audit))
    }

    /// Create a registry from validated configuration, opening the JSONL
    /// audit log when one is configured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Audit` if the audit directory cannot be created.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        match &config.audit {
            Some(audit) => {
                let writer = JsonlAuditWriter::new(audit.log_dir.clone())?;
                Ok(Self::with_audit(
                    config.max_concurrent_sessions,
                    Arc::new(writer),
                ))
            }
            None => Ok(Self::new(config.max_concurrent_sessions)),
        }
    }

    fn build(max_concurrent: u32, audit: Option<Arc<dyn AuditLogger>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                max_concurrent: u64::from(max_concurrent),
                state: RwLock::new(RegistryState {
                    entries: HashMap::new(),
                    counters: LifecycleCounters::default(),
                }),
                audit,
            }),
        }
    }

    /// Configured bound on simultaneously active sessions.
    #[must_use]
    pub fn max_concurrent(&self) -> u64 {
        self.shared.max_concurrent
    }

    /// Number of registered sessions in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_state().entries.len()
    }

    /// Whether no session has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_state().entries.is_empty()
    }

    /// Current lifecycle counters.
    #[must_use]
    pub fn counters(&self) -> LifecycleCounters {
        self.read_state().counters
    }

    /// Register a new session, or return the existing one for a known id.
    ///
    /// A duplicate id is not an error: the stored session is returned
    /// unchanged, a warning is logged, and a `session_duplicate` audit
    /// record is emitted. The duplicate check runs before admission, so it
    /// succeeds even when the registry is full.
    ///
    /// # Errors
    ///
    /// Returns `AppError::CapacityExceeded` if the active-session bound is
    /// reached, or `AppError::InvalidInitialState` if the initial stats are
    /// out of bounds. Nothing is registered in either case.
    pub fn create(&self, id: impl Into<String>, new: NewSession) -> Result<Session> {
        let id = id.into();
        let mut state = self.write_state();

        if let Some(entry) = state.entries.get(&id) {
            let existing = entry.session.clone();
            state.counters.duplicates += 1;
            drop(state);

            warn!(session_id = %id, "session already exists, returning existing session");
            self.record(AuditEntry::new(AuditEventType::SessionDuplicate, &id));
            return Ok(existing);
        }

        if state.counters.active >= self.shared.max_concurrent {
            state.counters.rejected += 1;
            drop(state);

            let err = AppError::CapacityExceeded(format!(
                "maximum concurrent sessions reached: {}",
                self.shared.max_concurrent
            ));
            warn!(session_id = %id, %err, "session admission refused");
            self.record(
                AuditEntry::new(AuditEventType::SessionRejected, &id).with_reason(err.to_string()),
            );
            return Err(err);
        }

        let session = match Session::from_new(id.clone(), new) {
            Ok(session) => session,
            Err(reason) => {
                state.counters.rejected += 1;
                drop(state);

                error!(session_id = %id, %reason, "failed to create session");
                self.record(
                    AuditEntry::new(AuditEventType::SessionRejected, &id)
                        .with_reason(reason.clone()),
                );
                return Err(AppError::InvalidInitialState(format!(
                    "session {id}: {reason}"
                )));
            }
        };

        state.entries.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                scope_lock: Arc::new(Mutex::new(())),
            },
        );
        state.counters.created += 1;
        state.counters.active += 1;
        drop(state);

        info!(session_id = %id, owner = %session.owner.name, "session created");
        self.record(
            AuditEntry::new(AuditEventType::SessionCreated, &id).with_state(SessionState::Active),
        );
        Ok(session)
    }

    /// Look up the committed state of a session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the id is unknown.
    pub fn get(&self, id: &str) -> Result<Session> {
        self.read_state()
            .entries
            .get(id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| not_found(id))
    }

    /// Copy every committed session and the counters.
    ///
    /// The registry lock is held only for the copy; writes made inside
    /// in-flight scopes are not visible until those scopes commit.
    #[must_use]
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.read_state();
        RegistrySnapshot {
            sessions: state
                .entries
                .iter()
                .map(|(id, entry)| (id.clone(), entry.session.clone()))
                .collect(),
            counters: state.counters,
        }
    }

    // ── Scope plumbing ──────────────────────────────────

    /// Lock serializing scopes on `id`.
    pub(crate) fn scope_lock(&self, id: &str) -> Result<Arc<Mutex<()>>> {
        self.read_state()
            .entries
            .get(id)
            .map(|entry| Arc::clone(&entry.scope_lock))
            .ok_or_else(|| not_found(id))
    }

    /// Mark a session `Active` at scope entry and refresh `last_activity`.
    ///
    /// A retired session re-entering `Active` is subject to the same
    /// admission bound as a create. The caller must hold the scope lock.
    pub(crate) fn enter(&self, id: &str) -> Result<Session> {
        let mut state = self.write_state();
        let RegistryState { entries, counters } = &mut *state;
        let entry = entries.get_mut(id).ok_or_else(|| not_found(id))?;

        if entry.session.state != SessionState::Active {
            if counters.active >= self.shared.max_concurrent {
                return Err(AppError::CapacityExceeded(format!(
                    "cannot reactivate session {id}: maximum concurrent sessions reached: {}",
                    self.shared.max_concurrent
                )));
            }
            counters.active += 1;
            entry.session.state = SessionState::Active;
        }
        entry.session.last_activity = Utc::now();

        Ok(entry.session.clone())
    }

    /// Commit the terminal transition for a scope on `id`.
    ///
    /// The caller must hold the scope lock.
    pub(crate) fn finish(&self, id: &str, exit: ScopeExit) -> Result<Session> {
        let mut state = self.write_state();
        let RegistryState { entries, counters } = &mut *state;
        let entry = entries.get_mut(id).ok_or_else(|| not_found(id))?;

        if entry.session.state == SessionState::Active {
            counters.active = counters.active.saturating_sub(1);
        }

        match exit {
            ScopeExit::Completed { stats, owner } => {
                entry.session.stats = stats;
                entry.session.owner = owner;
                entry.session.state = SessionState::Completed;
                counters.completed += 1;
            }
            ScopeExit::Errored => {
                entry.session.state = SessionState::Errored;
                counters.failed += 1;
            }
        }

        Ok(entry.session.clone())
    }

    /// Forward a record to the audit sink; failures are logged only.
    pub(crate) fn record(&self, entry: AuditEntry) {
        if let Some(audit) = &self.shared.audit {
            if let Err(err) = audit.log_entry(entry) {
                warn!(%err, "failed to write audit entry");
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.shared
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("session {id} not found"))
}

//! Exclusive, scoped mutation of a single session.
//!
//! A [`SessionScope`] is an RAII guard over one session. While it lives,
//! no other scope on the same id can be acquired; scopes on different ids
//! never contend. Field writes go to a private draft and are validated
//! before they land there, so an invalid write is never observable.
//!
//! Every exit path commits a terminal state before control returns to the
//! caller:
//!
//! - [`SessionScope::complete`] commits the draft and marks `Completed`
//!   (or `Errored` if the scope was marked or poisoned).
//! - [`SessionScope::fail`] discards the draft, marks `Errored`, and hands
//!   the error back for propagation.
//! - Dropping the guard without either (early `?` return, panic, task
//!   cancellation) discards the draft and marks `Errored`.

use std::fmt::Display;

use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Span};
use uuid::Uuid;

use super::registry::{ScopeExit, SessionRegistry};
use crate::audit::{AuditEntry, AuditEventType};
use crate::models::session::{Session, SessionOwner, SessionState};
use crate::models::stats::{PlayerStats, StatsPatch};
use crate::{AppError, Result};

/// Exclusive handle on one session for the duration of a unit of work.
#[must_use = "dropping a scope without completing it marks the session errored"]
pub struct SessionScope {
    registry: SessionRegistry,
    scope_id: String,
    draft: Session,
    /// First invalid write; fails the scope on `complete`.
    poisoned: Option<AppError>,
    /// Set by `mark_errored`; sticky for the rest of the scope.
    errored: Option<String>,
    finished: bool,
    span: Span,
    // Released after `Drop::drop` has committed the terminal state.
    _permit: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for SessionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionScope")
            .field("session_id", &self.draft.id)
            .field("scope_id", &self.scope_id)
            .field("poisoned", &self.poisoned)
            .field("errored", &self.errored)
            .finish_non_exhaustive()
    }
}

impl SessionScope {
    /// Identifier of the scoped session.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.draft.id
    }

    /// Unique identifier of this scope invocation.
    #[must_use]
    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// The session as seen inside the scope, including uncommitted writes.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.draft
    }

    /// Current (draft) stats.
    #[must_use]
    pub fn stats(&self) -> &PlayerStats {
        &self.draft.stats
    }

    /// Mutable access to the owner reference. Owner fields carry no
    /// bounds, so writes here are not validated.
    pub fn owner_mut(&mut self) -> &mut SessionOwner {
        &mut self.draft.owner
    }

    /// Apply a partial stat update.
    ///
    /// Unspecified fields keep their current value. The candidate stats
    /// are validated as a whole before anything is written.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUpdate` if the result violates a field
    /// bound, or the earlier error if the scope is already poisoned. Either
    /// way the scope will end `Errored`.
    pub fn update_stats(&mut self, patch: &StatsPatch) -> Result<()> {
        let candidate = self.draft.stats.patched(patch);
        self.commit_draft_stats(candidate)
    }

    /// Modify the stats through a closure, validating the result.
    ///
    /// # Errors
    ///
    /// Same as [`update_stats`](Self::update_stats).
    pub fn modify_stats(&mut self, f: impl FnOnce(&mut PlayerStats)) -> Result<()> {
        let mut candidate = self.draft.stats.clone();
        f(&mut candidate);
        candidate.last_updated = chrono::Utc::now();
        self.commit_draft_stats(candidate)
    }

    fn commit_draft_stats(&mut self, candidate: PlayerStats) -> Result<()> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        if let Err(reason) = candidate.check() {
            let err = AppError::InvalidUpdate(format!("session {}: {reason}", self.draft.id));
            self.poisoned = Some(err.clone());
            return Err(err);
        }
        self.draft.stats = candidate;
        Ok(())
    }

    /// Mark the scope errored without aborting the body.
    ///
    /// The error is sticky: a later [`complete`](Self::complete) commits
    /// `Errored` instead of `Completed`.
    pub fn mark_errored(&mut self, reason: impl Into<String>) {
        if self.errored.is_none() {
            self.errored = Some(reason.into());
        }
    }

    /// Whether the scope will end `Errored`.
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.errored.is_some() || self.poisoned.is_some()
    }

    /// End the scope normally.
    ///
    /// Commits the draft and marks the session `Completed`. If the scope
    /// was marked errored, commits `Errored` instead and still returns the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns the poisoning `AppError::InvalidUpdate` (after committing
    /// `Errored`) if an invalid write happened inside the scope.
    pub fn complete(mut self) -> Result<Session> {
        self.finished = true;

        if let Some(err) = self.poisoned.take() {
            self.commit_errored(&err.to_string())?;
            return Err(err);
        }
        if let Some(reason) = self.errored.take() {
            return self.commit_errored(&reason);
        }

        let exit = ScopeExit::Completed {
            stats: self.draft.stats.clone(),
            owner: self.draft.owner.clone(),
        };
        let session = self.registry.finish(&self.draft.id, exit)?;

        let _guard = self.span.enter();
        info!(session_id = %self.draft.id, "scope completed");
        self.registry.record(
            AuditEntry::new(AuditEventType::ScopeCompleted, &self.draft.id)
                .with_scope(self.scope_id.clone())
                .with_state(SessionState::Completed),
        );
        Ok(session)
    }

    /// End the scope with a failure.
    ///
    /// Commits `Errored` before returning `err`, so any observer reading
    /// the session after the caller sees the error finds it `Errored`.
    pub fn fail<E: Display>(mut self, err: E) -> E {
        self.finished = true;
        if let Err(commit_err) = self.commit_errored(&err.to_string()) {
            error!(session_id = %self.draft.id, %commit_err, "failed to commit errored state");
        }
        err
    }

    fn commit_errored(&self, reason: &str) -> Result<Session> {
        let session = self.registry.finish(&self.draft.id, ScopeExit::Errored)?;

        let _guard = self.span.enter();
        warn!(session_id = %self.draft.id, reason, "scope ended in error");
        self.registry.record(
            AuditEntry::new(AuditEventType::ScopeErrored, &self.draft.id)
                .with_scope(self.scope_id.clone())
                .with_state(SessionState::Errored)
                .with_reason(reason.to_owned()),
        );
        Ok(session)
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let reason = if std::thread::panicking() {
            "scope body panicked"
        } else {
            "scope dropped without completion"
        };
        if let Err(err) = self.commit_errored(reason) {
            error!(session_id = %self.draft.id, %err, "failed to commit errored state on drop");
        }
    }
}

impl SessionRegistry {
    /// Acquire exclusive access to one session.
    ///
    /// Waits for any in-flight scope on the same id to finish. On entry the
    /// session is marked `Active` and `last_activity` is refreshed. The
    /// wait is cancellation-safe: dropping the returned future before it
    /// resolves leaves no lock held and the session untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the id is unknown, or
    /// `AppError::CapacityExceeded` if a retired session cannot be
    /// reactivated because the active bound is reached.
    pub async fn acquire(&self, id: &str) -> Result<SessionScope> {
        let lock = self.scope_lock(id)?;
        let scope_id = Uuid::new_v4().to_string();
        let span = info_span!("session_scope", session_id = id, scope_id = %scope_id);

        debug!(parent: &span, "waiting for session lock");
        let permit = lock.lock_owned().await;

        let draft = self.enter(id)?;
        debug!(parent: &span, "scope entered");

        Ok(SessionScope {
            registry: self.clone(),
            scope_id,
            draft,
            poisoned: None,
            errored: None,
            finished: false,
            span,
            _permit: permit,
        })
    }

    /// Acquire a scope, giving up when `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Cancelled` if the token fires while waiting, or
    /// any error from [`acquire`](Self::acquire).
    pub async fn acquire_with_cancel(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionScope> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AppError::Cancelled(format!(
                "scope acquisition for session {id} cancelled"
            ))),
            scope = self.acquire(id) => scope,
        }
    }

    /// Run `body` inside a scope on `id`.
    ///
    /// `Ok` from the body completes the scope; `Err` commits `Errored` and
    /// is then returned. Registry errors convert into `E`.
    ///
    /// # Errors
    ///
    /// Returns the body's error, an acquisition error, or the poisoning
    /// `AppError::InvalidUpdate` if the body swallowed an invalid write.
    pub async fn with_scope<T, E, F>(&self, id: &str, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut SessionScope) -> std::result::Result<T, E>,
        E: From<AppError> + Display,
    {
        let mut scope = self.acquire(id).await?;
        match body(&mut scope) {
            Ok(value) => {
                scope.complete()?;
                Ok(value)
            }
            Err(err) => Err(scope.fail(err)),
        }
    }

    /// Apply a partial stat update in its own scope, reporting success as
    /// a boolean.
    ///
    /// Unknown ids and invalid updates return `false` and are logged,
    /// which lets batch callers carry on with the remaining ids. An
    /// invalid update still ends the scope `Errored`.
    pub async fn update_player_stats(&self, id: &str, patch: &StatsPatch) -> bool {
        let result: Result<PlayerStats> = self
            .with_scope(id, |scope| {
                scope.update_stats(patch)?;
                Ok(scope.stats().clone())
            })
            .await;

        match result {
            Ok(stats) => {
                info!(
                    session_id = id,
                    health = stats.health,
                    mana = stats.mana,
                    experience = stats.experience,
                    level = stats.level,
                    "updated stats"
                );
                true
            }
            Err(err) => {
                error!(session_id = id, %err, "failed to update stats");
                false
            }
        }
    }
}

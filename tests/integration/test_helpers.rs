//! Shared test helpers for registry and scope integration tests.

use std::sync::Arc;

use session_warden::audit::MemoryAuditLog;
use session_warden::models::session::{NewSession, SessionOwner};
use session_warden::models::stats::StatsPatch;
use session_warden::SessionRegistry;

/// Registry wired to an in-memory audit log the test can inspect.
pub fn audited_registry(max_concurrent: u32) -> (SessionRegistry, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::default());
    let registry = SessionRegistry::with_audit(max_concurrent, audit.clone());
    (registry, audit)
}

/// Creation payload for a named player with the given level.
pub fn player(name: &str, level: i32) -> NewSession {
    NewSession::new(SessionOwner::named(name)).with_stats(StatsPatch::default().level(level))
}

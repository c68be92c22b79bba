#![forbid(unsafe_code)]

//! `session-warden` — concurrent session lifecycle manager.
//!
//! A [`SessionRegistry`] admits sessions under a bound on how many may be
//! `Active` at once, grants exclusive scoped mutation through
//! [`SessionScope`], and derives summaries from point-in-time snapshots.

pub mod audit;
pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
pub use orchestrator::registry::SessionRegistry;
pub use orchestrator::scope::SessionScope;

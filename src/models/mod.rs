//! Domain models for tracked sessions and derived statistics.

pub mod session;
pub mod stats;
pub mod summary;

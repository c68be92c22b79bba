//! Session orchestration modules.
//!
//! Covers the session registry (admission control), scoped mutation,
//! summary aggregation, and the load simulation driver.

pub mod aggregator;
pub mod registry;
pub mod scope;
pub mod simulation;

//! Core domain types
//!
//! Descriptors mutated by the pipeline script and consumed by the deploy
//! actions.

pub mod identity;
pub mod workload;

pub use identity::Identity;
pub use workload::Workload;

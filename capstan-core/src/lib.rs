//! Capstan Core
//!
//! Core types and abstractions for the Capstan pipeline runner.
//!
//! This crate contains:
//! - Domain types: deployment target and identity descriptors
//! - The pipeline error taxonomy
//! - Credential cascade resolution
//! - JSON to YAML conversion for kubeconfig normalization

pub mod credentials;
pub mod domain;
pub mod encoding;
pub mod error;

pub use error::{PipelineError, Result};

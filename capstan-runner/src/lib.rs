//! Capstan Runner
//!
//! The pipeline state engine: owns all configuration state, registers the
//! accessor and action functions into a sandboxed Lua scope, executes one
//! pipeline script start to finish, and guarantees temporary-resource
//! cleanup regardless of how the script terminates.
//!
//! Architecture:
//! - State: the single owned configuration record mutated by accessors
//! - Temp: tracked scratch directories backing materialized content
//! - Environ: the script-visible process environment and its projection
//!   onto spawned processes
//! - Bindings: the script-facing functions, grouped per concern
//! - Runner: setup / execute / teardown lifecycle

pub mod bindings;
pub mod environ;
pub mod runner;
pub mod state;
pub mod temp;

pub use runner::PipelineRunner;
pub use state::{DockerState, KubernetesState, PipelineState};
pub use temp::TempResources;

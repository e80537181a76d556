//! Capstan Lua Infrastructure
//!
//! This crate provides the Lua side of the pipeline bridge:
//! - A restricted sandbox for evaluating pipeline scripts
//! - The content-or-path resolver for long-form configuration values
//! - The generic accessor factory that builds get/set bridge functions
//!   around host-owned state

pub mod accessor;
pub mod sandbox;
pub mod source;

pub use accessor::{long_string_accessor, object_accessor, string_accessor, string_list_accessor};
pub use sandbox::create_sandbox;
pub use source::{Source, resolve_source};

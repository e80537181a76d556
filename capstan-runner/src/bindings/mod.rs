//! Script-facing bindings, grouped per concern
//!
//! Each module registers its accessors and actions directly into the Lua
//! globals; the plain scalar accessors are registered by the runner itself
//! since the factory already covers them.

pub mod docker;
pub mod fields;
pub mod identity;
pub mod kubernetes;
pub mod script;

use std::io::Write;
use std::process::Command;

use capstan_core::error::{PipelineError, Result};

/// Spawn an external process and wait for it
///
/// Standard output and error are inherited from the caller; `stdin` is
/// piped in when supplied. The only success signal is exit code 0.
pub(crate) fn run_command(mut command: Command, name: &str, stdin: Option<&[u8]>) -> Result<()> {
    let mut child = command.spawn().map_err(|source| PipelineError::Spawn {
        command: name.to_string(),
        source,
    })?;

    if let Some(content) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(content)?;
        }
    }

    let status = child.wait().map_err(|source| PipelineError::Spawn {
        command: name.to_string(),
        source,
    })?;

    if !status.success() {
        return Err(PipelineError::ExitStatus {
            command: name.to_string(),
            code: status.code().unwrap_or(-1),
        });
    }
    Ok(())
}

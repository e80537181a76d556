//! Shell script bindings
//!
//! `useScript` accepts inline content or a path and materializes content
//! into a `script.sh` scratch file; `useShell` configures the argv-style
//! interpreter; `runScript` pipes the script file into the shell process.

use std::fs;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use capstan_core::error::{PipelineError, Result};
use capstan_lua::{long_string_accessor, string_list_accessor};
use mlua::{Error as LuaError, Lua, Result as LuaResult, Table};
use tracing::info;

use crate::bindings::run_command;
use crate::environ;
use crate::state::PipelineState;
use crate::temp::TempResources;

/// Shell used when the script never called `useShell`
pub const DEFAULT_SHELL: &str = "bash";

pub fn register(
    lua: &Lua,
    state: Arc<Mutex<PipelineState>>,
    env: Table,
    resources: Arc<TempResources>,
) -> LuaResult<()> {
    let globals = lua.globals();

    {
        let resources = resources.clone();
        globals.set(
            "useScript",
            long_string_accessor(
                lua,
                state.clone(),
                "script",
                |s: &mut PipelineState| &mut s.script_path,
                move |buf| persist_script(&resources, buf),
            )?,
        )?;
    }

    globals.set(
        "useShell",
        string_list_accessor(lua, state.clone(), "shell", |s: &mut PipelineState| {
            &mut s.shell
        })?,
    )?;

    {
        let state = state.clone();
        let env = env.clone();
        globals.set(
            "runScript",
            lua.create_function(move |_, ()| {
                run_script(&state, &env).map_err(LuaError::external)
            })?,
        )?;
    }

    Ok(())
}

fn persist_script(resources: &TempResources, buf: &[u8]) -> Result<String> {
    let path = resources.create_file("script.sh", buf.trim_ascii())?;
    Ok(path.to_string_lossy().into_owned())
}

fn run_script(state: &Arc<Mutex<PipelineState>>, env: &Table) -> Result<()> {
    let (script_path, shell) = {
        let guard = state.lock().unwrap();
        (guard.script_path.clone(), guard.shell.clone())
    };

    if script_path.is_empty() {
        return Err(PipelineError::missing("script path is not set"));
    }

    let content = fs::read(&script_path)?;
    let shell = if shell.is_empty() {
        vec![DEFAULT_SHELL.to_string()]
    } else {
        shell
    };

    info!("run script: {} via {}", script_path, shell.join(" "));

    let mut command = Command::new(&shell[0]);
    command
        .args(&shell[1..])
        .env_clear()
        .envs(environ::compose(env)?)
        .stdin(Stdio::piped());

    run_command(command, &shell[0], Some(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_script_requires_a_script_path() {
        let lua = Lua::new();
        let state = Arc::new(Mutex::new(PipelineState::default()));
        let env = lua.create_table().unwrap();

        let err = run_script(&state, &env).unwrap_err();
        assert!(matches!(err, PipelineError::MissingConfig(_)));
    }

    #[test]
    fn test_persist_script_trims_content() {
        let resources = TempResources::new();
        let path = persist_script(&resources, b"\necho hello\n\n").unwrap();
        assert!(path.ends_with("script.sh"));
        assert_eq!(fs::read(&path).unwrap(), b"echo hello");
        resources.release_all();
    }
}

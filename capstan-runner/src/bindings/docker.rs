//! Docker bindings
//!
//! Accessors for registry credentials, image lists, build args, dockerfile
//! and build context, plus the `runDockerBuild` / `runDockerPush` actions.
//! Command vectors are composed by pure functions so their ordering is
//! deterministic and testable: config flag, subcommand, per-field flags,
//! artifact targets.

use std::collections::BTreeMap;
use std::process::Command;
use std::sync::{Arc, Mutex};

use capstan_core::error::{PipelineError, Result};
use capstan_lua::{long_string_accessor, object_accessor, string_accessor, string_list_accessor};
use mlua::{Error as LuaError, Lua, Result as LuaResult, Table, Value};
use tracing::info;

use crate::bindings::run_command;
use crate::environ;
use crate::state::{DockerState, PipelineState};
use crate::temp::TempResources;

pub fn register(
    lua: &Lua,
    state: Arc<Mutex<PipelineState>>,
    env: Table,
    build_args: Table,
    resources: Arc<TempResources>,
) -> LuaResult<()> {
    let globals = lua.globals();

    {
        let resources = resources.clone();
        globals.set(
            "useDockerConfig",
            long_string_accessor(
                lua,
                state.clone(),
                "docker config",
                |s: &mut PipelineState| &mut s.docker.config_path,
                move |buf| persist_docker_config(&resources, buf),
            )?,
        )?;
    }

    globals.set(
        "useDockerImages",
        string_list_accessor(lua, state.clone(), "docker images", |s: &mut PipelineState| {
            &mut s.docker.images
        })?,
    )?;

    globals.set(
        "useDockerBuildArg",
        object_accessor(lua, build_args.clone(), "docker build arg")?,
    )?;

    globals.set(
        "useDockerfile",
        string_accessor(lua, state.clone(), "dockerfile", |s: &mut PipelineState| {
            &mut s.docker.dockerfile_path
        })?,
    )?;

    globals.set(
        "useDockerBuildContext",
        string_accessor(lua, state.clone(), "docker context", |s: &mut PipelineState| {
            &mut s.docker.build_context
        })?,
    )?;

    {
        let state = state.clone();
        let env = env.clone();
        let build_args = build_args.clone();
        globals.set(
            "runDockerBuild",
            lua.create_function(move |lua, ()| {
                let args = collect_build_args(&build_args)?;
                let (argv, images) = {
                    let guard = state.lock().unwrap();
                    (
                        build_command(&guard.docker, &args).map_err(LuaError::external)?,
                        guard.docker.images.clone(),
                    )
                };

                info!("run docker build: {}", argv.join(" "));
                spawn_docker(&argv, &env).map_err(LuaError::external)?;

                lua.create_sequence_from(images)
            })?,
        )?;
    }

    {
        let state = state.clone();
        let env = env.clone();
        globals.set(
            "runDockerPush",
            lua.create_function(move |lua, ()| {
                let (commands, images) = {
                    let guard = state.lock().unwrap();
                    (
                        push_commands(&guard.docker).map_err(LuaError::external)?,
                        guard.docker.images.clone(),
                    )
                };

                for argv in &commands {
                    info!("run docker push: {}", argv.join(" "));
                    spawn_docker(argv, &env).map_err(LuaError::external)?;
                }

                lua.create_sequence_from(images)
            })?,
        )?;
    }

    Ok(())
}

fn persist_docker_config(resources: &TempResources, buf: &[u8]) -> Result<String> {
    let path = resources.create_file("config.json", buf.trim_ascii())?;
    Ok(path.to_string_lossy().into_owned())
}

fn spawn_docker(argv: &[String], env: &Table) -> Result<()> {
    let mut command = Command::new("docker");
    command.args(argv).env_clear().envs(environ::compose(env)?);
    run_command(command, "docker", None)
}

/// Compose the `docker build` argument vector
pub(crate) fn build_command(
    docker: &DockerState,
    build_args: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    if docker.images.is_empty() {
        return Err(PipelineError::missing("no images to build"));
    }

    let mut args = Vec::new();

    if !docker.config_path.is_empty() {
        args.push("--config".to_string());
        args.push(docker.config_path.clone());
    }

    args.push("buildx".to_string());
    args.push("build".to_string());
    args.push("--load".to_string());

    for (key, value) in build_args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }

    for image in &docker.images {
        args.push("-t".to_string());
        args.push(image.clone());
    }

    if !docker.dockerfile_path.is_empty() {
        args.push("-f".to_string());
        args.push(docker.dockerfile_path.clone());
    }

    if docker.build_context.is_empty() {
        args.push(".".to_string());
    } else {
        args.push(docker.build_context.clone());
    }

    Ok(args)
}

/// Compose one `docker push` argument vector per target image
pub(crate) fn push_commands(docker: &DockerState) -> Result<Vec<Vec<String>>> {
    if docker.images.is_empty() {
        return Err(PipelineError::missing("no images to push"));
    }

    let mut commands = Vec::new();
    for image in &docker.images {
        let mut args = Vec::new();
        if !docker.config_path.is_empty() {
            args.push("--config".to_string());
            args.push(docker.config_path.clone());
        }
        args.push("push".to_string());
        args.push(image.clone());
        commands.push(args);
    }
    Ok(commands)
}

/// Read the build-arg table into sorted key/value pairs
fn collect_build_args(table: &Table) -> LuaResult<BTreeMap<String, String>> {
    let mut args = BTreeMap::new();
    for pair in table.clone().pairs::<Value, Value>() {
        let (key, value) = pair?;
        let Value::String(key) = key else { continue };
        let value = match value {
            Value::String(s) => s.to_str()?.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            _ => continue,
        };
        args.insert(key.to_str()?.to_string(), value);
    }
    Ok(args)
}

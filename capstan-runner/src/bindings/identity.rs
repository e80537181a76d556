//! Identity bindings
//!
//! `useIdentity` captures the hierarchical identity (team / project / repo
//! plus branch, values file, and an optional update callback), and
//! `deployIdentityValues` resolves the credential cascade against the
//! script-visible environment and hands the assembled values to the
//! captured callback.

use std::sync::{Arc, Mutex};

use capstan_core::credentials::{Credentials, resolve_credentials};
use capstan_core::domain::Identity;
use mlua::{Lua, Result as LuaResult, Table, Value};
use tracing::debug;

use crate::bindings::fields::{load_function_field, load_string_field};
use crate::state::PipelineState;

pub fn register(lua: &Lua, state: Arc<Mutex<PipelineState>>, env: Table) -> LuaResult<()> {
    let globals = lua.globals();

    {
        let state = state.clone();
        globals.set(
            "useIdentity",
            lua.create_function(move |lua, options: Option<Table>| {
                if let Some(options) = &options {
                    let mut guard = state.lock().unwrap();
                    let identity = &mut guard.identity;
                    load_string_field(&mut identity.team, options, "team")?;
                    load_string_field(&mut identity.project, options, "project")?;
                    load_string_field(&mut identity.repo, options, "repo")?;
                    load_string_field(&mut identity.branch, options, "branch")?;
                    load_string_field(&mut identity.file, options, "file")?;
                    load_function_field(&mut identity.update, options, "update")?;
                }

                let identity = state.lock().unwrap().identity.clone();
                identity_table(lua, &identity)
            })?,
        )?;
    }

    {
        let state = state.clone();
        let env = env.clone();
        globals.set(
            "deployIdentityValues",
            lua.create_function(move |lua, ()| {
                // snapshot first: the callback may call accessors itself
                let identity = state.lock().unwrap().identity.clone();
                let credentials = resolve(&env, &identity);
                debug!(
                    "resolved identity credentials: username {}",
                    if credentials.username.is_empty() { "unset" } else { "set" }
                );

                let values = lua.create_table()?;
                values.set("team", identity.team.as_str())?;
                values.set("project", identity.project.as_str())?;
                values.set("repo", identity.repo.as_str())?;
                values.set("branch", identity.branch.as_str())?;
                values.set("file", identity.file.as_str())?;
                values.set("username", credentials.username)?;
                values.set("password", credentials.password)?;

                if let Some(update) = &identity.update {
                    update.call::<()>(values.clone())?;
                }
                Ok(values)
            })?,
        )?;
    }

    Ok(())
}

/// Resolve the credential cascade against the environment table
///
/// Only entries whose value is a string count as defined.
pub(crate) fn resolve(env: &Table, identity: &Identity) -> Credentials {
    resolve_credentials(&identity.team, &identity.project, &identity.repo, |key| {
        match env.get::<Value>(key) {
            Ok(Value::String(s)) => s.to_str().ok().map(|v| v.to_string()),
            _ => None,
        }
    })
}

fn identity_table(lua: &Lua, identity: &Identity) -> LuaResult<Table> {
    let result = lua.create_table()?;
    result.set("team", identity.team.as_str())?;
    result.set("project", identity.project.as_str())?;
    result.set("repo", identity.repo.as_str())?;
    result.set("branch", identity.branch.as_str())?;
    result.set("file", identity.file.as_str())?;
    match &identity.update {
        Some(update) => result.set("update", update.clone())?,
        None => result.set("update", Value::Nil)?,
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ignores_non_string_entries() {
        let lua = Lua::new();
        let env = lua.create_table().unwrap();
        env.set("CODING_USERNAME", "base").unwrap();
        env.set("CODING_TEAMX_USERNAME", lua.create_table().unwrap())
            .unwrap();

        let identity = Identity {
            team: "teamx".to_string(),
            ..Default::default()
        };
        let credentials = resolve(&env, &identity);
        assert_eq!(credentials.username, "base");
        assert_eq!(credentials.password, "");
    }

    #[test]
    fn test_resolve_prefers_most_specific() {
        let lua = Lua::new();
        let env = lua.create_table().unwrap();
        env.set("CODING_TEAMX_USERNAME", "hello").unwrap();
        env.set("CODING_TEAMX_PASSWORD", "foo").unwrap();
        env.set("CODING_TEAMX_PROJECTY_PASSWORD", "world").unwrap();

        let identity = Identity {
            team: "teamx".to_string(),
            project: "projecty".to_string(),
            ..Default::default()
        };
        let credentials = resolve(&env, &identity);
        assert_eq!(credentials.username, "hello");
        assert_eq!(credentials.password, "world");
    }
}

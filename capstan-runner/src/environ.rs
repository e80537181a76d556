//! Script-visible process environment
//!
//! The environment is read once at pipeline start into a Lua table that the
//! script can freely read and mutate through `useEnv`. Whenever the engine
//! spawns an external process, the table is projected back into KEY=VALUE
//! pairs; the projection is sorted so spawned command environments are
//! deterministic.

use mlua::{Lua, Result as LuaResult, Table, Value};

/// Seed a fresh environment table from the process environment
pub fn seed(lua: &Lua) -> LuaResult<Table> {
    let env = lua.create_table()?;
    for (key, value) in std::env::vars_os() {
        env.set(
            key.to_string_lossy().into_owned(),
            value.to_string_lossy().into_owned(),
        )?;
    }
    Ok(env)
}

/// Project the environment table into KEY=VALUE pairs
///
/// Only string keys are projected; values keep Lua's string rendering for
/// strings, integers, numbers and booleans, and anything else is skipped.
pub fn compose(env: &Table) -> LuaResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for pair in env.clone().pairs::<Value, Value>() {
        let (key, value) = pair?;
        let Value::String(key) = key else { continue };
        let value = match value {
            Value::String(s) => s.to_str()?.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            _ => continue,
        };
        entries.push((key.to_str()?.to_string(), value));
    }
    entries.sort();
    Ok(entries)
}

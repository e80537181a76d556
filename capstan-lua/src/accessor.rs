//! Generic get/set bridge functions
//!
//! Every pipeline parameter is exposed to the script as a single function
//! that acts as both getter and setter: called with no arguments it returns
//! the current value, called with arguments it updates the value and
//! returns the result. The factories here build those functions around a
//! host-owned field, so individual parameters never hand-roll their own
//! argument handling.
//!
//! Fields live inside an `Arc<Mutex<S>>` shared with the engine; each
//! factory takes a plain projection function selecting the field within the
//! locked state. Locks are only held for the duration of one bridge call
//! and never across a call back into the script.

use std::sync::{Arc, Mutex};

use capstan_core::error::PipelineError;
use mlua::{Error as LuaError, Function, Lua, MultiValue, Result as LuaResult, Table, Value};
use tracing::info;

use crate::source::{Source, resolve_source};

/// Build an accessor over a live Lua table (environment, build args)
///
/// - no arguments: returns the table itself (a live view)
/// - one argument: returns the value stored under that key
/// - two arguments `(key, value)`: stores the value and returns it; the
///   key must be a string
pub fn object_accessor(lua: &Lua, target: Table, name: &'static str) -> LuaResult<Function> {
    lua.create_function(move |lua, args: MultiValue| {
        let args: Vec<Value> = args.into_iter().collect();
        match args.len() {
            0 => Ok(Value::Table(target.clone())),
            1 => {
                let key = coerce_key(lua, &args[0], name)?;
                target.get::<Value>(key)
            }
            _ => {
                let Value::String(key) = &args[0] else {
                    return Err(LuaError::external(PipelineError::InvalidKey(format!(
                        "set {} failed, key should be a string",
                        name
                    ))));
                };
                let key = key.to_str()?.to_string();
                target.set(key.as_str(), args[1].clone())?;
                info!("set {}: {}", name, key);
                Ok(args[1].clone())
            }
        }
    })
}

/// Build an accessor over a plain string field
///
/// A first argument that coerces to a string overwrites the field; any
/// other call returns the current value unchanged.
pub fn string_accessor<S: Send + 'static>(
    lua: &Lua,
    state: Arc<Mutex<S>>,
    name: &'static str,
    field: fn(&mut S) -> &mut String,
) -> LuaResult<Function> {
    lua.create_function(move |lua, args: MultiValue| {
        let new_value = match args.into_iter().next() {
            Some(first) => lua
                .coerce_string(first)?
                .map(|s| s.to_str().map(|v| v.to_string()))
                .transpose()?,
            None => None,
        };

        let mut guard = lock(&state)?;
        let slot = field(&mut guard);
        if let Some(value) = new_value {
            *slot = value;
            info!("use {}: {}", name, slot);
        }
        lua.create_string(slot.as_str()).map(Value::String)
    })
}

/// Build an accessor over a string-list field
///
/// - no arguments: returns the current list as a fresh Lua array, never a
///   live alias
/// - a single `nil` argument or an array argument (possibly empty)
///   replaces the whole list
/// - otherwise every positional argument becomes one element, coerced to a
///   string
pub fn string_list_accessor<S: Send + 'static>(
    lua: &Lua,
    state: Arc<Mutex<S>>,
    name: &'static str,
    field: fn(&mut S) -> &mut Vec<String>,
) -> LuaResult<Function> {
    lua.create_function(move |lua, args: MultiValue| {
        let args: Vec<Value> = args.into_iter().collect();

        let new_values = match args.first() {
            None => None,
            Some(Value::Nil) => Some(Vec::new()),
            Some(Value::Table(table)) => {
                let mut values = Vec::new();
                for item in table.clone().sequence_values::<Value>() {
                    values.push(coerce_element(lua, &item?, name)?);
                }
                Some(values)
            }
            Some(_) => {
                let mut values = Vec::new();
                for item in &args {
                    values.push(coerce_element(lua, item, name)?);
                }
                Some(values)
            }
        };

        let mut guard = lock(&state)?;
        let slot = field(&mut guard);
        if let Some(values) = new_values {
            *slot = values;
            info!("use {}: [{}]", name, slot.join(", "));
        }
        lua.create_sequence_from(slot.iter().cloned())
    })
}

/// Build an accessor over a long-string field backed by the content
/// resolver
///
/// Arguments are classified by [`resolve_source`]: a resolved path is
/// stored verbatim, resolved content goes through `persist` (owned by the
/// specific field, typically writing a temporary file) and the returned
/// path is stored. The stored value is always returned.
pub fn long_string_accessor<S, P>(
    lua: &Lua,
    state: Arc<Mutex<S>>,
    name: &'static str,
    field: fn(&mut S) -> &mut String,
    persist: P,
) -> LuaResult<Function>
where
    S: Send + 'static,
    P: Fn(&[u8]) -> capstan_core::Result<String> + Send + 'static,
{
    lua.create_function(move |lua, args: MultiValue| {
        let resolved = resolve_source(lua, args).map_err(LuaError::external)?;

        let mut guard = lock(&state)?;
        let slot = field(&mut guard);
        match resolved {
            Some(Source::Path(path)) => {
                *slot = path;
                info!("use {} from {}", name, slot);
            }
            Some(Source::Content(bytes)) => {
                *slot = persist(&bytes).map_err(LuaError::external)?;
                info!("use {} from content", name);
            }
            None => {}
        }
        lua.create_string(slot.as_str()).map(Value::String)
    })
}

fn lock<S>(state: &Arc<Mutex<S>>) -> LuaResult<std::sync::MutexGuard<'_, S>> {
    state
        .lock()
        .map_err(|e| LuaError::RuntimeError(format!("Failed to lock state: {}", e)))
}

fn coerce_key(lua: &Lua, value: &Value, name: &'static str) -> LuaResult<mlua::String> {
    lua.coerce_string(value.clone())?.ok_or_else(|| {
        LuaError::external(PipelineError::InvalidKey(format!(
            "get {} failed, key should be a string",
            name
        )))
    })
}

fn coerce_element(lua: &Lua, value: &Value, name: &'static str) -> LuaResult<String> {
    let coerced = lua.coerce_string(value.clone())?.ok_or_else(|| {
        LuaError::external(PipelineError::invalid_shape(format!(
            "cannot use a {} value as a {} element",
            value.type_name(),
            name
        )))
    })?;
    Ok(coerced.to_str()?.to_string())
}

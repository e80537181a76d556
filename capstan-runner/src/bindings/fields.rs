//! Partial-update field loaders
//!
//! Descriptor accessors (`useKubernetesWorkload`, `useIdentity`) take an
//! options table and update only the fields it mentions. Lua cannot
//! distinguish an absent field from an explicit `nil`, so the clear
//! sentinel is `false`: absent/`nil` keeps the prior value, `false` resets
//! a field to empty (or drops a captured callback).

use capstan_core::error::PipelineError;
use mlua::{Error as LuaError, Function, Result as LuaResult, Table, Value};

pub(crate) fn load_string_field(
    slot: &mut String,
    options: &Table,
    name: &str,
) -> LuaResult<()> {
    match options.get::<Value>(name)? {
        Value::Nil => {}
        Value::Boolean(false) => slot.clear(),
        Value::String(s) => *slot = s.to_str()?.to_string(),
        Value::Integer(i) => *slot = i.to_string(),
        Value::Number(n) => *slot = n.to_string(),
        other => {
            return Err(LuaError::external(PipelineError::invalid_shape(format!(
                "field '{}' should be a string, got {}",
                name,
                other.type_name()
            ))));
        }
    }
    Ok(())
}

pub(crate) fn load_bool_field(slot: &mut bool, options: &Table, name: &str) -> LuaResult<()> {
    match options.get::<Value>(name)? {
        Value::Nil => {}
        // Lua truthiness: false is the only non-nil falsy value
        Value::Boolean(b) => *slot = b,
        _ => *slot = true,
    }
    Ok(())
}

pub(crate) fn load_function_field(
    slot: &mut Option<Function>,
    options: &Table,
    name: &str,
) -> LuaResult<()> {
    match options.get::<Value>(name)? {
        Value::Nil => {}
        Value::Boolean(false) => *slot = None,
        Value::Function(f) => *slot = Some(f),
        other => {
            return Err(LuaError::external(PipelineError::invalid_shape(format!(
                "field '{}' should be a function, got {}",
                name,
                other.type_name()
            ))));
        }
    }
    Ok(())
}

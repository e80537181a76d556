//! Script-side content resolution
//!
//! Long-form configuration values (shell scripts, docker configs,
//! kubeconfigs) can arrive from a script in several shapes: positional
//! string lines, a plain array of lines, `{path = ...}`, `{content = ...}`
//! or `{base64 = ...}`. This module classifies an argument list into either
//! a literal filesystem path or raw content bytes, with a fixed precedence,
//! so the accessors never have to sniff shapes themselves.

use base64::Engine as _;
use capstan_core::error::{PipelineError, Result};
use mlua::{Lua, MultiValue, Table, Value};

/// Resolved source for a long-form configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The caller supplied a filesystem path, used verbatim
    Path(String),
    /// The caller supplied inline content to be materialized by the owner
    Content(Vec<u8>),
}

/// Classify an accessor argument list into a content source
///
/// Returns `None` when there is nothing to update: the call had no
/// arguments (a getter), or the supplied content resolved to an empty byte
/// sequence. A non-empty argument list that matches no recognized shape is
/// an [`PipelineError::InvalidShape`] error.
///
/// Precedence, per shape:
/// 1. First argument is a string: all positional arguments are joined with
///    `\n` into content.
/// 2. First argument is a plain string array: elements joined with `\n`.
/// 3. First argument is a table: a non-empty `path` field wins over any
///    sibling `content`/`base64`; otherwise `content` is used as a string,
///    a string array, or serialized to compact JSON bytes; otherwise a
///    non-empty `base64` field is decoded.
pub fn resolve_source(lua: &Lua, args: MultiValue) -> Result<Option<Source>> {
    let args: Vec<Value> = args.into_iter().collect();

    let Some(first) = args.first() else {
        return Ok(None);
    };

    match first {
        Value::String(_) => {
            let lines = coerce_lines(lua, args.iter())?;
            Ok(content(lines.join("\n").into_bytes()))
        }
        Value::Table(table) => resolve_table(table),
        other => Err(PipelineError::invalid_shape(format!(
            "cannot derive content from a {} argument",
            other.type_name()
        ))),
    }
}

fn resolve_table(table: &Table) -> Result<Option<Source>> {
    // plain array of lines
    if table.raw_len() > 0 {
        if let Some(lines) = string_items(table)? {
            return Ok(content(lines.join("\n").into_bytes()));
        }
        return Err(PipelineError::invalid_shape(
            "array content must contain only strings",
        ));
    }

    // path wins over any sibling content/base64 fields
    if let Some(path) = string_field(table, "path")? {
        if !path.is_empty() {
            return Ok(Some(Source::Path(path)));
        }
    }

    match table.get::<Value>("content")? {
        Value::Nil => {}
        Value::String(s) => return Ok(content(s.as_bytes().to_vec())),
        structured => {
            // a plain list of strings is joined; anything else passes
            // through as its serialized byte form
            if let Value::Table(inner) = &structured {
                if inner.raw_len() > 0 {
                    if let Some(lines) = string_items(inner)? {
                        return Ok(content(lines.join("\n").into_bytes()));
                    }
                }
            }
            let json = lua_value_to_json(&structured)?;
            let bytes = serde_json::to_vec(&json)
                .map_err(|e| PipelineError::Conversion(format!("cannot serialize content: {}", e)))?;
            return Ok(content(bytes));
        }
    }

    if let Some(encoded) = string_field(table, "base64")? {
        if !encoded.is_empty() {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| PipelineError::invalid_shape(format!("invalid base64 content: {}", e)))?;
            return Ok(content(bytes));
        }
    }

    Err(PipelineError::invalid_shape(
        "expected a string array or a table with a path, content or base64 field",
    ))
}

/// Empty content means "no update"
fn content(bytes: Vec<u8>) -> Option<Source> {
    if bytes.is_empty() {
        None
    } else {
        Some(Source::Content(bytes))
    }
}

fn string_field(table: &Table, name: &str) -> Result<Option<String>> {
    match table.get::<Value>(name)? {
        Value::String(s) => Ok(Some(s.to_str()?.to_string())),
        _ => Ok(None),
    }
}

/// Collect a table's sequence part when every element is a string
fn string_items(table: &Table) -> Result<Option<Vec<String>>> {
    let mut items = Vec::new();
    for value in table.clone().sequence_values::<Value>() {
        match value? {
            Value::String(s) => items.push(s.to_str()?.to_string()),
            _ => return Ok(None),
        }
    }
    Ok(Some(items))
}

/// Coerce an argument sequence into string lines
fn coerce_lines<'a>(lua: &Lua, values: impl Iterator<Item = &'a Value>) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for value in values {
        let coerced = lua.coerce_string(value.clone())?.ok_or_else(|| {
            PipelineError::invalid_shape(format!(
                "cannot use a {} value as a content line",
                value.type_name()
            ))
        })?;
        lines.push(coerced.to_str()?.to_string());
    }
    Ok(lines)
}

/// Convert a Lua value into a JSON value
///
/// Array-shaped tables (non-empty sequence part) become JSON arrays, every
/// other table becomes a JSON object keyed by its string (or integer) keys.
/// An empty table is an empty object.
fn lua_value_to_json(val: &Value) -> Result<serde_json::Value> {
    match val {
        Value::Nil => Ok(serde_json::Value::Null),
        Value::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        Value::Integer(i) => Ok(serde_json::Value::Number((*i).into())),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| PipelineError::invalid_shape("non-finite number in content")),
        Value::String(s) => Ok(serde_json::Value::String(s.to_str()?.to_string())),
        Value::Table(table) => {
            if table.raw_len() > 0 {
                let mut items = Vec::new();
                for item in table.clone().sequence_values::<Value>() {
                    items.push(lua_value_to_json(&item?)?);
                }
                Ok(serde_json::Value::Array(items))
            } else {
                let mut map = serde_json::Map::new();
                for pair in table.clone().pairs::<Value, Value>() {
                    let (key, value) = pair?;
                    let key = match key {
                        Value::String(s) => s.to_str()?.to_string(),
                        Value::Integer(i) => i.to_string(),
                        other => {
                            return Err(PipelineError::invalid_shape(format!(
                                "cannot use a {} key in structured content",
                                other.type_name()
                            )));
                        }
                    };
                    map.insert(key, lua_value_to_json(&value)?);
                }
                Ok(serde_json::Value::Object(map))
            }
        }
        other => Err(PipelineError::invalid_shape(format!(
            "unsupported {} value in structured content",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(lua: &Lua, expr: &str) -> Result<Option<Source>> {
        let args: MultiValue = lua.load(format!("return {}", expr)).eval().unwrap();
        resolve_source(lua, args)
    }

    fn content_of(source: Option<Source>) -> String {
        match source {
            Some(Source::Content(bytes)) => String::from_utf8(bytes).unwrap(),
            other => panic!("expected content, got {:?}", other),
        }
    }

    #[test]
    fn test_no_arguments_is_a_getter() {
        let lua = Lua::new();
        assert_eq!(resolve(&lua, "").unwrap(), None);
    }

    #[test]
    fn test_positional_strings_join() {
        let lua = Lua::new();
        assert_eq!(content_of(resolve(&lua, "'hello', 'world'").unwrap()), "hello\nworld");
        assert_eq!(content_of(resolve(&lua, "'hello world'").unwrap()), "hello world");
    }

    #[test]
    fn test_array_argument_joins() {
        let lua = Lua::new();
        assert_eq!(content_of(resolve(&lua, "{'a', 'b'}").unwrap()), "a\nb");
    }

    #[test]
    fn test_content_field_shapes() {
        let lua = Lua::new();
        assert_eq!(content_of(resolve(&lua, "{content = {'a', 'b'}}").unwrap()), "a\nb");
        assert_eq!(content_of(resolve(&lua, "{content = 'a b'}").unwrap()), "a b");
        assert_eq!(
            content_of(resolve(&lua, "{content = {hello = 'world'}}").unwrap()),
            r#"{"hello":"world"}"#
        );
    }

    #[test]
    fn test_content_array_of_non_strings_passes_through_as_json() {
        let lua = Lua::new();
        assert_eq!(content_of(resolve(&lua, "{content = {1, 2}}").unwrap()), "[1,2]");
    }

    #[test]
    fn test_empty_table_in_content_is_an_object() {
        let lua = Lua::new();
        assert_eq!(
            content_of(resolve(&lua, "{content = {auths = {}}}").unwrap()),
            r#"{"auths":{}}"#
        );
    }

    #[test]
    fn test_path_wins_over_content() {
        let lua = Lua::new();
        assert_eq!(
            resolve(&lua, "{path = 'x', content = 'ignored'}").unwrap(),
            Some(Source::Path("x".to_string()))
        );
    }

    #[test]
    fn test_base64_decodes() {
        let lua = Lua::new();
        assert_eq!(
            content_of(resolve(&lua, "{base64 = 'eyJoZWxsbyI6IndvcmxkIn0='}").unwrap()),
            r#"{"hello":"world"}"#
        );
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let lua = Lua::new();
        let err = resolve(&lua, "{base64 = '!!'}").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidShape(_)));
    }

    #[test]
    fn test_empty_content_means_no_update() {
        let lua = Lua::new();
        assert_eq!(resolve(&lua, "''").unwrap(), None);
        assert_eq!(resolve(&lua, "{content = ''}").unwrap(), None);
    }

    #[test]
    fn test_unrecognized_shapes_are_rejected() {
        let lua = Lua::new();
        assert!(matches!(
            resolve(&lua, "42").unwrap_err(),
            PipelineError::InvalidShape(_)
        ));
        assert!(matches!(
            resolve(&lua, "{}").unwrap_err(),
            PipelineError::InvalidShape(_)
        ));
    }
}

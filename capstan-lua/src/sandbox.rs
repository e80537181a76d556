//! Lua sandbox creation
//!
//! Pipeline scripts run in a restricted Lua state: they configure the
//! pipeline through the registered accessor functions and never touch the
//! filesystem, network, or process table directly. All I/O happens on the
//! host side of the bridge.

use mlua::{Lua, LuaOptions, Result as LuaResult, StdLib};

/// Create a restricted Lua state for pipeline scripts
///
/// Only basic language facilities are available (tables, strings, math,
/// coroutines). The io/os/package/debug libraries are not loaded, and the
/// code-loading globals are removed, so the only effects a script can have
/// are the ones the registered host functions provide.
pub fn create_sandbox() -> LuaResult<Lua> {
    let lua = Lua::new_with(
        StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::COROUTINE,
        LuaOptions::default(),
    )?;

    // Remove code-loading globals
    lua.globals().set("require", mlua::Nil)?;
    lua.globals().set("dofile", mlua::Nil)?;
    lua.globals().set("loadfile", mlua::Nil)?;

    Ok(lua)
}

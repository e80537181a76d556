//! Hierarchical identity descriptor

use mlua::Function;

/// Identity used for credential resolution and value deployment
///
/// `team`, `project` and `repo` form a hierarchy: each level is only
/// meaningful when its parent is non-empty. `update` holds a script
/// function captured by `useIdentity`, validated as callable at capture
/// time and invoked synchronously when identity values are deployed.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub team: String,
    pub project: String,
    pub repo: String,
    pub branch: String,
    pub file: String,
    pub update: Option<Function>,
}

//! Deployment target descriptor

use serde::{Deserialize, Serialize};

/// Kubernetes workload targeted by a deploy action
///
/// Updated partially by the script: absent fields keep their prior value,
/// an explicit `false` clears a field back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workload {
    pub namespace: String,
    pub name: String,
    pub kind: String,
    pub container: String,
    /// Whether the target container is an init container
    pub init: bool,
}

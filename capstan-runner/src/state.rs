//! Pipeline configuration state
//!
//! One record per pipeline run, created fresh at setup, mutated only by
//! accessor calls during script execution, discarded after teardown.

use capstan_core::domain::{Identity, Workload};

/// All configuration accumulated by a pipeline script
#[derive(Debug, Default)]
pub struct PipelineState {
    pub registry: String,
    pub image: String,
    pub profile: String,
    pub version: String,

    /// argv-style shell command; empty means the default `bash`
    pub shell: Vec<String>,
    pub script_path: String,

    pub docker: DockerState,
    pub kubernetes: KubernetesState,
    pub identity: Identity,
}

#[derive(Debug, Default)]
pub struct DockerState {
    pub images: Vec<String>,
    pub config_path: String,
    pub dockerfile_path: String,
    pub build_context: String,
}

#[derive(Debug, Default)]
pub struct KubernetesState {
    pub kubeconfig_path: String,
    pub workload: Workload,
}

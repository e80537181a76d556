//! Kubernetes bindings
//!
//! `useKubeconfig` materializes cluster credentials (JSON content is
//! normalized to YAML on the way to disk), `useKubernetesWorkload`
//! maintains the deploy target descriptor with partial updates, and
//! `deployKubernetesWorkload` validates the accumulated state.

use std::sync::{Arc, Mutex};

use capstan_core::encoding::json_to_yaml;
use capstan_core::error::{PipelineError, Result};
use capstan_lua::long_string_accessor;
use mlua::{Error as LuaError, Lua, Result as LuaResult, Table};
use tracing::info;

use crate::bindings::fields::{load_bool_field, load_string_field};
use crate::state::PipelineState;
use crate::temp::TempResources;

pub fn register(
    lua: &Lua,
    state: Arc<Mutex<PipelineState>>,
    resources: Arc<TempResources>,
) -> LuaResult<()> {
    let globals = lua.globals();

    {
        let resources = resources.clone();
        globals.set(
            "useKubeconfig",
            long_string_accessor(
                lua,
                state.clone(),
                "kubeconfig",
                |s: &mut PipelineState| &mut s.kubernetes.kubeconfig_path,
                move |buf| persist_kubeconfig(&resources, buf),
            )?,
        )?;
    }

    {
        let state = state.clone();
        globals.set(
            "useKubernetesWorkload",
            lua.create_function(move |lua, options: Option<Table>| {
                if let Some(options) = &options {
                    let mut guard = state.lock().unwrap();
                    let workload = &mut guard.kubernetes.workload;
                    load_string_field(&mut workload.namespace, options, "namespace")?;
                    load_string_field(&mut workload.name, options, "name")?;
                    load_string_field(&mut workload.kind, options, "kind")?;
                    load_string_field(&mut workload.container, options, "container")?;
                    load_bool_field(&mut workload.init, options, "init")?;
                    info!(
                        "use kubernetes workload: {}/{}",
                        workload.namespace, workload.name
                    );
                }

                let workload = state.lock().unwrap().kubernetes.workload.clone();
                let result = lua.create_table()?;
                result.set("namespace", workload.namespace)?;
                result.set("name", workload.name)?;
                result.set("kind", workload.kind)?;
                result.set("container", workload.container)?;
                result.set("init", workload.init)?;
                Ok(result)
            })?,
        )?;
    }

    {
        let state = state.clone();
        globals.set(
            "deployKubernetesWorkload",
            lua.create_function(move |_, ()| {
                deploy_workload(&state).map_err(LuaError::external)
            })?,
        )?;
    }

    Ok(())
}

/// Materialize kubeconfig content
///
/// Content is trimmed; a leading `{` marks JSON, which is converted to
/// YAML, while anything else is written through unchanged.
fn persist_kubeconfig(resources: &TempResources, buf: &[u8]) -> Result<String> {
    let buf = buf.trim_ascii();
    let buf = if buf.starts_with(b"{") {
        json_to_yaml(buf)?
    } else {
        buf.to_vec()
    };
    let path = resources.create_file("kubeconfig.yaml", &buf)?;
    Ok(path.to_string_lossy().into_owned())
}

fn deploy_workload(state: &Arc<Mutex<PipelineState>>) -> Result<()> {
    let guard = state.lock().unwrap();
    let workload = &guard.kubernetes.workload;

    if guard.kubernetes.kubeconfig_path.is_empty() {
        return Err(PipelineError::missing("kubeconfig is not set"));
    }
    if workload.namespace.is_empty() || workload.name.is_empty() || workload.kind.is_empty() {
        return Err(PipelineError::missing(
            "workload namespace, name and kind must be set",
        ));
    }

    // TODO: drive the rollout through a kubectl invocation once the image
    // retag flow is settled; for now the action only validates and reports
    // the target.
    info!(
        "deploy kubernetes workload: {}/{} ({}) container={} init={}",
        workload.namespace, workload.name, workload.kind, workload.container, workload.init
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_persist_kubeconfig_normalizes_json() {
        let resources = TempResources::new();
        let path = persist_kubeconfig(&resources, br#"  {"hello":"world"}  "#).unwrap();
        assert!(path.ends_with("kubeconfig.yaml"));
        assert_eq!(fs::read(&path).unwrap(), b"hello: world\n");
        resources.release_all();
    }

    #[test]
    fn test_persist_kubeconfig_passes_yaml_through() {
        let resources = TempResources::new();
        let path = persist_kubeconfig(&resources, b"apiVersion: v1\n").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"apiVersion: v1");
        resources.release_all();
    }

    #[test]
    fn test_persist_kubeconfig_rejects_malformed_json() {
        let resources = TempResources::new();
        let err = persist_kubeconfig(&resources, b"{oops").unwrap_err();
        assert!(matches!(err, PipelineError::Conversion(_)));
        resources.release_all();
    }

    #[test]
    fn test_deploy_workload_validates_state() {
        let state = Arc::new(Mutex::new(PipelineState::default()));
        let err = deploy_workload(&state).unwrap_err();
        assert!(matches!(err, PipelineError::MissingConfig(_)));

        {
            let mut guard = state.lock().unwrap();
            guard.kubernetes.kubeconfig_path = "/tmp/kubeconfig.yaml".to_string();
            guard.kubernetes.workload.namespace = "default".to_string();
            guard.kubernetes.workload.name = "web".to_string();
            guard.kubernetes.workload.kind = "Deployment".to_string();
        }
        deploy_workload(&state).unwrap();
    }
}

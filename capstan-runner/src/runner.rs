//! Pipeline runner
//!
//! One `PipelineRunner` executes exactly one script: setup registers every
//! accessor and action into a fresh sandbox, `execute` hands the script to
//! the evaluator, and teardown releases every temporary resource no matter
//! how evaluation ended. Partial state mutations made before a failure
//! stand; there is no rollback.

use std::sync::{Arc, Mutex};

use capstan_core::error::{PipelineError, Result};
use capstan_lua::{create_sandbox, object_accessor, string_accessor};
use mlua::{Lua, Table};
use tracing::info;

use crate::bindings;
use crate::environ;
use crate::state::PipelineState;
use crate::temp::TempResources;

/// The pipeline state engine
pub struct PipelineRunner {
    lua: Lua,
    env: Table,
    build_args: Table,
    state: Arc<Mutex<PipelineState>>,
    resources: Arc<TempResources>,
    retain_resources: bool,
}

impl PipelineRunner {
    /// Create a runner with a fresh sandbox, seeded environment, and every
    /// accessor and action registered
    pub fn new() -> Result<Self> {
        let lua = create_sandbox()?;
        let env = environ::seed(&lua)?;
        let build_args = lua.create_table()?;

        let runner = Self {
            lua,
            env,
            build_args,
            state: Arc::new(Mutex::new(PipelineState::default())),
            resources: Arc::new(TempResources::new()),
            retain_resources: false,
        };
        runner.setup()?;
        Ok(runner)
    }

    fn setup(&self) -> Result<()> {
        let lua = &self.lua;
        let globals = lua.globals();

        globals.set("useEnv", object_accessor(lua, self.env.clone(), "env")?)?;

        globals.set(
            "useRegistry",
            string_accessor(lua, self.state.clone(), "registry", |s: &mut PipelineState| {
                &mut s.registry
            })?,
        )?;
        globals.set(
            "useImage",
            string_accessor(lua, self.state.clone(), "image", |s: &mut PipelineState| {
                &mut s.image
            })?,
        )?;
        globals.set(
            "useProfile",
            string_accessor(lua, self.state.clone(), "profile", |s: &mut PipelineState| {
                &mut s.profile
            })?,
        )?;
        globals.set(
            "useVersion",
            string_accessor(lua, self.state.clone(), "version", |s: &mut PipelineState| {
                &mut s.version
            })?,
        )?;

        bindings::script::register(
            lua,
            self.state.clone(),
            self.env.clone(),
            self.resources.clone(),
        )?;
        bindings::docker::register(
            lua,
            self.state.clone(),
            self.env.clone(),
            self.build_args.clone(),
            self.resources.clone(),
        )?;
        bindings::kubernetes::register(lua, self.state.clone(), self.resources.clone())?;
        bindings::identity::register(lua, self.state.clone(), self.env.clone())?;

        Ok(())
    }

    /// Keep temporary directories on disk after the run, for inspection
    pub fn retain_resources(&mut self, retain: bool) {
        self.retain_resources = retain;
    }

    /// Evaluate one pipeline script
    ///
    /// Teardown always runs afterwards, whether the script succeeded,
    /// raised, or a host function failed.
    pub fn execute(&mut self, source: &str) -> Result<()> {
        info!("executing pipeline script");
        let result = self.lua.load(source).exec();
        self.teardown();
        result.map_err(PipelineError::from)
    }

    fn teardown(&self) {
        if self.retain_resources {
            self.resources.detach_all();
        } else {
            self.resources.release_all();
        }
    }

    /// The underlying Lua state, mainly for inspection in tests
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// The script-visible environment table
    pub fn env(&self) -> &Table {
        &self.env
    }

    /// Shared handle to the pipeline state record
    pub fn state(&self) -> Arc<Mutex<PipelineState>> {
        self.state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    /// Run a script with retained resources and return the runner for
    /// inspection
    fn runner_for_test(script: &str) -> PipelineRunner {
        let mut runner = PipelineRunner::new().unwrap();
        runner.retain_resources(true);
        runner.execute(script).unwrap();
        runner
    }

    /// Remove the scratch directory holding a retained artifact
    fn remove_artifact(path: &str) {
        if let Some(dir) = Path::new(path).parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_runner_env() {
        let runner = runner_for_test(
            r#"
            useEnv('hello', 'world')
            useEnv().hello = 'World'
            useEnv('hello', useEnv('hello') .. '!')
            "#,
        );
        assert_eq!(runner.env().get::<String>("hello").unwrap(), "World!");
    }

    #[test]
    fn test_runner_env_is_seeded() {
        let runner = runner_for_test(
            r#"
            if useEnv('PATH') == nil then
                error('expected PATH to be seeded')
            end
            "#,
        );
        drop(runner);
    }

    #[test]
    fn test_runner_scalar_accessors() {
        let runner = runner_for_test(
            r#"
            useRegistry('hello'); useRegistry(useRegistry() .. '!')
            useImage('img'); useProfile('dev'); useVersion('7')
            "#,
        );
        let state = runner.state();
        let guard = state.lock().unwrap();
        assert_eq!(guard.registry, "hello!");
        assert_eq!(guard.image, "img");
        assert_eq!(guard.profile, "dev");
        assert_eq!(guard.version, "7");
    }

    #[test]
    fn test_runner_getter_never_mutates() {
        let runner = runner_for_test("useRegistry('x'); useRegistry(); useRegistry()");
        assert_eq!(runner.state().lock().unwrap().registry, "x");
    }

    #[test]
    fn test_runner_docker_config_passthrough() {
        let runner = runner_for_test("useDockerConfig({content = {auths = {}}})");
        let path = runner.state().lock().unwrap().docker.config_path.clone();
        assert!(path.ends_with("config.json"));
        assert_eq!(fs::read(&path).unwrap(), br#"{"auths":{}}"#);
        remove_artifact(&path);
    }

    #[test]
    fn test_runner_kubeconfig_normalization() {
        let runner = runner_for_test("useKubeconfig({content = {hello = 'world'}})");
        let path = runner
            .state()
            .lock()
            .unwrap()
            .kubernetes
            .kubeconfig_path
            .clone();
        assert_eq!(fs::read(&path).unwrap(), b"hello: world\n");
        remove_artifact(&path);
    }

    #[test]
    fn test_runner_script_execution() {
        let runner = runner_for_test(
            r#"
            useShell('sh')
            useScript(
                'echo hello',
                'echo world'
            )
            runScript()
            "#,
        );
        let path = runner.state().lock().unwrap().script_path.clone();
        assert_eq!(fs::read(&path).unwrap(), b"echo hello\necho world");
        remove_artifact(&path);
    }

    #[test]
    fn test_runner_script_failure_surfaces_exit_code() {
        let mut runner = PipelineRunner::new().unwrap();
        let err = runner
            .execute("useShell('sh'); useScript('exit 3'); runScript()")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Script(_)));
        assert!(err.to_string().contains("exited with code 3"));
    }

    #[test]
    fn test_runner_workload_partial_update() {
        let runner = runner_for_test(
            r#"
            useKubernetesWorkload({namespace = 'hello'})
            useKubernetesWorkload({name = 'world'})
            useKubernetesWorkload({container = 'nginx'})
            useKubernetesWorkload({kind = 'Deployment'})
            useKubernetesWorkload({container = false})
            useKubernetesWorkload({init = 1})
            "#,
        );
        let state = runner.state();
        let guard = state.lock().unwrap();
        let workload = &guard.kubernetes.workload;
        assert_eq!(workload.namespace, "hello");
        assert_eq!(workload.name, "world");
        assert_eq!(workload.container, "");
        assert_eq!(workload.kind, "Deployment");
        assert!(workload.init);
    }

    #[test]
    fn test_runner_identity_credentials() {
        let runner = runner_for_test(
            r#"
            useEnv('CODING_TEAMX_USERNAME', 'hello')
            useEnv('CODING_TEAMX_PASSWORD', 'foo')
            useEnv('CODING_TEAMX_PROJECTY_PASSWORD', 'world')
            useIdentity({
                team = 'teamx',
                project = 'projecty',
                update = function(values)
                    resolved_username = values.username
                    resolved_password = values.password
                end,
            })
            deployIdentityValues()
            "#,
        );
        let globals = runner.lua().globals();
        assert_eq!(globals.get::<String>("resolved_username").unwrap(), "hello");
        assert_eq!(globals.get::<String>("resolved_password").unwrap(), "world");
    }

    #[test]
    fn test_runner_shell_clear() {
        let runner = runner_for_test("useShell('sh', '-e'); useShell(nil)");
        assert!(runner.state().lock().unwrap().shell.is_empty());
    }

    #[test]
    fn test_teardown_runs_after_script_error() {
        let mut runner = PipelineRunner::new().unwrap();
        let err = runner
            .execute("useScript('echo hi')\nerror('boom')")
            .unwrap_err();
        assert!(matches!(err, PipelineError::Script(_)));

        let path = runner.state().lock().unwrap().script_path.clone();
        assert!(!path.is_empty());
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn test_pipeline_fixtures() {
        let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/pipelines");
        for entry in fs::read_dir(fixtures).unwrap() {
            let path = entry.unwrap().path();
            let script = fs::read_to_string(&path).unwrap();
            let mut runner = PipelineRunner::new().unwrap();
            runner
                .execute(&script)
                .unwrap_or_else(|e| panic!("{} failed: {}", path.display(), e));
        }
    }

    #[test]
    fn test_retained_resources_survive_teardown() {
        let runner = runner_for_test("useScript('echo hi')");
        let path = runner.state().lock().unwrap().script_path.clone();
        assert!(Path::new(&path).exists());
        remove_artifact(&path);
    }
}

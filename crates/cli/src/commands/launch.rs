//! Bootstraps the bundled Python application: find an interpreter, provision
//! the virtual environment once, install the declared dependencies, and run
//! the entry file, forwarding its exit status.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use geniebot_core::config::{AppConfig, LauncherConfig, LoadOptions};

use super::CommandResult;

/// A single child process the launcher intends to run. The environment pairs
/// are applied on top of the inherited environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, OsString)>,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Locate a program on the execution path.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    fn dir_exists(&self, path: &Path) -> bool;

    /// Run the process to completion with inherited stdio and return its
    /// exit code.
    async fn run(&self, invocation: &Invocation) -> io::Result<i32>;
}

pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    async fn run(&self, invocation: &Invocation) -> io::Result<i32> {
        let mut command = tokio::process::Command::new(&invocation.program);
        command.args(&invocation.args);
        for (key, value) in &invocation.env {
            command.env(key, value);
        }

        let status = command.status().await?;
        Ok(status.code().unwrap_or(1))
    }
}

/// The step at which the launch run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchStage {
    CreateEnvironment,
    InstallDependencies,
    RunApplication,
}

impl LaunchStage {
    fn describe(self) -> &'static str {
        match self {
            Self::CreateEnvironment => "virtual environment creation",
            Self::InstallDependencies => "dependency installation",
            Self::RunApplication => "application run",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LaunchReport {
    pub stage: LaunchStage,
    pub exit_code: i32,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Python interpreter `{python_bin}` was not found on the path. Please install Python 3 and try again")]
    MissingInterpreter { python_bin: String },
    #[error("could not run {}: {source}", .stage.describe())]
    Process { stage: LaunchStage, source: io::Error },
}

/// Runs the bootstrap sequence. Setup failures and the application's own exit
/// code both surface as a [`LaunchReport`] so the caller can forward the code.
pub async fn launch<R: ProcessRunner>(
    config: &LauncherConfig,
    runner: &R,
) -> Result<LaunchReport, LaunchError> {
    let interpreter = runner.locate(&config.python_bin).ok_or_else(|| {
        LaunchError::MissingInterpreter { python_bin: config.python_bin.clone() }
    })?;

    if !runner.dir_exists(&config.venv_dir) {
        let create = Invocation {
            program: interpreter,
            args: vec![
                "-m".to_string(),
                "venv".to_string(),
                config.venv_dir.display().to_string(),
            ],
            env: Vec::new(),
        };
        let code = run_step(runner, &create, LaunchStage::CreateEnvironment).await?;
        if code != 0 {
            return Ok(LaunchReport { stage: LaunchStage::CreateEnvironment, exit_code: code });
        }
    }

    let activation_env = activation_env(&config.venv_dir);

    let install = Invocation {
        program: venv_program(&config.venv_dir, "pip"),
        args: vec![
            "install".to_string(),
            "-r".to_string(),
            config.requirements.display().to_string(),
        ],
        env: activation_env.clone(),
    };
    let code = run_step(runner, &install, LaunchStage::InstallDependencies).await?;
    if code != 0 {
        return Ok(LaunchReport { stage: LaunchStage::InstallDependencies, exit_code: code });
    }

    let run = Invocation {
        program: venv_program(&config.venv_dir, "python"),
        args: vec![config.entry.display().to_string()],
        env: activation_env,
    };
    let code = run_step(runner, &run, LaunchStage::RunApplication).await?;
    Ok(LaunchReport { stage: LaunchStage::RunApplication, exit_code: code })
}

async fn run_step<R: ProcessRunner>(
    runner: &R,
    invocation: &Invocation,
    stage: LaunchStage,
) -> Result<i32, LaunchError> {
    runner.run(invocation).await.map_err(|source| LaunchError::Process { stage, source })
}

fn venv_bin_dir(venv_dir: &Path) -> PathBuf {
    let bin = if cfg!(windows) { "Scripts" } else { "bin" };
    venv_dir.join(bin)
}

fn venv_program(venv_dir: &Path, name: &str) -> PathBuf {
    let file = if cfg!(windows) { format!("{name}.exe") } else { name.to_string() };
    venv_bin_dir(venv_dir).join(file)
}

/// Mirrors what sourcing the environment's activate script would export.
fn activation_env(venv_dir: &Path) -> Vec<(String, OsString)> {
    let mut vars = vec![("VIRTUAL_ENV".to_string(), venv_dir.as_os_str().to_os_string())];

    let mut paths = vec![venv_bin_dir(venv_dir)];
    if let Some(existing) = env::var_os("PATH") {
        paths.extend(env::split_paths(&existing));
    }
    if let Ok(joined) = env::join_paths(paths) {
        vars.push(("PATH".to_string(), joined));
    }

    vars
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("launch", "config_validation", error.to_string(), 2);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "launch",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    match runtime.block_on(launch(&config.launcher, &TokioProcessRunner)) {
        Ok(report) if report.exit_code == 0 => {
            CommandResult::success("launch", "application exited cleanly")
        }
        Ok(report) => {
            let error_class = match report.stage {
                LaunchStage::RunApplication => "application_exit",
                _ => "environment_setup",
            };
            CommandResult::failure(
                "launch",
                error_class,
                format!("{} exited with code {}", report.stage.describe(), report.exit_code),
                forward_code(report.exit_code),
            )
        }
        Err(error @ LaunchError::MissingInterpreter { .. }) => {
            CommandResult::failure("launch", "missing_interpreter", error.to_string(), 1)
        }
        Err(error) => CommandResult::failure("launch", "process_spawn", error.to_string(), 1),
    }
}

fn forward_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use geniebot_core::config::LauncherConfig;

    use super::{launch, Invocation, LaunchError, LaunchStage, ProcessRunner};

    struct ScriptedRunner {
        interpreter: Option<PathBuf>,
        existing_dirs: Vec<PathBuf>,
        codes: Mutex<VecDeque<io::Result<i32>>>,
        calls: Mutex<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        fn new(interpreter: Option<&str>, codes: Vec<io::Result<i32>>) -> Self {
            Self {
                interpreter: interpreter.map(PathBuf::from),
                existing_dirs: Vec::new(),
                codes: Mutex::new(codes.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn with_existing_dir(mut self, dir: &str) -> Self {
            self.existing_dirs.push(PathBuf::from(dir));
            self
        }

        fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        fn locate(&self, _program: &str) -> Option<PathBuf> {
            self.interpreter.clone()
        }

        fn dir_exists(&self, path: &Path) -> bool {
            self.existing_dirs.iter().any(|dir| dir == path)
        }

        async fn run(&self, invocation: &Invocation) -> io::Result<i32> {
            self.calls.lock().unwrap().push(invocation.clone());
            self.codes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::other("unscripted invocation")))
        }
    }

    fn launcher_config() -> LauncherConfig {
        LauncherConfig {
            python_bin: "python3".to_string(),
            venv_dir: PathBuf::from("venv"),
            requirements: PathBuf::from("requirements.txt"),
            entry: PathBuf::from("app.py"),
        }
    }

    #[tokio::test]
    async fn missing_interpreter_aborts_before_any_process_runs() {
        let runner = ScriptedRunner::new(None, vec![]);

        let error = launch(&launcher_config(), &runner).await.unwrap_err();

        assert!(matches!(error, LaunchError::MissingInterpreter { ref python_bin } if python_bin == "python3"));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn first_run_creates_the_environment_before_installing() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(0), Ok(0), Ok(0)]);

        let report = launch(&launcher_config(), &runner).await.unwrap();
        assert_eq!(report.stage, LaunchStage::RunApplication);
        assert_eq!(report.exit_code, 0);

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].program, PathBuf::from("/usr/bin/python3"));
        assert_eq!(calls[0].args, vec!["-m", "venv", "venv"]);
        assert_eq!(calls[1].args, vec!["install", "-r", "requirements.txt"]);
        assert_eq!(calls[2].args, vec!["app.py"]);
    }

    #[tokio::test]
    async fn existing_environment_is_not_recreated() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(0), Ok(0)])
            .with_existing_dir("venv");

        let report = launch(&launcher_config(), &runner).await.unwrap();
        assert_eq!(report.exit_code, 0);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].program.ends_with("pip"));
        assert!(calls[1].program.ends_with("python"));
    }

    #[tokio::test]
    async fn environment_creation_failure_stops_the_sequence() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(7)]);

        let report = launch(&launcher_config(), &runner).await.unwrap();

        assert_eq!(report.stage, LaunchStage::CreateEnvironment);
        assert_eq!(report.exit_code, 7);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn install_failure_is_forwarded_and_the_app_never_starts() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(2)])
            .with_existing_dir("venv");

        let report = launch(&launcher_config(), &runner).await.unwrap();

        assert_eq!(report.stage, LaunchStage::InstallDependencies);
        assert_eq!(report.exit_code, 2);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn application_exit_code_is_forwarded() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(0), Ok(3)])
            .with_existing_dir("venv");

        let report = launch(&launcher_config(), &runner).await.unwrap();

        assert_eq!(report.stage, LaunchStage::RunApplication);
        assert_eq!(report.exit_code, 3);
    }

    #[tokio::test]
    async fn child_processes_see_the_activated_environment() {
        let runner = ScriptedRunner::new(Some("/usr/bin/python3"), vec![Ok(0), Ok(0)])
            .with_existing_dir("venv");

        launch(&launcher_config(), &runner).await.unwrap();

        for call in runner.calls() {
            let virtual_env = call
                .env
                .iter()
                .find(|(key, _)| key == "VIRTUAL_ENV")
                .map(|(_, value)| value.clone());
            assert_eq!(virtual_env, Some("venv".into()));

            let path = call
                .env
                .iter()
                .find(|(key, _)| key == "PATH")
                .map(|(_, value)| value.clone())
                .unwrap();
            let first = std::env::split_paths(&path).next().unwrap();
            assert!(first.ends_with(if cfg!(windows) { "Scripts" } else { "bin" }));
        }
    }

    #[tokio::test]
    async fn spawn_errors_name_the_failing_stage() {
        let runner = ScriptedRunner::new(
            Some("/usr/bin/python3"),
            vec![Err(io::Error::other("spawn failed"))],
        )
        .with_existing_dir("venv");

        let error = launch(&launcher_config(), &runner).await.unwrap_err();

        match error {
            LaunchError::Process { stage, .. } => {
                assert_eq!(stage, LaunchStage::InstallDependencies);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

//! Self-rebuilding recipes.
//!
//! A recipe program calls [`SelfRebuild::run`] first thing in `main`. When
//! its source (or any extra input such as a shared header) is newer than the
//! running executable, it recompiles itself, runs the fresh binary with the
//! same arguments and tells the caller to exit with that binary's status.

use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::command::Cmd;
use crate::config::{resolve_compiler, resolve_rebuild_flags};
use crate::process::{self, OutputMode};
use crate::staleness;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bootstrap {
    /// The executable is current; carry on.
    Continue,
    /// Terminate with this exit code (compile failure or relaunched child's status).
    Exit(i32),
}

/// Launches the compiler and the rebuilt executable.
pub trait Launcher {
    fn compile(&self, argv: &[String]) -> impl Future<Output = i32> + Send;

    /// Hands control to the fresh executable and reports its exit code.
    /// Arguments are forwarded byte for byte, so they need not be UTF-8.
    fn relaunch(&self, argv: &[OsString]) -> impl Future<Output = i32> + Send;
}

/// Runs both steps as child processes with inherited standard streams.
///
/// Relaunching spawns the new binary and waits for it rather than replacing
/// the process image, which keeps one code path for every platform and lets
/// the parent forward the child's exit code.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    async fn compile(&self, argv: &[String]) -> i32 {
        process::run(argv, OutputMode::Inherit).await.exit_code
    }

    async fn relaunch(&self, argv: &[OsString]) -> i32 {
        process::run(argv, OutputMode::Inherit).await.exit_code
    }
}

#[derive(Debug, Clone)]
pub struct SelfRebuild {
    source: PathBuf,
    executable: PathBuf,
    extra_inputs: Vec<PathBuf>,
    compiler: String,
    flags: Vec<String>,
    args: Vec<OsString>,
}

impl SelfRebuild {
    pub fn new<I, S>(source: impl Into<PathBuf>, executable: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            source: source.into(),
            executable: executable.into(),
            extra_inputs: Vec::new(),
            compiler: resolve_compiler(),
            flags: resolve_rebuild_flags(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Uses the running executable's path and this process's arguments.
    pub fn from_env(source: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let executable =
            std::env::current_exe().context("Failed to locate the running executable")?;
        Ok(Self::new(source, executable, std::env::args_os().skip(1)))
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.extra_inputs.push(input.into());
        self
    }

    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    pub fn with_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn is_stale(&self) -> bool {
        let mut inputs: Vec<&Path> = vec![self.source.as_path()];
        inputs.extend(self.extra_inputs.iter().map(PathBuf::as_path));
        staleness::needs_rebuild(&self.executable, &inputs)
    }

    pub fn compile_command(&self) -> Cmd {
        Cmd::new(self.compiler.as_str())
            .args(self.flags.iter().cloned())
            .arg("-o")
            .path(&self.executable)
            .path(&self.source)
    }

    pub fn relaunch_command(&self) -> Vec<OsString> {
        std::iter::once(self.executable.clone().into_os_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub async fn run<L: Launcher>(&self, launcher: &L) -> Bootstrap {
        if !self.is_stale() {
            return Bootstrap::Continue;
        }

        let code = launcher.compile(&self.compile_command().into_argv()).await;
        if code != 0 {
            return Bootstrap::Exit(code);
        }

        Bootstrap::Exit(launcher.relaunch(&self.relaunch_command()).await)
    }
}

/// Rebuilds and relaunches the running recipe when `source` changed, exiting
/// the process afterwards. Returns only when the executable is current.
pub async fn rebuild_self_if_stale(source: impl Into<PathBuf>) -> anyhow::Result<()> {
    let rebuild = SelfRebuild::from_env(source)?;
    if let Bootstrap::Exit(code) = rebuild.run(&ProcessLauncher).await {
        std::process::exit(code);
    }
    Ok(())
}

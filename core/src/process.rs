use std::ffi::OsStr;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;

use tokio::process::Command;

/// Reported when a child did not exit normally (killed by a signal).
pub const ABNORMAL_EXIT: i32 = -1;

/// Reported when the child could not be started at all.
pub const SPAWN_FAILURE: i32 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Child shares our stdin, stdout and stderr.
    Inherit,
    /// Child stdout is collected into [`ExecutionResult::stdout`].
    Capture,
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub duration: f64,
    pub stdout: String,
    pub exit_code: i32,
    pub failure_reason: Option<String>,
}

impl ExecutionResult {
    fn spawn_failed(reason: String, duration: f64) -> Self {
        Self {
            success: false,
            duration,
            stdout: String::new(),
            exit_code: SPAWN_FAILURE,
            failure_reason: Some(reason),
        }
    }
}

/// Runs `argv[0]` with the remaining arguments, no shell involved.
///
/// Never fails: spawn errors come back as [`SPAWN_FAILURE`] with a reason.
pub async fn run<S: AsRef<OsStr>>(argv: &[S], mode: OutputMode) -> ExecutionResult {
    let start = Instant::now();

    let Some((program, args)) = argv.split_first() else {
        return ExecutionResult::spawn_failed("Empty command".to_string(), 0.0);
    };

    let program = program.as_ref();
    let mut command = Command::new(program);
    command.args(args);

    let (status, stdout) = match mode {
        OutputMode::Inherit => match command.status().await {
            Ok(status) => (status, String::new()),
            Err(err) => {
                return ExecutionResult::spawn_failed(
                    format!("Failed to spawn command {}: {}", program.to_string_lossy(), err),
                    start.elapsed().as_secs_f64(),
                )
            }
        },
        OutputMode::Capture => {
            command.stdout(Stdio::piped()).stderr(Stdio::inherit());
            match command.output().await {
                Ok(output) => (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                ),
                Err(err) => {
                    return ExecutionResult::spawn_failed(
                        format!("Failed to spawn command {}: {}", program.to_string_lossy(), err),
                        start.elapsed().as_secs_f64(),
                    )
                }
            }
        }
    };

    let (exit_code, failure_reason) = describe_status(status);

    ExecutionResult {
        success: status.success(),
        duration: start.elapsed().as_secs_f64(),
        stdout,
        exit_code,
        failure_reason,
    }
}

fn describe_status(status: ExitStatus) -> (i32, Option<String>) {
    match status.code() {
        Some(0) => (0, None),
        Some(code) => (code, Some(format!("Exit code {}", code))),
        None => (ABNORMAL_EXIT, Some(abnormal_reason(status))),
    }
}

#[cfg(unix)]
fn abnormal_reason(status: ExitStatus) -> String {
    use nix::sys::signal::Signal;
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => match Signal::try_from(signal) {
            Ok(name) => format!("Signal {} ({})", signal, name),
            Err(_) => format!("Signal {}", signal),
        },
        None => "Abnormal termination".to_string(),
    }
}

#[cfg(not(unix))]
fn abnormal_reason(_status: ExitStatus) -> String {
    "Abnormal termination".to_string()
}

//! External command execution for gates, with timeout and output capture.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

/// Placeholder substituted with the plugin directory in command arguments.
pub const PLUGIN_PATH_PLACEHOLDER: &str = "{plugin_path}";

/// Errors from running an external gate command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No program was configured.
    #[error("no command configured")]
    Empty,

    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time.
    #[error("'{program}' timed out after {seconds} seconds")]
    Timeout {
        /// Program name.
        program: String,
        /// The exceeded budget.
        seconds: u64,
    },
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock duration.
    pub duration: Duration,
}

/// Substitutes `{plugin_path}` in every argument.
pub fn substitute_args(args: &[String], plugin_path: &Path) -> Vec<String> {
    let path = plugin_path.to_string_lossy();
    args.iter()
        .map(|arg| arg.replace(PLUGIN_PATH_PLACEHOLDER, &path))
        .collect()
}

/// Runs `argv` to completion, killing it if `timeout` elapses.
pub async fn run_command(
    argv: &[String],
    working_dir: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;
    let start = Instant::now();

    tracing::debug!(program = %program, args = ?args, "Running gate command");

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = working_dir {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| CommandError::Spawn {
            program: program.clone(),
            source,
        })?,
        Err(_) => {
            return Err(CommandError::Timeout {
                program: program.clone(),
                seconds: timeout.as_secs(),
            });
        }
    };

    Ok(CommandOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration: start.elapsed(),
    })
}

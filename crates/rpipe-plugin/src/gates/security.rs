//! Security-scan gate and the quality-scan interface it consumes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::command::{CommandError, run_command, substitute_args};
use super::report::GateOutcome;

/// Findings reported by a static-analysis tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanFindings {
    /// Number of findings.
    pub count: u64,
}

/// Reasons a scan produced no usable finding count.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The tool could not be run.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The tool ran but reported an internal failure.
    #[error("scanner exited with {code}: {stderr}")]
    ToolFailed {
        /// Exit code, or `-1` when killed by a signal.
        code: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// The tool's output could not be interpreted.
    #[error("unparsable scanner output: {0}")]
    UnparsableOutput(String),
}

/// External static-analysis capability.
#[async_trait]
pub trait SecurityScanner: Send + Sync + std::fmt::Debug {
    /// Scans the plugin directory and returns the finding count.
    async fn scan(&self, plugin_path: &Path) -> Result<ScanFindings, ScanError>;
}

/// Scanner that runs a command emitting a JSON findings report on stdout.
///
/// Exit code 0 means clean and 1 means findings were reported (the
/// convention used by bandit and most linters); anything else is a tool
/// failure.
#[derive(Debug, Clone)]
pub struct CommandScanner {
    argv: Vec<String>,
    findings_pointer: String,
    timeout: Duration,
}

impl CommandScanner {
    /// Creates a scanner. `{plugin_path}` in `argv` is substituted per scan.
    pub fn new(argv: Vec<String>, findings_pointer: &str, timeout: Duration) -> Self {
        Self {
            argv,
            findings_pointer: findings_pointer.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl SecurityScanner for CommandScanner {
    async fn scan(&self, plugin_path: &Path) -> Result<ScanFindings, ScanError> {
        let argv = substitute_args(&self.argv, plugin_path);
        let output = run_command(&argv, None, self.timeout).await?;

        let code = output.exit_code.unwrap_or(-1);
        if code != 0 && code != 1 {
            return Err(ScanError::ToolFailed {
                code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if output.stdout.trim().is_empty() {
            return if code == 0 {
                Ok(ScanFindings { count: 0 })
            } else {
                Err(ScanError::UnparsableOutput(
                    "scanner reported findings but printed no report".to_string(),
                ))
            };
        }

        let doc: Value = serde_json::from_str(&output.stdout)
            .map_err(|e| ScanError::UnparsableOutput(e.to_string()))?;
        let count = match doc.pointer(&self.findings_pointer) {
            Some(Value::Array(items)) => items.len() as u64,
            Some(Value::Number(n)) => n.as_u64().ok_or_else(|| {
                ScanError::UnparsableOutput(format!("finding count '{n}' is not a whole number"))
            })?,
            _ => {
                return Err(ScanError::UnparsableOutput(format!(
                    "no findings at '{}'",
                    self.findings_pointer
                )));
            }
        };

        Ok(ScanFindings { count })
    }
}

/// Passes iff the scanner ran and reported zero findings.
#[derive(Debug, Clone)]
pub struct SecurityScanGate {
    scanner: Arc<dyn SecurityScanner>,
}

impl SecurityScanGate {
    /// Creates a gate backed by `scanner`.
    pub fn new(scanner: Arc<dyn SecurityScanner>) -> Self {
        Self { scanner }
    }

    /// Runs the check.
    pub async fn check(&self, plugin_path: &Path) -> GateOutcome {
        match self.scanner.scan(plugin_path).await {
            Ok(findings) if findings.count == 0 => GateOutcome::pass("No security issues found"),
            Ok(findings) => GateOutcome::fail(format!("Found {} security issues", findings.count)),
            Err(e) => GateOutcome::fail(format!("Security scan could not run: {e}")),
        }
    }
}

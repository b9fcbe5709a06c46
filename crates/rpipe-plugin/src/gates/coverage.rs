//! Minimum test-coverage gate.
//!
//! Optionally runs a coverage command inside the plugin directory, then reads
//! the JSON report it produced and compares the total percentage against the
//! configured threshold.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use super::command::{run_command, substitute_args};
use super::report::GateOutcome;

/// Default minimum coverage percentage.
pub const DEFAULT_MINIMUM_COVERAGE: f64 = 80.0;

/// Coverage gate settings.
#[derive(Debug, Clone)]
pub struct CoverageGate {
    /// Minimum total coverage percentage.
    pub minimum: f64,
    /// Command producing the report; skipped when empty.
    pub command: Vec<String>,
    /// Report path relative to the plugin directory.
    pub report: String,
    /// JSON pointer to the total percentage.
    pub pointer: String,
    /// Budget for the coverage command.
    pub timeout: Duration,
}

impl Default for CoverageGate {
    fn default() -> Self {
        Self {
            minimum: DEFAULT_MINIMUM_COVERAGE,
            command: Vec::new(),
            report: "coverage.json".to_string(),
            pointer: "/totals/percent_covered".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl CoverageGate {
    /// Creates a gate with a custom threshold and default report location.
    pub fn with_minimum(minimum: f64) -> Self {
        Self {
            minimum,
            ..Self::default()
        }
    }

    /// Runs the check.
    pub async fn check(&self, plugin_path: &Path) -> GateOutcome {
        if !self.command.is_empty() {
            let argv = substitute_args(&self.command, plugin_path);
            match run_command(&argv, Some(plugin_path), self.timeout).await {
                Ok(output) if output.success => {}
                Ok(output) => {
                    return GateOutcome::fail(format!(
                        "Coverage command exited with {}: {}",
                        output
                            .exit_code
                            .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                        output.stderr.trim()
                    ));
                }
                Err(e) => return GateOutcome::fail(format!("Coverage command failed: {e}")),
            }
        }

        let report_path = plugin_path.join(&self.report);
        let raw = match tokio::fs::read_to_string(&report_path).await {
            Ok(raw) => raw,
            Err(e) => {
                return GateOutcome::fail(format!(
                    "Cannot read coverage report '{}': {e}",
                    report_path.display()
                ));
            }
        };

        let total = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|doc| doc.pointer(&self.pointer).and_then(Value::as_f64));
        let Some(total) = total else {
            return GateOutcome::fail(format!(
                "Coverage report '{}' has no numeric value at '{}'",
                report_path.display(),
                self.pointer
            ));
        };

        if total >= self.minimum {
            GateOutcome::pass(format!("Coverage: {total:.1}%"))
        } else {
            GateOutcome::fail(format!("Coverage {total:.1}% < {}%", self.minimum))
        }
    }
}

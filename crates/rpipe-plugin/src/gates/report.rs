//! Gate reports and the admission ticket they authorize.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rpipe_core::error::AppError;

use crate::contract::PluginSpec;
use crate::registry::RegisteredPlugin;
use crate::traits::PluginHandler;

/// Outcome of a single gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    /// Whether the check passed.
    pub passed: bool,
    /// Explanation shown to the submitter.
    pub message: String,
}

impl GateOutcome {
    /// A passing outcome.
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    /// A failing outcome.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }
}

/// One row of a gate report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResult {
    /// Name of the gate.
    pub gate_name: String,
    /// Whether it passed.
    pub passed: bool,
    /// Explanation.
    pub message: String,
}

/// Result of running every configured gate against one plugin directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateReport {
    /// The plugin directory that was checked.
    pub plugin_path: PathBuf,
    /// Per-gate results, in execution order.
    pub results: Vec<GateResult>,
    /// True iff every result passed.
    pub all_passed: bool,
}

impl GateReport {
    /// Builds a report, deriving `all_passed` from the results.
    pub fn new(plugin_path: &Path, results: Vec<GateResult>) -> Self {
        let all_passed = results.iter().all(|r| r.passed);
        Self {
            plugin_path: plugin_path.to_path_buf(),
            results,
            all_passed,
        }
    }

    /// The failing rows.
    pub fn failures(&self) -> Vec<&GateResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }

    /// Converts a passing report into an admission ticket for `spec`.
    ///
    /// The ticket is the only way to call
    /// [`PluginRegistry::admit`](crate::registry::PluginRegistry::admit).
    pub fn authorize(
        &self,
        spec: PluginSpec,
        handler: Arc<dyn PluginHandler>,
    ) -> Result<Admission, GateFailure> {
        let failed: Vec<GateResult> = self.failures().into_iter().cloned().collect();
        if !failed.is_empty() {
            return Err(GateFailure {
                plugin_name: spec.name,
                failed,
            });
        }

        Ok(Admission {
            plugin: RegisteredPlugin {
                spec: Arc::new(spec),
                handler,
            },
        })
    }
}

/// Gate checks that blocked admission.
#[derive(Debug, Clone, Error)]
#[error("plugin '{plugin_name}' failed {} quality gate(s): {}", .failed.len(), summarize(.failed))]
pub struct GateFailure {
    /// The rejected plugin.
    pub plugin_name: String,
    /// The failing rows.
    pub failed: Vec<GateResult>,
}

fn summarize(failed: &[GateResult]) -> String {
    failed
        .iter()
        .map(|r| format!("{} ({})", r.gate_name, r.message))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<GateFailure> for AppError {
    fn from(err: GateFailure) -> Self {
        AppError::validation(err.to_string())
    }
}

/// Proof that a contract passed every quality gate.
#[derive(Debug, Clone)]
pub struct Admission {
    plugin: RegisteredPlugin,
}

impl Admission {
    /// The contract being admitted.
    pub fn spec(&self) -> &PluginSpec {
        &self.plugin.spec
    }

    pub(crate) fn into_plugin(self) -> RegisteredPlugin {
        self.plugin
    }
}

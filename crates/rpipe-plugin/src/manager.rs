//! Plugin manager: the admission path: submit, gate, bind, admit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use rpipe_core::error::AppError;
use rpipe_core::result::AppResult;

use crate::catalog::EntryPointCatalog;
use crate::contract::{ContractError, PluginSpec};
use crate::gates::engine::QualityGateEngine;
use crate::gates::report::GateReport;
use crate::registry::{AdmitOutcome, PluginRegistry};

/// Result of submitting one plugin directory.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    /// Contract name, or the directory name when the contract is unreadable.
    pub plugin_name: String,
    /// Full gate report.
    pub report: GateReport,
    /// Whether the plugin is now registered.
    pub admitted: bool,
    /// Why the plugin was not admitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A gated but not yet admitted submission.
#[derive(Debug)]
pub(crate) struct Candidate {
    plugin_path: PathBuf,
    spec: Result<PluginSpec, ContractError>,
    report: GateReport,
}

/// Drives plugin admission.
#[derive(Debug)]
pub struct PluginManager {
    registry: Arc<PluginRegistry>,
    engine: Arc<QualityGateEngine>,
    catalog: EntryPointCatalog,
    spec_file_name: String,
}

impl PluginManager {
    /// Creates a manager admitting into `registry`.
    pub fn new(
        registry: Arc<PluginRegistry>,
        engine: Arc<QualityGateEngine>,
        catalog: EntryPointCatalog,
        spec_file_name: &str,
    ) -> Self {
        Self {
            registry,
            engine,
            catalog,
            spec_file_name: spec_file_name.to_string(),
        }
    }

    /// The registry plugins are admitted into.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The gate engine.
    pub fn engine(&self) -> &Arc<QualityGateEngine> {
        &self.engine
    }

    /// The entry-point catalog.
    pub fn catalog(&self) -> &EntryPointCatalog {
        &self.catalog
    }

    /// Submits the plugin in `plugin_path` and admits it if every step passes.
    ///
    /// Contract errors and gate failures are reported in the outcome. Only a
    /// missing directory is an error.
    pub async fn submit_directory(&self, plugin_path: &Path) -> AppResult<SubmissionOutcome> {
        let candidate = self.evaluate(plugin_path).await?;
        Ok(self.admit_candidate(candidate).await)
    }

    /// Validates the contract and runs every gate. Does not touch the
    /// registry, so several candidates may be evaluated concurrently.
    pub(crate) async fn evaluate(&self, plugin_path: &Path) -> AppResult<Candidate> {
        if !tokio::fs::metadata(plugin_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(AppError::not_found(format!(
                "Plugin directory '{}' not found",
                plugin_path.display()
            )));
        }

        let spec_path = plugin_path.join(&self.spec_file_name);
        let spec = PluginSpec::from_path(&spec_path)
            .and_then(|spec| self.registry.submit(&spec).map(|()| spec));
        let report = self.engine.run_all(plugin_path).await;

        Ok(Candidate {
            plugin_path: plugin_path.to_path_buf(),
            spec,
            report,
        })
    }

    /// Binds the entry point and admits a passing candidate.
    pub(crate) async fn admit_candidate(&self, candidate: Candidate) -> SubmissionOutcome {
        let Candidate {
            plugin_path,
            spec,
            report,
        } = candidate;

        let spec = match spec {
            Ok(spec) => spec,
            Err(e) => {
                let plugin_name = plugin_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| plugin_path.display().to_string());
                warn!(path = %plugin_path.display(), error = %e, "Contract rejected");
                return rejected(plugin_name, report, e.to_string());
            }
        };

        let Some(handler) = self.catalog.get(&spec.entry_point) else {
            let reason = format!("Unknown entry point '{}'", spec.entry_point);
            warn!(plugin = %spec.name, entry_point = %spec.entry_point, "Entry point not found");
            return rejected(spec.name, report, reason);
        };

        let plugin_name = spec.name.clone();
        let admission = match report.authorize(spec, handler) {
            Ok(admission) => admission,
            Err(failure) => {
                warn!(plugin = %plugin_name, error = %failure, "Quality gates failed");
                return rejected(plugin_name, report, failure.to_string());
            }
        };

        let outcome = self.registry.admit(admission).await;
        let (admitted, reason) = match outcome {
            AdmitOutcome::Inserted { .. } | AdmitOutcome::Replaced { .. } => (true, None),
            AdmitOutcome::Removed | AdmitOutcome::Skipped => {
                (false, Some("Plugin is disabled".to_string()))
            }
        };

        info!(plugin = %plugin_name, admitted, "Submission processed");

        SubmissionOutcome {
            plugin_name,
            report,
            admitted,
            reason,
        }
    }
}

fn rejected(plugin_name: String, report: GateReport, reason: String) -> SubmissionOutcome {
    SubmissionOutcome {
        plugin_name,
        report,
        admitted: false,
        reason: Some(reason),
    }
}

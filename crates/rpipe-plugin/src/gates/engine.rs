//! Quality gate engine: runs every configured gate against a plugin
//! directory and aggregates the outcomes.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use rpipe_core::config::gates::GateConfig;
use rpipe_core::config::plugin::PluginConfig;
use rpipe_core::error::AppError;
use rpipe_core::result::AppResult;

use crate::contract::LifecycleEvent;

use super::report::{GateReport, GateResult};
use super::{
    CONTRACT_COMPLIANCE, COVERAGE, CommandScanner, ContractComplianceGate, CoverageGate,
    QualityGate, SECURITY_SCAN, SecurityScanGate, SecurityScanner,
};

/// Ordered sequence of gates.
#[derive(Debug, Clone, Default)]
pub struct QualityGateEngine {
    gates: Vec<QualityGate>,
}

impl QualityGateEngine {
    /// Creates an engine running `gates` in order.
    pub fn new(gates: Vec<QualityGate>) -> Self {
        Self { gates }
    }

    /// Builds the configured gates, using the command scanner from config.
    pub fn from_config(
        gates: &GateConfig,
        plugins: &PluginConfig,
        supported: &[LifecycleEvent],
    ) -> AppResult<Self> {
        let scanner = CommandScanner::new(
            gates.security_command.clone(),
            &gates.security_findings_pointer,
            Duration::from_secs(gates.command_timeout_seconds),
        );
        Self::from_config_with_scanner(gates, plugins, supported, Arc::new(scanner))
    }

    /// Builds the configured gates with an injected security scanner.
    pub fn from_config_with_scanner(
        gates: &GateConfig,
        plugins: &PluginConfig,
        supported: &[LifecycleEvent],
        scanner: Arc<dyn SecurityScanner>,
    ) -> AppResult<Self> {
        let mut built = Vec::with_capacity(gates.enabled.len());
        for name in &gates.enabled {
            let gate = match name.trim() {
                COVERAGE => QualityGate::Coverage(CoverageGate {
                    minimum: gates.minimum_coverage,
                    command: gates.coverage_command.clone(),
                    report: gates.coverage_report.clone(),
                    pointer: gates.coverage_pointer.clone(),
                    timeout: Duration::from_secs(gates.command_timeout_seconds),
                }),
                SECURITY_SCAN => QualityGate::SecurityScan(SecurityScanGate::new(scanner.clone())),
                CONTRACT_COMPLIANCE => QualityGate::ContractCompliance(ContractComplianceGate::new(
                    &plugins.spec_file_name,
                    supported.to_vec(),
                )),
                other => {
                    return Err(AppError::configuration(format!(
                        "Unknown quality gate '{other}'"
                    )));
                }
            };
            built.push(gate);
        }
        Ok(Self::new(built))
    }

    /// Names of the configured gates, in order.
    pub fn gate_names(&self) -> Vec<&'static str> {
        self.gates.iter().map(QualityGate::name).collect()
    }

    /// Runs every gate in order. A failing gate never stops the rest.
    pub async fn run_all(&self, plugin_path: &Path) -> GateReport {
        let mut results = Vec::with_capacity(self.gates.len());

        for gate in &self.gates {
            let outcome = gate.check(plugin_path).await;
            if outcome.passed {
                info!(gate = gate.name(), path = %plugin_path.display(), "Gate passed");
            } else {
                warn!(
                    gate = gate.name(),
                    path = %plugin_path.display(),
                    message = %outcome.message,
                    "Gate failed"
                );
            }
            results.push(GateResult {
                gate_name: gate.name().to_string(),
                passed: outcome.passed,
                message: outcome.message,
            });
        }

        GateReport::new(plugin_path, results)
    }
}

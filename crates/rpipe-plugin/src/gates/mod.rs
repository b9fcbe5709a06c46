//! Quality gates: independent checks a plugin must pass before admission.

pub mod command;
pub mod compliance;
pub mod coverage;
pub mod engine;
pub mod report;
pub mod security;

use std::path::Path;

pub use compliance::ContractComplianceGate;
pub use coverage::CoverageGate;
pub use engine::QualityGateEngine;
pub use report::{Admission, GateFailure, GateOutcome, GateReport, GateResult};
pub use security::{CommandScanner, ScanError, ScanFindings, SecurityScanGate, SecurityScanner};

/// Gate name for [`CoverageGate`].
pub const COVERAGE: &str = "coverage";
/// Gate name for [`SecurityScanGate`].
pub const SECURITY_SCAN: &str = "security_scan";
/// Gate name for [`ContractComplianceGate`].
pub const CONTRACT_COMPLIANCE: &str = "contract_compliance";

/// The closed set of gate variants.
#[derive(Debug, Clone)]
pub enum QualityGate {
    /// Minimum test coverage.
    Coverage(CoverageGate),
    /// Zero static-analysis findings.
    SecurityScan(SecurityScanGate),
    /// Specification re-validation.
    ContractCompliance(ContractComplianceGate),
}

impl QualityGate {
    /// The gate's report name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Coverage(_) => COVERAGE,
            Self::SecurityScan(_) => SECURITY_SCAN,
            Self::ContractCompliance(_) => CONTRACT_COMPLIANCE,
        }
    }

    /// Checks one plugin directory.
    pub async fn check(&self, plugin_path: &Path) -> GateOutcome {
        match self {
            Self::Coverage(gate) => gate.check(plugin_path).await,
            Self::SecurityScan(gate) => gate.check(plugin_path).await,
            Self::ContractCompliance(gate) => gate.check(plugin_path).await,
        }
    }
}

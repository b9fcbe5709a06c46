//! Quality gate configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Quality gate engine configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gates to run, in order. Known names: `coverage`, `security_scan`,
    /// `contract_compliance`.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
    /// Minimum total coverage percentage required by the coverage gate.
    #[serde(default = "default_minimum_coverage")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub minimum_coverage: f64,
    /// Optional command (argv) that produces the coverage report. Runs with
    /// the plugin directory as its working directory.
    #[serde(default)]
    pub coverage_command: Vec<String>,
    /// Coverage report path, relative to the plugin directory.
    #[serde(default = "default_coverage_report")]
    pub coverage_report: String,
    /// JSON pointer to the total coverage percentage inside the report.
    #[serde(default = "default_coverage_pointer")]
    pub coverage_pointer: String,
    /// Static-analysis command (argv). `{plugin_path}` is substituted.
    #[serde(default = "default_security_command")]
    pub security_command: Vec<String>,
    /// JSON pointer to the findings array in the scanner's stdout.
    #[serde(default = "default_security_findings_pointer")]
    pub security_findings_pointer: String,
    /// Upper bound for any external gate command.
    #[serde(default = "default_command_timeout")]
    #[validate(range(min = 1, max = 3600))]
    pub command_timeout_seconds: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            minimum_coverage: default_minimum_coverage(),
            coverage_command: Vec::new(),
            coverage_report: default_coverage_report(),
            coverage_pointer: default_coverage_pointer(),
            security_command: default_security_command(),
            security_findings_pointer: default_security_findings_pointer(),
            command_timeout_seconds: default_command_timeout(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec![
        "coverage".to_string(),
        "security_scan".to_string(),
        "contract_compliance".to_string(),
    ]
}

fn default_minimum_coverage() -> f64 {
    80.0
}

fn default_coverage_report() -> String {
    "coverage.json".to_string()
}

fn default_coverage_pointer() -> String {
    "/totals/percent_covered".to_string()
}

fn default_security_command() -> Vec<String> {
    vec![
        "bandit".to_string(),
        "-r".to_string(),
        "{plugin_path}".to_string(),
        "-f".to_string(),
        "json".to_string(),
    ]
}

fn default_security_findings_pointer() -> String {
    "/results".to_string()
}

fn default_command_timeout() -> u64 {
    300
}

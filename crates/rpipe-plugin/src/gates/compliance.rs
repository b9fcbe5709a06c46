//! Contract-compliance gate: re-validates the plugin's specification file.

use std::path::Path;

use crate::contract::{LifecycleEvent, PluginSpec};

use super::report::GateOutcome;

/// Re-runs every contract rule against `<plugin_path>/<spec_file_name>`.
#[derive(Debug, Clone)]
pub struct ContractComplianceGate {
    spec_file_name: String,
    supported: Vec<LifecycleEvent>,
}

impl ContractComplianceGate {
    /// Creates a gate reading `spec_file_name` and accepting `supported` events.
    pub fn new(spec_file_name: &str, supported: Vec<LifecycleEvent>) -> Self {
        Self {
            spec_file_name: spec_file_name.to_string(),
            supported,
        }
    }

    /// Runs the check.
    pub async fn check(&self, plugin_path: &Path) -> GateOutcome {
        let spec_path = plugin_path.join(&self.spec_file_name);
        let supported = self.supported.clone();
        let checked = tokio::task::spawn_blocking(move || {
            let spec = PluginSpec::from_path(&spec_path)?;
            spec.ensure_event_supported(&supported)
        })
        .await;

        match checked {
            Ok(Ok(())) => GateOutcome::pass("Contract compliant"),
            Ok(Err(e)) => GateOutcome::fail(e.message),
            Err(e) => GateOutcome::fail(format!("Contract check could not run: {e}")),
        }
    }
}

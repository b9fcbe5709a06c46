//! `validate`: contract validation without gating or admission.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use rpipe_core::error::AppError;
use rpipe_plugin::contract::{LifecycleEvent, PluginSpec};

use crate::output::{self, OutputFormat};

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Path to a plugin.spec.json file
    pub spec: PathBuf,
}

/// Summary row for a valid contract
#[derive(Debug, Serialize, Tabled)]
struct ContractRow {
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Entry Point")]
    entry_point: String,
    #[tabled(rename = "Enabled")]
    enabled: bool,
    #[tabled(rename = "Timeout (s)")]
    timeout_seconds: u64,
}

/// Execute the validate command
pub async fn execute(
    args: &ValidateArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let events = LifecycleEvent::ordered(&config.pipeline.lifecycle_events);

    let checked = PluginSpec::from_path(&args.spec)
        .and_then(|spec| spec.ensure_event_supported(&events).map(|()| spec));

    match checked {
        Ok(spec) => {
            let row = ContractRow {
                timeout_seconds: spec
                    .timeout(config.pipeline.default_timeout_seconds)
                    .as_secs(),
                name: spec.name,
                version: spec.version,
                event: spec.lifecycle_event.to_string(),
                entry_point: spec.entry_point,
                enabled: spec.enabled,
            };
            output::print_list(&[row], format);
            output::print_success(&format!("'{}' is a valid plugin contract", args.spec.display()));
            Ok(())
        }
        Err(e) => {
            if format == OutputFormat::Json {
                output::print_json(&e);
            } else {
                output::print_error(&e.to_string());
                if !e.fields.is_empty() {
                    output::print_kv("Fields", &e.fields.join(", "));
                }
            }
            Err(e.into())
        }
    }
}

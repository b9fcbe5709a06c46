//! `plugins`: admit the plugin directory and list the registry.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use rpipe_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Arguments for the plugins command
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Also list submissions that were not admitted
    #[arg(long)]
    pub all: bool,
}

/// A registered plugin in invocation order
#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Entry Point")]
    entry_point: String,
    #[tabled(rename = "Risk")]
    risk: String,
}

/// A rejected submission
#[derive(Debug, Serialize, Tabled)]
struct RejectedRow {
    #[tabled(rename = "Plugin")]
    name: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Execute the plugins command
pub async fn execute(
    args: &PluginsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let mut config = super::load_config(config_path).await?;
    config.plugins.auto_load = true;
    let runtime = super::bootstrap(&config).await?;

    let mut rows = Vec::new();
    for (event, plugins) in runtime.registry().list().await {
        for (position, plugin) in plugins.iter().enumerate() {
            rows.push(PluginRow {
                event: event.to_string(),
                position,
                name: plugin.spec.name.clone(),
                version: plugin.spec.version.clone(),
                entry_point: plugin.spec.entry_point.clone(),
                risk: format!("{:?}", plugin.spec.risk_level).to_lowercase(),
            });
        }
    }
    output::print_list(&rows, format);

    let rejected: Vec<RejectedRow> = runtime
        .loaded()
        .iter()
        .filter(|o| !o.admitted)
        .map(|o| RejectedRow {
            name: o.plugin_name.clone(),
            reason: o.reason.clone().unwrap_or_default(),
        })
        .collect();

    if !rejected.is_empty() {
        output::print_warning(&format!("{} plugin(s) were not admitted", rejected.len()));
        if args.all {
            output::print_list(&rejected, format);
        }
    }

    Ok(())
}

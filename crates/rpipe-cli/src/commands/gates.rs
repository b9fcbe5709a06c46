//! `gates`: run the quality gate engine against one plugin directory.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use rpipe_core::error::AppError;
use rpipe_plugin::contract::LifecycleEvent;
use rpipe_plugin::gates::QualityGateEngine;

use crate::output::{self, OutputFormat};

/// Arguments for the gates command
#[derive(Debug, Args)]
pub struct GatesArgs {
    /// Plugin directory
    pub plugin_dir: PathBuf,

    /// Override the minimum coverage percentage
    #[arg(long)]
    pub min_coverage: Option<f64>,
}

/// One gate result
#[derive(Debug, Serialize, Tabled)]
struct GateRow {
    #[tabled(rename = "Gate")]
    gate: String,
    #[tabled(rename = "Passed")]
    passed: bool,
    #[tabled(rename = "Message")]
    message: String,
}

/// Execute the gates command
pub async fn execute(
    args: &GatesArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let mut config = super::load_config(config_path).await?;
    if let Some(min) = args.min_coverage {
        config.gates.minimum_coverage = min;
    }

    let events = LifecycleEvent::ordered(&config.pipeline.lifecycle_events);
    let engine = QualityGateEngine::from_config(&config.gates, &config.plugins, &events)?;
    let report = engine.run_all(&args.plugin_dir).await;

    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => {
            let rows: Vec<GateRow> = report
                .results
                .iter()
                .map(|r| GateRow {
                    gate: r.gate_name.clone(),
                    passed: r.passed,
                    message: r.message.clone(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    if report.all_passed {
        output::print_success(&format!(
            "All quality gates passed for '{}'",
            args.plugin_dir.display()
        ));
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} quality gate(s) failed for '{}'",
            report.failures().len(),
            args.plugin_dir.display()
        )))
    }
}

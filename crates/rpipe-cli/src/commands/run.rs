//! `run`: process one file through every lifecycle event.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use plugin_deduplicator::fingerprint::sha256_file;
use rpipe_core::error::AppError;
use rpipe_plugin::orchestrator::RunRequest;

use crate::output::{self, OutputFormat};

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// File to process
    pub file: PathBuf,

    /// Trace identifier to use instead of a generated one
    #[arg(long)]
    pub trace_id: Option<String>,
}

/// One invocation result
#[derive(Debug, Serialize, Tabled)]
struct InvocationRow {
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "Plugin")]
    plugin: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Duration (ms)")]
    duration_ms: u64,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Execute the run command
pub async fn execute(
    args: &RunArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path).await?;
    let runtime = super::bootstrap(&config).await?;

    let file_path = args.file.to_string_lossy().into_owned();
    let file_hash = sha256_file(&args.file).await?;
    let request = RunRequest::new(&file_path)
        .with_trace_id(args.trace_id.as_deref())
        .with_field("file_hash", file_hash);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight plugins");
            trigger.cancel();
        }
    });

    let summary = runtime.orchestrator().run_request(request, &cancel).await;

    match format {
        OutputFormat::Json => output::print_json(&summary),
        OutputFormat::Table => {
            let rows: Vec<InvocationRow> = summary
                .events
                .iter()
                .flat_map(|event| {
                    event.results.iter().map(move |r| InvocationRow {
                        event: event.event_name.clone(),
                        plugin: r.plugin_name.clone(),
                        status: r.status.as_str().to_string(),
                        duration_ms: r.duration_ms,
                        detail: r.error_message.clone().unwrap_or_else(|| {
                            r.output
                                .as_ref()
                                .map(|o| serde_json::Value::Object(o.clone()).to_string())
                                .unwrap_or_default()
                        }),
                    })
                })
                .collect();
            output::print_list(&rows, format);
            output::print_kv("Trace", &summary.trace_id);
        }
    }

    if summary.is_success() {
        output::print_success(&format!("Run {} completed", summary.trace_id));
        Ok(())
    } else {
        Err(AppError::internal(format!(
            "Run {} failed: {}",
            summary.trace_id,
            summary.error_message.unwrap_or_default()
        )))
    }
}

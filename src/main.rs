//! R_PIPELINE runner
//!
//! Loads the configuration, admits every plugin in the plugin directory and
//! drives each file named on the command line through the lifecycle events.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use plugin_deduplicator::fingerprint::sha256_file;
use plugin_deduplicator::{DeduplicatorPlugin, DuplicateStore};
use plugin_file_classifier::FileClassifierPlugin;
use rpipe_core::config::AppConfig;
use rpipe_core::error::AppError;
use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::observe::TracingObserver;
use rpipe_plugin::orchestrator::{LifecycleOrchestrator, RunRequest, RunSummary};
use rpipe_plugin::runtime::PipelineRuntime;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("Usage: r-pipeline <file>...");
        std::process::exit(2);
    }

    match run(config, files).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Pipeline error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("RPIPE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
        .map_err(|e| AppError::configuration(format!("Config load error: {}", e)))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Runs every file in order. Returns whether all runs succeeded.
async fn run(config: AppConfig, files: Vec<String>) -> Result<bool, AppError> {
    tracing::info!("Starting R_PIPELINE v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Compiled-in entry points ─────────────────────────
    let store = Arc::new(DuplicateStore::from_config(&config.store).await?);
    let mut catalog = EntryPointCatalog::new();
    DeduplicatorPlugin::new(Arc::clone(&store)).register(&mut catalog);
    FileClassifierPlugin::register(&mut catalog);

    // ── Step 2: Admission ────────────────────────────────────────
    let runtime =
        PipelineRuntime::bootstrap(&config, catalog, Arc::new(TracingObserver::new())).await?;
    for outcome in runtime.loaded().iter().filter(|o| !o.admitted) {
        tracing::warn!(
            plugin = %outcome.plugin_name,
            reason = outcome.reason.as_deref().unwrap_or_default(),
            "Plugin not admitted"
        );
    }

    // ── Step 3: Cancellation ─────────────────────────────────────
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, no further events will start");
        trigger.cancel();
    });

    // ── Step 4: Runs ─────────────────────────────────────────────
    let mut all_succeeded = true;
    for file in files {
        if cancel.is_cancelled() {
            break;
        }

        let summary = process_file(runtime.orchestrator(), &file, &cancel).await;

        all_succeeded &= summary.is_success();
        let rendered = serde_json::to_string(&summary)
            .map_err(|e| AppError::internal(format!("Cannot render run summary: {}", e)))?;
        println!("{}", rendered);
    }

    tracing::info!(fingerprints = store.len(), "R_PIPELINE finished");
    Ok(all_succeeded)
}

/// Fingerprints `file` and runs it. A file that cannot be fingerprinted
/// yields a failed summary instead of stopping the batch.
async fn process_file(
    orchestrator: &LifecycleOrchestrator,
    file: &str,
    cancel: &CancellationToken,
) -> RunSummary {
    match sha256_file(Path::new(file)).await {
        Ok(file_hash) => {
            let request = RunRequest::new(file).with_field("file_hash", file_hash);
            orchestrator.run_request(request, cancel).await
        }
        Err(e) => {
            tracing::error!(file = %file, error = %e, "Cannot fingerprint file, skipping its run");
            RunSummary::not_started(file, None, e.message)
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

//! CLI command definitions and dispatch.

pub mod config;
pub mod gates;
pub mod plugins;
pub mod run;
pub mod validate;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use plugin_deduplicator::{DeduplicatorPlugin, DuplicateStore};
use plugin_file_classifier::FileClassifierPlugin;
use rpipe_core::config::AppConfig;
use rpipe_core::error::AppError;
use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::observe::TracingObserver;
use rpipe_plugin::runtime::PipelineRuntime;

use crate::output::OutputFormat;

/// R_PIPELINE: plugin lifecycle administration
#[derive(Debug, Parser)]
#[command(name = "rpipe-cli", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate a plugin specification file
    Validate(validate::ValidateArgs),
    /// Run the quality gates against a plugin directory
    Gates(gates::GatesArgs),
    /// Load the plugin directory and list admitted plugins
    Plugins(plugins::PluginsArgs),
    /// Run one file through every lifecycle event
    Run(run::RunArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Validate(args) => validate::execute(args, &self.config, self.format).await,
            Commands::Gates(args) => gates::execute(args, &self.config, self.format).await,
            Commands::Plugins(args) => plugins::execute(args, &self.config, self.format).await,
            Commands::Run(args) => run::execute(args, &self.config, self.format).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }
}

/// Helper: load configuration from file
pub async fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
}

/// Helper: build the compiled-in entry points
pub async fn build_catalog(config: &AppConfig) -> Result<EntryPointCatalog, AppError> {
    let store = DuplicateStore::from_config(&config.store).await?;
    let mut catalog = EntryPointCatalog::new();
    DeduplicatorPlugin::new(Arc::new(store)).register(&mut catalog);
    FileClassifierPlugin::register(&mut catalog);
    Ok(catalog)
}

/// Helper: bootstrap the runtime with every plugin in the plugin directory
pub async fn bootstrap(config: &AppConfig) -> Result<PipelineRuntime, AppError> {
    let catalog = build_catalog(config).await?;
    PipelineRuntime::bootstrap(config, catalog, Arc::new(TracingObserver::new())).await
}

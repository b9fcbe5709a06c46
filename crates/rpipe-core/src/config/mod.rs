//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section. Every field carries a default, so an absent file yields a
//! usable configuration.

pub mod gates;
pub mod logging;
pub mod pipeline;
pub mod plugin;
pub mod store;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::gates::GateConfig;
use self::logging::LoggingConfig;
use self::pipeline::PipelineConfig;
use self::plugin::PluginConfig;
use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration file and `RPIPE__`-prefixed environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Lifecycle ordering and invocation settings.
    pub pipeline: PipelineConfig,
    /// Quality gate settings.
    pub gates: GateConfig,
    /// Plugin discovery settings.
    pub plugins: PluginConfig,
    /// Duplicate-detection store settings.
    pub store: StoreConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// The file is optional. Values are overlaid by environment variables
    /// prefixed with `RPIPE` using `__` as the section separator, e.g.
    /// `RPIPE__PIPELINE__MAX_CONCURRENCY=1`.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("RPIPE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pipeline.lifecycle_events")
                    .with_list_parse_key("gates.enabled")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        loaded.validate()?;
        tracing::debug!(
            path,
            events = ?loaded.pipeline.lifecycle_events,
            gates = ?loaded.gates.enabled,
            "Configuration loaded"
        );
        Ok(loaded)
    }

    /// Validate every section's numeric ranges and required lists.
    pub fn validate(&self) -> Result<(), AppError> {
        self.pipeline.validate()?;
        self.gates.validate()?;
        self.pipeline.ensure_events()?;
        Ok(())
    }
}

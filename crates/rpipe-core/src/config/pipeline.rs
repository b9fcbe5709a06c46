//! Lifecycle ordering and plugin invocation configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

/// Pipeline run configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Canonical lifecycle event order. Every run walks these in sequence.
    #[serde(default = "default_lifecycle_events")]
    pub lifecycle_events: Vec<String>,
    /// Maximum number of plugins invoked concurrently within one event.
    /// `1` invokes plugins strictly one after another.
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,
    /// Timeout applied to plugin specifications that omit `timeout_seconds`.
    #[serde(default = "default_timeout_seconds")]
    #[validate(range(min = 1, max = 86400))]
    pub default_timeout_seconds: u64,
}

impl PipelineConfig {
    /// Rejects an empty or blank lifecycle event list.
    pub fn ensure_events(&self) -> Result<(), AppError> {
        if self.lifecycle_events.is_empty() {
            return Err(AppError::configuration(
                "pipeline.lifecycle_events must name at least one event",
            ));
        }
        if self.lifecycle_events.iter().any(|e| e.trim().is_empty()) {
            return Err(AppError::configuration(
                "pipeline.lifecycle_events must not contain blank names",
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lifecycle_events: default_lifecycle_events(),
            max_concurrency: default_max_concurrency(),
            default_timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_lifecycle_events() -> Vec<String> {
    vec!["file_detected".to_string(), "pre_merge".to_string()]
}

fn default_max_concurrency() -> usize {
    4
}

fn default_timeout_seconds() -> u64 {
    30
}

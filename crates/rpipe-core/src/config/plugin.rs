//! Plugin discovery configuration.

use serde::{Deserialize, Serialize};

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory whose sub-directories each hold one plugin.
    #[serde(default = "default_plugin_directory")]
    pub directory: String,
    /// Specification file expected in every plugin directory.
    #[serde(default = "default_spec_file_name")]
    pub spec_file_name: String,
    /// Whether to submit every discovered plugin on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: default_plugin_directory(),
            spec_file_name: default_spec_file_name(),
            auto_load: default_true(),
        }
    }
}

fn default_plugin_directory() -> String {
    "./plugins".to_string()
}

fn default_spec_file_name() -> String {
    "plugin.spec.json".to_string()
}

fn default_true() -> bool {
    true
}

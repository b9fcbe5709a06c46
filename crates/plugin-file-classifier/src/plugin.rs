//! The file-classifier plugin handler.

use std::sync::Arc;

use tracing::info;

use rpipe_plugin::prelude::*;

use crate::classifier::classify;

/// Entry-point name used in `plugin.spec.json`.
pub const ENTRY_POINT: &str = "file_classifier";

/// Suggests where a detected file belongs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileClassifierPlugin;

impl FileClassifierPlugin {
    /// Registers the plugin under [`ENTRY_POINT`].
    pub fn register(catalog: &mut EntryPointCatalog) {
        catalog.register(ENTRY_POINT, Arc::new(Self));
    }
}

#[async_trait]
impl PluginHandler for FileClassifierPlugin {
    async fn invoke(&self, input: PluginInput) -> PluginOutput {
        let trace_id = input.trace_id().unwrap_or("unknown").to_string();
        let Some(file_path) = input.file_path() else {
            return PluginOutput::error(&trace_id, "Missing required fields: file_path");
        };

        let result = classify(file_path);
        info!(
            trace_id = %trace_id,
            file = %file_path,
            classification = result.classification,
            "File classified"
        );

        PluginOutput::success(&trace_id)
            .with_data("classification", result.classification)
            .with_data("confidence", result.confidence)
            .with_data("recommended_location", result.recommended_location)
    }
}

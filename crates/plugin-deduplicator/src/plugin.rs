//! The deduplicator plugin handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::contract::TRACE_ID_FIELD;
use rpipe_plugin::payload::{FILE_PATH_FIELD, PluginInput, PluginOutput};
use rpipe_plugin::traits::PluginHandler;

use crate::store::DuplicateStore;

/// Entry-point name used in `plugin.spec.json`.
pub const ENTRY_POINT: &str = "deduplicator";

/// Input field carrying the content fingerprint.
pub const FILE_HASH_FIELD: &str = "file_hash";

/// Trace id echoed when the input carries none.
const UNKNOWN_TRACE: &str = "unknown";

/// Flags files whose content was already seen at another path.
#[derive(Debug, Clone)]
pub struct DeduplicatorPlugin {
    store: Arc<DuplicateStore>,
}

impl DeduplicatorPlugin {
    /// Creates the plugin over `store`.
    pub fn new(store: Arc<DuplicateStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<DuplicateStore> {
        &self.store
    }

    /// Registers the plugin under [`ENTRY_POINT`].
    pub fn register(self, catalog: &mut EntryPointCatalog) {
        catalog.register(ENTRY_POINT, Arc::new(self));
    }
}

#[async_trait]
impl PluginHandler for DeduplicatorPlugin {
    async fn invoke(&self, input: PluginInput) -> PluginOutput {
        let trace_id = input.trace_id().unwrap_or(UNKNOWN_TRACE).to_string();

        let missing = input.missing(&[FILE_PATH_FIELD, FILE_HASH_FIELD, TRACE_ID_FIELD]);
        if !missing.is_empty() {
            return PluginOutput::error(
                &trace_id,
                format!("Missing required fields: {}", missing.join(", ")),
            );
        }

        let (Some(file_path), Some(file_hash)) =
            (input.file_path(), input.get_string(FILE_HASH_FIELD))
        else {
            return PluginOutput::error(&trace_id, "file_path and file_hash must be strings");
        };

        info!(trace_id = %trace_id, file = %file_path, "Checking duplicate");

        match self.store.check_duplicate(file_path, file_hash).await {
            Ok((is_duplicate, duplicate_of)) => {
                info!(
                    trace_id = %trace_id,
                    file = %file_path,
                    is_duplicate,
                    duplicate_of = %duplicate_of,
                    "Duplicate check finished"
                );
                PluginOutput::success(&trace_id)
                    .with_data("is_duplicate", is_duplicate)
                    .with_data("duplicate_of", duplicate_of)
                    .with_data(
                        "recommended_action",
                        if is_duplicate { "quarantine" } else { "proceed" },
                    )
            }
            Err(e) => {
                error!(trace_id = %trace_id, file = %file_path, error = %e, "Duplicate check failed");
                PluginOutput::error(&trace_id, e.to_string())
            }
        }
    }
}

//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use plugin_deduplicator::{DeduplicatorPlugin, DuplicateStore};
use plugin_file_classifier::FileClassifierPlugin;
use rpipe_core::config::AppConfig;
use rpipe_plugin::catalog::EntryPointCatalog;
use rpipe_plugin::observe::MemoryObserver;
use rpipe_plugin::runtime::PipelineRuntime;

/// Test pipeline context
pub struct TestPipeline {
    /// Fully wired runtime
    pub runtime: PipelineRuntime,
    /// Span recorder attached to the orchestrator
    pub observer: MemoryObserver,
    /// Fingerprint store shared with the deduplicator
    pub store: Arc<DuplicateStore>,
    /// Configuration the runtime was built from
    pub config: AppConfig,
}

impl TestPipeline {
    /// Bootstrap with the compiled-in plugins plus `extra` entry points.
    pub async fn new(workspace: &TestWorkspace, extra: EntryPointCatalog) -> Self {
        let config = workspace.config();
        Self::with_config(config, extra).await
    }

    /// Bootstrap from an explicit configuration.
    pub async fn with_config(config: AppConfig, extra: EntryPointCatalog) -> Self {
        let store = Arc::new(
            DuplicateStore::from_config(&config.store)
                .await
                .expect("Failed to open fingerprint store"),
        );

        let mut catalog = extra;
        DeduplicatorPlugin::new(Arc::clone(&store)).register(&mut catalog);
        FileClassifierPlugin::register(&mut catalog);

        let observer = MemoryObserver::new();
        let runtime = PipelineRuntime::bootstrap(&config, catalog, Arc::new(observer.clone()))
            .await
            .expect("Failed to bootstrap pipeline");

        Self {
            runtime,
            observer,
            store,
            config,
        }
    }

    /// Names of the admitted plugins for `event`, in invocation order.
    pub async fn plugin_names(&self, event: &str) -> Vec<String> {
        let event = rpipe_plugin::LifecycleEvent::parse(event).expect("valid event name");
        self.runtime
            .registry()
            .resolve(&event)
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }
}

/// A temporary plugin root plus a scratch area for processed files.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("plugins")).expect("Failed to create plugin root");
        std::fs::create_dir_all(dir.path().join("files")).expect("Failed to create file root");
        Self { dir }
    }

    /// Workspace root
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Plugin root directory
    pub fn plugin_root(&self) -> PathBuf {
        self.dir.path().join("plugins")
    }

    /// Configuration pointing at this workspace with an in-memory store
    /// and the file-based gates only.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.pipeline.lifecycle_events = vec![
            "file_detected".to_string(),
            "pre_merge".to_string(),
            "post_merge".to_string(),
        ];
        config.pipeline.default_timeout_seconds = 5;
        config.gates.enabled = vec!["coverage".to_string(), "contract_compliance".to_string()];
        config.plugins.directory = self.plugin_root().to_string_lossy().into_owned();
        config.store.backend = "memory".to_string();
        config.store.path = self.root().join("hashes.json").to_string_lossy().into_owned();
        config
    }

    /// Write a plugin directory with a specification and coverage report.
    pub fn write_plugin(&self, dir: &str, spec: &Value, coverage: Option<f64>) -> PathBuf {
        let path = self.plugin_root().join(dir);
        std::fs::create_dir_all(&path).expect("Failed to create plugin dir");
        std::fs::write(
            path.join("plugin.spec.json"),
            serde_json::to_string_pretty(spec).expect("Failed to render spec"),
        )
        .expect("Failed to write spec");
        if let Some(percent) = coverage {
            std::fs::write(
                path.join("coverage.json"),
                json!({"totals": {"percent_covered": percent}}).to_string(),
            )
            .expect("Failed to write coverage report");
        }
        path
    }

    /// Write a file to be processed and return its path.
    pub fn write_file(&self, name: &str, contents: &str) -> String {
        let path = self.root().join("files").join(name);
        std::fs::write(&path, contents).expect("Failed to write file");
        path.to_string_lossy().into_owned()
    }

    /// Install the deduplicator and file-classifier plugins.
    pub fn install_reference_plugins(&self) {
        self.write_plugin(
            "10-deduplicator",
            &spec_doc("deduplicator", "1.0.0", "file_detected", "deduplicator")
                .with_input(&["file_path", "file_hash", "trace_id"])
                .with_output(&["status", "is_duplicate", "duplicate_of", "trace_id"])
                .build(),
            Some(95.0),
        );
        self.write_plugin(
            "20-file-classifier",
            &spec_doc("file-classifier", "1.0.0", "pre_merge", "file_classifier")
                .with_output(&["status", "classification", "confidence", "trace_id"])
                .build(),
            Some(88.0),
        );
    }
}

/// Builder for specification documents.
pub struct SpecDoc {
    doc: Value,
}

/// Start a valid, enabled specification document.
pub fn spec_doc(name: &str, version: &str, event: &str, entry_point: &str) -> SpecDoc {
    SpecDoc {
        doc: json!({
            "plugin_name": name,
            "version": version,
            "author": "integration",
            "lifecycle_event": event,
            "entry_point": entry_point,
            "enabled": true,
            "input_schema": {"required": ["file_path", "trace_id"]},
            "output_schema": {"required": ["status", "trace_id"]}
        }),
    }
}

impl SpecDoc {
    /// Replace the required input fields
    pub fn with_input(mut self, fields: &[&str]) -> Self {
        self.doc["input_schema"]["required"] = json!(fields);
        self
    }

    /// Replace the required output fields
    pub fn with_output(mut self, fields: &[&str]) -> Self {
        self.doc["output_schema"]["required"] = json!(fields);
        self
    }

    /// Set the per-invocation timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.doc["timeout_seconds"] = json!(seconds);
        self
    }

    /// Set the enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.doc["enabled"] = json!(enabled);
        self
    }

    /// Finish the document
    pub fn build(self) -> Value {
        self.doc
    }
}

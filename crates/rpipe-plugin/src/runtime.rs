//! Runtime assembly: registry, gate engine, admission manager, loader and
//! orchestrator wired from one configuration.

use std::sync::Arc;

use tracing::info;

use rpipe_core::config::AppConfig;
use rpipe_core::result::AppResult;
use rpipe_core::traits::observability::Observer;

use crate::catalog::EntryPointCatalog;
use crate::contract::LifecycleEvent;
use crate::gates::engine::QualityGateEngine;
use crate::loader::PluginLoader;
use crate::manager::{PluginManager, SubmissionOutcome};
use crate::orchestrator::LifecycleOrchestrator;
use crate::registry::PluginRegistry;

/// A fully wired pipeline.
#[derive(Debug)]
pub struct PipelineRuntime {
    registry: Arc<PluginRegistry>,
    manager: Arc<PluginManager>,
    loader: PluginLoader,
    orchestrator: LifecycleOrchestrator,
    loaded: Vec<SubmissionOutcome>,
}

impl PipelineRuntime {
    /// Builds the runtime with gates from configuration and, when
    /// `plugins.auto_load` is set, admits every plugin in the plugin
    /// directory.
    pub async fn bootstrap(
        config: &AppConfig,
        catalog: EntryPointCatalog,
        observer: Arc<dyn Observer>,
    ) -> AppResult<Self> {
        let events = LifecycleEvent::ordered(&config.pipeline.lifecycle_events);
        let engine = QualityGateEngine::from_config(&config.gates, &config.plugins, &events)?;
        Self::bootstrap_with_engine(config, catalog, observer, engine).await
    }

    /// Like [`bootstrap`](Self::bootstrap) with a caller-built gate engine.
    pub async fn bootstrap_with_engine(
        config: &AppConfig,
        catalog: EntryPointCatalog,
        observer: Arc<dyn Observer>,
        engine: QualityGateEngine,
    ) -> AppResult<Self> {
        config.validate()?;

        let events = LifecycleEvent::ordered(&config.pipeline.lifecycle_events);
        let registry = Arc::new(PluginRegistry::new(events));
        let manager = Arc::new(PluginManager::new(
            registry.clone(),
            Arc::new(engine),
            catalog,
            &config.plugins.spec_file_name,
        ));
        let loader = PluginLoader::new(&config.plugins.directory, &config.plugins.spec_file_name);
        let orchestrator =
            LifecycleOrchestrator::from_config(&config.pipeline, registry.clone(), observer);

        let loaded = if config.plugins.auto_load {
            loader.load_all(&manager).await?
        } else {
            Vec::new()
        };

        info!(
            events = ?config.pipeline.lifecycle_events,
            gates = ?manager.engine().gate_names(),
            admitted = registry.count().await,
            "Pipeline runtime ready"
        );

        Ok(Self {
            registry,
            manager,
            loader,
            orchestrator,
            loaded,
        })
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// The admission manager.
    pub fn manager(&self) -> &Arc<PluginManager> {
        &self.manager
    }

    /// The plugin-directory loader.
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// The orchestrator.
    pub fn orchestrator(&self) -> &LifecycleOrchestrator {
        &self.orchestrator
    }

    /// Outcomes of the startup load, in directory order.
    pub fn loaded(&self) -> &[SubmissionOutcome] {
        &self.loaded
    }
}

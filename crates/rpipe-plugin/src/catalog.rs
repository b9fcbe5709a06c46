//! Entry-point catalog: maps a contract's `entry_point` to compiled-in code.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::traits::PluginHandler;

/// Named plugin handlers available for binding at admission time.
#[derive(Debug, Clone, Default)]
pub struct EntryPointCatalog {
    handlers: BTreeMap<String, Arc<dyn PluginHandler>>,
}

impl EntryPointCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `entry_point`, replacing any previous one.
    pub fn register(&mut self, entry_point: &str, handler: Arc<dyn PluginHandler>) {
        self.handlers.insert(entry_point.to_string(), handler);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, entry_point: &str, handler: Arc<dyn PluginHandler>) -> Self {
        self.register(entry_point, handler);
        self
    }

    /// Looks up a handler.
    pub fn get(&self, entry_point: &str) -> Option<Arc<dyn PluginHandler>> {
        self.handlers.get(entry_point).cloned()
    }

    /// Registered entry-point names, sorted.
    pub fn entry_points(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

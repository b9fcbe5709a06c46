//! Plugin entry-point traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::payload::{PluginInput, PluginOutput};

/// Invocable entry point of a plugin.
///
/// Implementations report failures through [`PluginOutput::error`] rather
/// than panicking. The orchestrator still isolates panics and timeouts, so a
/// misbehaving handler never aborts a run.
#[async_trait]
pub trait PluginHandler: Send + Sync + std::fmt::Debug {
    /// Handles one invocation.
    async fn invoke(&self, input: PluginInput) -> PluginOutput;
}

/// A closure-based handler for quick handler creation.
pub struct ClosureHandler {
    /// Name used in debug output.
    name: String,
    /// Handler function.
    handler: Arc<
        dyn Fn(
                PluginInput,
            )
                -> std::pin::Pin<Box<dyn std::future::Future<Output = PluginOutput> + Send>>
            + Send
            + Sync,
    >,
}

impl std::fmt::Debug for ClosureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureHandler")
            .field("name", &self.name)
            .field("handler", &"<closure>")
            .finish()
    }
}

impl ClosureHandler {
    /// Creates a new closure-based handler.
    pub fn new<F, Fut>(name: &str, handler: F) -> Self
    where
        F: Fn(PluginInput) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = PluginOutput> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }

    /// Wraps a closure into an `Arc<dyn PluginHandler>`.
    pub fn wrap<F, Fut>(name: &str, handler: F) -> Arc<dyn PluginHandler>
    where
        F: Fn(PluginInput) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = PluginOutput> + Send + 'static,
    {
        Arc::new(Self::new(name, handler))
    }
}

#[async_trait]
impl PluginHandler for ClosureHandler {
    async fn invoke(&self, input: PluginInput) -> PluginOutput {
        (self.handler)(input).await
    }
}

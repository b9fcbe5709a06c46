//! Lifecycle orchestrator: drives one file through every lifecycle event.
//!
//! Events run strictly one after another. Within an event, up to
//! `max_concurrency` plugins run at once, but results are always reported in
//! registration order. Plugin failures become error results; only faults of
//! the orchestrator itself (an unavailable resolver, cancellation) fail the
//! run.

pub mod invoke;
pub mod request;
pub mod state;
pub mod summary;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rpipe_core::config::pipeline::PipelineConfig;
use rpipe_core::error::AppError;
use rpipe_core::traits::observability::{Observer, SpanId, SpanStatus};
use rpipe_core::types::trace::TraceContext;

use crate::contract::LifecycleEvent;
use crate::payload::{InvocationStatus, PluginInput};
use crate::registry::{PluginResolver, RegisteredPlugin};

pub use invoke::{PluginInvocationError, invoke_isolated};
pub use request::RunRequest;
pub use state::{RunState, RunTracker};
pub use summary::{EventSummary, InvocationErrorKind, InvocationResult, RunStatus, RunSummary};

/// Name of the root span of every run.
pub const RUN_SPAN: &str = "pipeline_run";

/// Drives pipeline runs.
#[derive(Debug, Clone)]
pub struct LifecycleOrchestrator {
    resolver: Arc<dyn PluginResolver>,
    observer: Arc<dyn Observer>,
    events: Vec<LifecycleEvent>,
    max_concurrency: usize,
    default_timeout_seconds: u64,
}

impl LifecycleOrchestrator {
    /// Creates an orchestrator walking `events` in order, invoking plugins
    /// one at a time with a 30 second default timeout.
    pub fn new(
        resolver: Arc<dyn PluginResolver>,
        observer: Arc<dyn Observer>,
        events: Vec<LifecycleEvent>,
    ) -> Self {
        Self {
            resolver,
            observer,
            events,
            max_concurrency: 1,
            default_timeout_seconds: 30,
        }
    }

    /// Creates an orchestrator from the pipeline configuration.
    pub fn from_config(
        config: &PipelineConfig,
        resolver: Arc<dyn PluginResolver>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self::new(
            resolver,
            observer,
            LifecycleEvent::ordered(&config.lifecycle_events),
        )
        .with_max_concurrency(config.max_concurrency)
        .with_default_timeout(config.default_timeout_seconds)
    }

    /// Sets how many plugins of one event may run at once.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Sets the timeout for contracts that declare none.
    pub fn with_default_timeout(mut self, seconds: u64) -> Self {
        self.default_timeout_seconds = seconds.max(1);
        self
    }

    /// The canonical event order.
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Runs `file_path` through every event.
    pub async fn run(&self, file_path: &str, trace_id: Option<&str>) -> RunSummary {
        let request = RunRequest::new(file_path).with_trace_id(trace_id);
        self.run_request(request, &CancellationToken::new()).await
    }

    /// Runs a request. Cancelling `cancel` stops scheduling further events;
    /// invocations already dispatched finish or time out.
    pub async fn run_request(&self, request: RunRequest, cancel: &CancellationToken) -> RunSummary {
        let trace = TraceContext::new(request.trace_id.as_deref());
        let mut tracker = RunTracker::new(trace.trace_id());
        let mut events = Vec::with_capacity(self.events.len());
        let mut fault: Option<AppError> = None;

        let root = self.observer.start_span(
            RUN_SPAN,
            None,
            &trace,
            vec![
                ("trace.id".to_string(), Value::from(trace.trace_id())),
                ("file.path".to_string(), Value::from(request.file_path.as_str())),
                ("events.count".to_string(), Value::from(self.events.len())),
            ],
        );

        info!(
            trace_id = %trace,
            file = %request.file_path,
            events = self.events.len(),
            "Pipeline run started"
        );

        if let Err(e) = tracker.advance(RunState::RunStarted) {
            fault = Some(e);
        }

        for event in &self.events {
            if fault.is_some() {
                break;
            }
            if cancel.is_cancelled() {
                warn!(trace_id = %trace, event = %event, "Run cancelled");
                fault = Some(AppError::cancelled(format!(
                    "run cancelled before event '{event}'"
                )));
                break;
            }
            if let Err(e) = tracker.advance(RunState::EventInProgress(event.clone())) {
                fault = Some(e);
                break;
            }

            match self.run_event(event, &request, &trace, root.id()).await {
                Ok(summary) => events.push(summary),
                Err(e) => fault = Some(e),
            }
        }

        let (status, next) = match &fault {
            None => (RunStatus::Success, RunState::RunCompleted),
            Some(_) => (RunStatus::Failed, RunState::RunFailed),
        };
        if let Err(e) = tracker.advance(next) {
            error!(trace_id = %trace, error = %e, "Run state machine out of sync");
        }

        match &fault {
            None => root.set_status(SpanStatus::Ok),
            Some(e) => {
                root.set_attribute("error.kind", e.kind.to_string());
                root.set_status(SpanStatus::Error(e.message.clone()));
            }
        }
        root.end();

        let summary = RunSummary {
            trace_id: trace.trace_id().to_string(),
            file_path: request.file_path.clone(),
            status,
            error_message: fault.map(|e| e.message),
            events,
            started_at: trace.started_at(),
            finished_at: Utc::now(),
        };

        match summary.status {
            RunStatus::Success => info!(
                trace_id = %trace,
                failed_invocations = summary.failed_invocations(),
                "Pipeline run completed"
            ),
            RunStatus::Failed => error!(
                trace_id = %trace,
                error = summary.error_message.as_deref().unwrap_or_default(),
                "Pipeline run failed"
            ),
        }

        summary
    }

    /// Resolves and invokes every plugin of one event. `Err` is an
    /// orchestrator fault.
    async fn run_event(
        &self,
        event: &LifecycleEvent,
        request: &RunRequest,
        trace: &TraceContext,
        root: SpanId,
    ) -> Result<EventSummary, AppError> {
        let span = self.observer.start_span(
            &format!("lifecycle.{event}"),
            Some(root),
            trace,
            vec![("lifecycle.event".to_string(), Value::from(event.as_str()))],
        );

        let plugins = match self.resolver.resolve(event).await {
            Ok(plugins) => plugins,
            Err(e) => {
                let message = format!("cannot resolve plugins for '{event}': {}", e.message);
                error!(trace_id = %trace, event = %event, error = %e, "Plugin resolution failed");
                span.set_status(SpanStatus::Error(message.clone()));
                return Err(AppError::new(e.kind, message));
            }
        };
        span.set_attribute("plugins.count", plugins.len());

        let span_id = span.id();
        let results: Vec<InvocationResult> = stream::iter(plugins)
            .map(|plugin| self.invoke_one(plugin, request.payload(event, trace), trace, span_id))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        span.set_attribute("plugins.failed", failed);
        span.set_status(SpanStatus::Ok);

        info!(
            trace_id = %trace,
            event = %event,
            plugins = results.len(),
            failed,
            "Lifecycle event completed"
        );

        Ok(EventSummary {
            event_name: event.to_string(),
            results,
        })
    }

    async fn invoke_one(
        &self,
        plugin: RegisteredPlugin,
        input: PluginInput,
        trace: &TraceContext,
        parent: SpanId,
    ) -> InvocationResult {
        let span = self.observer.start_span(
            &format!("plugin.{}", plugin.name()),
            Some(parent),
            trace,
            vec![
                ("plugin.name".to_string(), Value::from(plugin.name())),
                ("plugin.version".to_string(), Value::from(plugin.spec.version.as_str())),
            ],
        );

        let started = Instant::now();
        let outcome =
            invoke_isolated(&plugin, input, trace.trace_id(), self.default_timeout_seconds).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut result = InvocationResult {
            plugin_name: plugin.spec.name.clone(),
            plugin_version: plugin.spec.version.clone(),
            status: InvocationStatus::Success,
            output: None,
            error_message: None,
            error_kind: None,
            duration_ms,
            trace_id: trace.trace_id().to_string(),
        };

        match outcome {
            Ok(output) if output.is_success() => {
                result.output = Some(output.to_map());
            }
            Ok(output) => {
                result.status = InvocationStatus::Error;
                result.error_message = Some(
                    output
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "plugin reported an error without a message".to_string()),
                );
                result.output = Some(output.to_map());
            }
            Err(e) => {
                result.status = InvocationStatus::Error;
                result.error_kind = Some(e.kind());
                result.error_message = Some(e.to_string());
            }
        }

        span.set_attribute("plugin.status", result.status.as_str());
        span.set_attribute("duration_ms", duration_ms);
        match &result.error_message {
            None => span.set_status(SpanStatus::Ok),
            Some(message) => {
                warn!(
                    trace_id = %trace,
                    plugin = %result.plugin_name,
                    error = %message,
                    "Plugin invocation failed"
                );
                span.set_status(SpanStatus::Error(message.clone()));
            }
        }

        result
    }
}

//! Invocation results and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rpipe_core::types::trace::TraceContext;

use crate::payload::InvocationStatus;

/// Why the orchestrator recorded an invocation as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationErrorKind {
    /// The plugin exceeded its time budget.
    Timeout,
    /// The plugin panicked or its task was lost.
    RuntimeFault,
    /// The input lacked fields the plugin requires.
    MissingField,
    /// The output broke the plugin's declared output contract.
    OutputViolation,
}

/// Outcome of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Plugin name.
    pub plugin_name: String,
    /// Plugin version at invocation time.
    pub plugin_version: String,
    /// Success or error.
    pub status: InvocationStatus,
    /// The plugin's output mapping, when it returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Map<String, Value>>,
    /// Failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Set when the orchestrator, not the plugin, detected the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<InvocationErrorKind>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Trace of the owning run.
    pub trace_id: String,
}

impl InvocationResult {
    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }
}

/// Results for one lifecycle event, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Canonical event name.
    pub event_name: String,
    /// Per-plugin results.
    pub results: Vec<InvocationResult>,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every event completed. Individual plugins may still have failed.
    Success,
    /// An orchestrator-level fault ended the run early.
    Failed,
}

/// Terminal record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Trace of the run.
    pub trace_id: String,
    /// File the run processed.
    pub file_path: String,
    /// Overall status.
    pub status: RunStatus,
    /// Orchestrator fault description, when failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Events that ran, in canonical order.
    pub events: Vec<EventSummary>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// A failed summary for a request that could not be started, e.g. because
    /// its input fields could not be computed. No event ran.
    pub fn not_started(file_path: &str, trace_id: Option<&str>, message: impl Into<String>) -> Self {
        let trace = TraceContext::new(trace_id);
        Self {
            trace_id: trace.trace_id().to_string(),
            file_path: file_path.to_string(),
            status: RunStatus::Failed,
            error_message: Some(message.into()),
            events: Vec::new(),
            started_at: trace.started_at(),
            finished_at: Utc::now(),
        }
    }

    /// Whether the run completed.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    /// Every invocation result, event by event.
    pub fn results(&self) -> impl Iterator<Item = &InvocationResult> {
        self.events.iter().flat_map(|e| e.results.iter())
    }

    /// The summary for `event_name`, if that event ran.
    pub fn event(&self, event_name: &str) -> Option<&EventSummary> {
        self.events.iter().find(|e| e.event_name == event_name)
    }

    /// Number of failed invocations.
    pub fn failed_invocations(&self) -> usize {
        self.results().filter(|r| !r.is_success()).count()
    }
}

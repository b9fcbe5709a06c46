//! Observer that forwards spans to the `tracing` subscriber.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;
use tracing::{Span, debug, field, info_span};

use rpipe_core::traits::observability::{
    Observer, SpanHandle, SpanId, SpanRecorder, SpanStatus,
};
use rpipe_core::types::trace::TraceContext;

type OpenSpans = Arc<Mutex<HashMap<SpanId, Span>>>;

/// Default observer: each span becomes a `tracing` span named
/// `pipeline_span` whose `name` field carries the logical span name.
///
/// Spans opened under a parent that is still open are nested under the
/// parent's `tracing` span.
#[derive(Debug, Default)]
pub struct TracingObserver {
    next_id: AtomicU64,
    open: OpenSpans,
}

impl TracingObserver {
    /// Creates the observer.
    pub fn new() -> Self {
        Self::default()
    }

    fn parent_span(&self, parent: Option<SpanId>) -> Option<Span> {
        let parent = parent?;
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        open.get(&parent).cloned()
    }
}

impl Observer for TracingObserver {
    fn start_span(
        &self,
        name: &str,
        parent: Option<SpanId>,
        trace: &TraceContext,
        attributes: Vec<(String, Value)>,
    ) -> SpanHandle {
        let id = SpanId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let parent_span = self.parent_span(parent).unwrap_or_else(Span::none);
        let span = info_span!(
            parent: &parent_span,
            "pipeline_span",
            name = %name,
            trace_id = %trace.trace_id(),
            span_id = id.0,
            parent_id = parent.map(|p| p.0),
            status = field::Empty,
        );
        for (key, value) in &attributes {
            debug!(parent: &span, attribute = %key, value = %value, "span attribute");
        }

        self.open
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, span.clone());

        SpanHandle::new(
            id,
            Box::new(TracingRecorder {
                id,
                open: Arc::clone(&self.open),
                span: Mutex::new(Some(span)),
                started: Instant::now(),
            }),
        )
    }
}

struct TracingRecorder {
    id: SpanId,
    open: OpenSpans,
    span: Mutex<Option<Span>>,
    started: Instant,
}

impl SpanRecorder for TracingRecorder {
    fn set_attribute(&self, key: &str, value: Value) {
        let guard = self.span.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(span) = guard.as_ref() {
            debug!(parent: span, attribute = %key, value = %value, "span attribute");
        }
    }

    fn set_status(&self, status: SpanStatus) {
        let guard = self.span.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(span) = guard.as_ref() {
            match status {
                SpanStatus::Unset => {}
                SpanStatus::Ok => {
                    span.record("status", "ok");
                }
                SpanStatus::Error(message) => {
                    span.record("status", "error");
                    debug!(parent: span, error = %message, "span error");
                }
            }
        }
    }

    fn end(&self) {
        self.open
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);

        let mut guard = self.span.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(span) = guard.take() {
            debug!(
                parent: &span,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "span closed"
            );
        }
    }
}

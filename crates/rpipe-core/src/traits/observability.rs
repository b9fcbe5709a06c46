//! Observability capability consumed by the orchestrator.
//!
//! The core only needs to open spans, attach attributes, and mark a status.
//! Which backend receives the data is decided by the [`Observer`]
//! implementation injected at construction time.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::trace::TraceContext;

/// Identifier of a span within one observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpanId(pub u64);

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal status of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message", rename_all = "snake_case")]
pub enum SpanStatus {
    /// No status was recorded.
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error(String),
}

/// Backend-side sink for a single open span.
pub trait SpanRecorder: Send + Sync {
    /// Attaches or overwrites an attribute.
    fn set_attribute(&self, key: &str, value: Value);

    /// Records the span status.
    fn set_status(&self, status: SpanStatus);

    /// Closes the span. Called exactly once.
    fn end(&self);
}

/// Factory for spans. Implementations must be cheap to share across tasks.
pub trait Observer: Send + Sync + fmt::Debug {
    /// Opens a span named `name` under `parent` (or as a root span).
    ///
    /// Every span carries the trace identifier of `trace`.
    fn start_span(
        &self,
        name: &str,
        parent: Option<SpanId>,
        trace: &TraceContext,
        attributes: Vec<(String, Value)>,
    ) -> SpanHandle;
}

/// Scoped handle to an open span.
///
/// The span is closed when [`SpanHandle::end`] is called or, on every other
/// exit path, when the handle is dropped.
pub struct SpanHandle {
    id: SpanId,
    recorder: Box<dyn SpanRecorder>,
    ended: bool,
}

impl SpanHandle {
    /// Wraps a backend recorder.
    pub fn new(id: SpanId, recorder: Box<dyn SpanRecorder>) -> Self {
        Self {
            id,
            recorder,
            ended: false,
        }
    }

    /// Identifier used as `parent` for child spans.
    pub fn id(&self) -> SpanId {
        self.id
    }

    /// Attaches an attribute to the span.
    pub fn set_attribute(&self, key: &str, value: impl Into<Value>) {
        self.recorder.set_attribute(key, value.into());
    }

    /// Records the span status.
    pub fn set_status(&self, status: SpanStatus) {
        self.recorder.set_status(status);
    }

    /// Closes the span explicitly.
    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if !self.ended {
            self.ended = true;
            self.recorder.end();
        }
    }
}

impl Drop for SpanHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanHandle")
            .field("id", &self.id)
            .field("ended", &self.ended)
            .finish()
    }
}

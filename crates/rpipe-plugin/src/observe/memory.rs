//! In-memory observer that records the full span tree.
//!
//! Used by tests and by callers that want to inspect or export spans after a
//! run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use rpipe_core::traits::observability::{
    Observer, SpanHandle, SpanId, SpanRecorder, SpanStatus,
};
use rpipe_core::types::trace::TraceContext;

/// A recorded span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpanRecord {
    /// Span identifier.
    pub id: SpanId,
    /// Parent span, if any.
    pub parent: Option<SpanId>,
    /// Logical span name.
    pub name: String,
    /// Trace the span belongs to.
    pub trace_id: String,
    /// Attributes, last write wins.
    pub attributes: BTreeMap<String, Value>,
    /// Terminal status.
    pub status: SpanStatus,
    /// Whether the span was closed.
    pub ended: bool,
}

type SpanTable = Arc<Mutex<Vec<SpanRecord>>>;

/// Observer keeping every span in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryObserver {
    spans: SpanTable,
    next_id: Arc<AtomicU64>,
}

impl MemoryObserver {
    /// Creates an empty observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every span, in start order.
    pub fn spans(&self) -> Vec<SpanRecord> {
        self.spans.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Spans whose parent is `parent`, in start order.
    pub fn children_of(&self, parent: Option<SpanId>) -> Vec<SpanRecord> {
        self.spans()
            .into_iter()
            .filter(|s| s.parent == parent)
            .collect()
    }

    /// First span named `name`.
    pub fn find(&self, name: &str) -> Option<SpanRecord> {
        self.spans().into_iter().find(|s| s.name == name)
    }
}

impl Observer for MemoryObserver {
    fn start_span(
        &self,
        name: &str,
        parent: Option<SpanId>,
        trace: &TraceContext,
        attributes: Vec<(String, Value)>,
    ) -> SpanHandle {
        let id = SpanId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = SpanRecord {
            id,
            parent,
            name: name.to_string(),
            trace_id: trace.trace_id().to_string(),
            attributes: attributes.into_iter().collect(),
            status: SpanStatus::Unset,
            ended: false,
        };
        self.spans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);

        SpanHandle::new(
            id,
            Box::new(MemoryRecorder {
                id,
                spans: self.spans.clone(),
            }),
        )
    }
}

struct MemoryRecorder {
    id: SpanId,
    spans: SpanTable,
}

impl MemoryRecorder {
    fn update(&self, apply: impl FnOnce(&mut SpanRecord)) {
        let mut spans = self.spans.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = spans.iter_mut().find(|s| s.id == self.id) {
            apply(record);
        }
    }
}

impl SpanRecorder for MemoryRecorder {
    fn set_attribute(&self, key: &str, value: Value) {
        self.update(|r| {
            r.attributes.insert(key.to_string(), value);
        });
    }

    fn set_status(&self, status: SpanStatus) {
        self.update(|r| r.status = status);
    }

    fn end(&self) {
        self.update(|r| r.ended = true);
    }
}

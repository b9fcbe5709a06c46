//! Run requests and the payloads built from them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use rpipe_core::types::trace::TraceContext;

use crate::contract::{LifecycleEvent, TRACE_ID_FIELD};
use crate::payload::{FILE_PATH_FIELD, LIFECYCLE_EVENT_FIELD, PluginInput};

/// Input to one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    /// File under processing.
    pub file_path: String,
    /// Caller-supplied trace identifier.
    #[serde(default)]
    pub trace_id: Option<String>,
    /// Fields added to every plugin payload.
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Fields added only to payloads of one event.
    #[serde(default)]
    pub event_fields: BTreeMap<LifecycleEvent, Map<String, Value>>,
}

impl RunRequest {
    /// Creates a request for `file_path`.
    pub fn new(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            ..Self::default()
        }
    }

    /// Sets the trace identifier.
    pub fn with_trace_id(mut self, trace_id: Option<&str>) -> Self {
        self.trace_id = trace_id.map(str::to_string);
        self
    }

    /// Adds a field to every payload.
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Adds a field to payloads of `event` only.
    pub fn with_event_field(
        mut self,
        event: &LifecycleEvent,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.event_fields
            .entry(event.clone())
            .or_default()
            .insert(key.to_string(), value.into());
        self
    }

    /// Builds the payload for one invocation. `file_path`, `trace_id` and
    /// `lifecycle_event` always reflect the run, whatever the extra fields say.
    pub fn payload(&self, event: &LifecycleEvent, trace: &TraceContext) -> PluginInput {
        let mut data = self.fields.clone();
        if let Some(extra) = self.event_fields.get(event) {
            data.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        PluginInput::from_map(data)
            .with_string(FILE_PATH_FIELD, &self.file_path)
            .with_string(TRACE_ID_FIELD, trace.trace_id())
            .with_string(LIFECYCLE_EVENT_FIELD, event.as_str())
    }
}

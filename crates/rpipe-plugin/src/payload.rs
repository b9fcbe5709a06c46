//! Plugin input and output payloads: flexible key-value maps with typed
//! accessors for the fields every invocation carries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::TRACE_ID_FIELD;

/// Field carrying the path of the file under processing.
pub const FILE_PATH_FIELD: &str = "file_path";
/// Field carrying the lifecycle event being executed.
pub const LIFECYCLE_EVENT_FIELD: &str = "lifecycle_event";
/// Field carrying the invocation status in plugin outputs.
pub const STATUS_FIELD: &str = "status";
/// Field carrying the failure description in error outputs.
pub const ERROR_MESSAGE_FIELD: &str = "error_message";

/// Payload passed to a plugin invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginInput {
    /// Arbitrary data keyed by field name.
    pub data: Map<String, Value>,
}

impl PluginInput {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a payload from an existing JSON object.
    pub fn from_map(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// Inserts a value.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// Inserts a string value.
    pub fn with_string(self, key: &str, value: &str) -> Self {
        self.with_data(key, Value::String(value.to_string()))
    }

    /// Gets a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Gets a string value.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// The trace identifier, when present.
    pub fn trace_id(&self) -> Option<&str> {
        self.get_string(TRACE_ID_FIELD)
    }

    /// The file path, when present.
    pub fn file_path(&self) -> Option<&str> {
        self.get_string(FILE_PATH_FIELD)
    }

    /// Returns which of `fields` are absent or null, in order.
    pub fn missing(&self, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .filter(|f| self.data.get(**f).is_none_or(Value::is_null))
            .map(|f| (*f).to_string())
            .collect()
    }
}

/// Outcome reported by a plugin or recorded by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationStatus {
    /// The plugin completed its work.
    Success,
    /// The plugin (or its invocation) failed.
    Error,
}

impl InvocationStatus {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Payload returned by a plugin.
///
/// Serialized as a flat mapping: `status`, `trace_id`, optional
/// `error_message`, and every plugin-specific field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginOutput {
    /// Whether the plugin succeeded.
    pub status: InvocationStatus,
    /// Trace identifier echoed from the input.
    pub trace_id: String,
    /// Failure description; required when `status` is `error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Plugin-specific fields.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl PluginOutput {
    /// Creates a success output.
    pub fn success(trace_id: &str) -> Self {
        Self {
            status: InvocationStatus::Success,
            trace_id: trace_id.to_string(),
            error_message: None,
            data: Map::new(),
        }
    }

    /// Creates an error output.
    pub fn error(trace_id: &str, message: impl Into<String>) -> Self {
        Self {
            status: InvocationStatus::Error,
            trace_id: trace_id.to_string(),
            error_message: Some(message.into()),
            data: Map::new(),
        }
    }

    /// Inserts a plugin-specific value.
    pub fn with_data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Gets a plugin-specific value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Whether the plugin reported success.
    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }

    /// The full flat mapping, including `status`, `trace_id` and
    /// `error_message`.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = self.data.clone();
        map.insert(
            STATUS_FIELD.to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        map.insert(
            TRACE_ID_FIELD.to_string(),
            Value::String(self.trace_id.clone()),
        );
        if let Some(message) = &self.error_message {
            map.insert(ERROR_MESSAGE_FIELD.to_string(), Value::String(message.clone()));
        }
        map
    }
}

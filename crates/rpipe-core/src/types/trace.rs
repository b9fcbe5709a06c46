//! Immutable correlation token for one pipeline run.
//!
//! A [`TraceContext`] is created once per run and handed by value (or shared
//! reference) to every span and plugin invocation in that run. It exposes no
//! mutation operations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix applied to generated trace identifiers.
const GENERATED_PREFIX: &str = "trace-";

/// Correlation token threaded through a run and all of its invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceContext {
    trace_id: String,
    started_at: DateTime<Utc>,
}

impl TraceContext {
    /// Creates a context that carries `external_id` when it is present and
    /// non-blank, otherwise a freshly generated `trace-<uuid>` identifier.
    pub fn new(external_id: Option<&str>) -> Self {
        let trace_id = match external_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => format!("{GENERATED_PREFIX}{}", Uuid::new_v4()),
        };

        Self {
            trace_id,
            started_at: Utc::now(),
        }
    }

    /// Creates a context with a generated identifier.
    pub fn generate() -> Self {
        Self::new(None)
    }

    /// The opaque trace identifier.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// When the run owning this context started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.trace_id)
    }
}

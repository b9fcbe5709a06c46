//! Isolated invocation of a single plugin.
//!
//! The handler runs on its own task so that a panic is contained, and under
//! the plugin's declared timeout. Input and output are checked against the
//! plugin's contract on either side of the call.

use std::any::Any;

use thiserror::Error;
use tokio::task::JoinError;

use rpipe_core::error::AppError;

use crate::payload::{PluginInput, PluginOutput};
use crate::registry::RegisteredPlugin;

use super::summary::InvocationErrorKind;

/// A failure detected at the plugin boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginInvocationError {
    /// The plugin exceeded its time budget.
    #[error("plugin '{plugin}' timed out after {seconds}s")]
    Timeout {
        /// Plugin name.
        plugin: String,
        /// The exceeded budget.
        seconds: u64,
    },

    /// The plugin panicked or its task was lost.
    #[error("plugin '{plugin}' crashed: {message}")]
    RuntimeFault {
        /// Plugin name.
        plugin: String,
        /// Panic payload or join error.
        message: String,
    },

    /// The payload lacked fields the plugin requires.
    #[error("plugin '{plugin}' input is missing required fields: {}", .fields.join(", "))]
    MissingField {
        /// Plugin name.
        plugin: String,
        /// Absent fields, in declaration order.
        fields: Vec<String>,
    },

    /// The plugin's output broke its declared contract.
    #[error("plugin '{plugin}' output violates its contract: {message}")]
    OutputViolation {
        /// Plugin name.
        plugin: String,
        /// What was wrong.
        message: String,
    },
}

impl PluginInvocationError {
    /// The recorded error category.
    pub fn kind(&self) -> InvocationErrorKind {
        match self {
            Self::Timeout { .. } => InvocationErrorKind::Timeout,
            Self::RuntimeFault { .. } => InvocationErrorKind::RuntimeFault,
            Self::MissingField { .. } => InvocationErrorKind::MissingField,
            Self::OutputViolation { .. } => InvocationErrorKind::OutputViolation,
        }
    }
}

impl From<PluginInvocationError> for AppError {
    fn from(err: PluginInvocationError) -> Self {
        match err {
            PluginInvocationError::Timeout { .. } => AppError::timeout(err.to_string()),
            _ => AppError::plugin(err.to_string()),
        }
    }
}

/// Invokes `plugin` with `input`, enforcing its contract and timeout.
///
/// `trace_id` is the run's trace; the output must echo it.
pub async fn invoke_isolated(
    plugin: &RegisteredPlugin,
    input: PluginInput,
    trace_id: &str,
    default_timeout_seconds: u64,
) -> Result<PluginOutput, PluginInvocationError> {
    let spec = &plugin.spec;

    let missing = spec.input_schema.missing_in(&input.data);
    if !missing.is_empty() {
        return Err(PluginInvocationError::MissingField {
            plugin: spec.name.clone(),
            fields: missing,
        });
    }

    let budget = spec.timeout(default_timeout_seconds);
    let handler = plugin.handler.clone();
    let mut task = tokio::spawn(async move { handler.invoke(input).await });

    let output = match tokio::time::timeout(budget, &mut task).await {
        Ok(Ok(output)) => output,
        Ok(Err(join_error)) => {
            return Err(PluginInvocationError::RuntimeFault {
                plugin: spec.name.clone(),
                message: describe_join_error(join_error),
            });
        }
        Err(_) => {
            task.abort();
            return Err(PluginInvocationError::Timeout {
                plugin: spec.name.clone(),
                seconds: budget.as_secs(),
            });
        }
    };

    if output.trace_id != trace_id {
        return Err(PluginInvocationError::OutputViolation {
            plugin: spec.name.clone(),
            message: format!(
                "trace_id '{}' does not match run trace '{trace_id}'",
                output.trace_id
            ),
        });
    }

    if output.is_success() {
        let missing = spec.output_schema.missing_in(&output.to_map());
        if !missing.is_empty() {
            return Err(PluginInvocationError::OutputViolation {
                plugin: spec.name.clone(),
                message: format!("missing fields: {}", missing.join(", ")),
            });
        }
    }

    Ok(output)
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}

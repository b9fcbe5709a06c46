//! Contract validation errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rpipe_core::error::AppError;

/// Why a plugin specification was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractErrorKind {
    /// A required field is absent.
    MissingField,
    /// A field is present but structurally invalid.
    SchemaViolation,
}

impl fmt::Display for ContractErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "MissingField"),
            Self::SchemaViolation => write!(f, "SchemaViolation"),
        }
    }
}

/// A rejected plugin specification, naming the offending field(s).
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ContractError {
    /// Error category.
    pub kind: ContractErrorKind,
    /// Offending field paths.
    pub fields: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

impl ContractError {
    /// Builds a `MissingField` error for the given field paths.
    pub fn missing_fields(fields: Vec<String>) -> Self {
        let message = format!("Missing fields: {}", fields.join(", "));
        Self {
            kind: ContractErrorKind::MissingField,
            fields,
            message,
        }
    }

    /// Builds a `MissingField` error with a custom message.
    pub fn missing_with_message(fields: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ContractErrorKind::MissingField,
            fields,
            message: message.into(),
        }
    }

    /// Builds a `SchemaViolation` error.
    pub fn schema_violation(fields: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ContractErrorKind::SchemaViolation,
            fields,
            message: message.into(),
        }
    }

    /// Returns whether `field` is among the offending fields.
    pub fn names(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field || f.ends_with(&format!(".{field}")))
    }
}

impl From<ContractError> for AppError {
    fn from(err: ContractError) -> Self {
        AppError::contract(err.to_string())
    }
}

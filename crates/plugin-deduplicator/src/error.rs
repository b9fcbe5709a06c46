//! Error type for the duplicate-detection store.

use std::path::PathBuf;

use thiserror::Error;

use rpipe_core::error::{AppError, ErrorKind};

/// Failures of the fingerprint store and its backends.
#[derive(Debug, Error)]
pub enum DedupError {
    /// The snapshot file could not be read or written.
    #[error("fingerprint store I/O failed for {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but is not a fingerprint map.
    #[error("fingerprint store {path} is corrupted: {source}")]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize fingerprint store: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The configured backend is unknown.
    #[error("unknown fingerprint store backend '{0}' (supported: file, memory)")]
    UnknownBackend(String),
}

impl From<DedupError> for AppError {
    fn from(err: DedupError) -> Self {
        let kind = match &err {
            DedupError::UnknownBackend(_) => ErrorKind::Configuration,
            DedupError::Serialize(_) => ErrorKind::Serialization,
            DedupError::Io { .. } | DedupError::Corrupt { .. } => ErrorKind::Storage,
        };
        let message = err.to_string();
        AppError::with_source(kind, message, err)
    }
}

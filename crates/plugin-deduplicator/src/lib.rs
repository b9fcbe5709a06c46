//! Duplicate-detection plugin for R_PIPELINE.
//!
//! A content fingerprint maps to the first path it was seen at. The mapping
//! lives in a [`DuplicateStore`] that serializes access per fingerprint and
//! persists through an injected [`FingerprintBackend`].

pub mod backend;
pub mod error;
pub mod fingerprint;
pub mod plugin;
pub mod store;

pub use backend::{FingerprintBackend, JsonFileBackend, MemoryBackend};
pub use error::DedupError;
pub use plugin::{DeduplicatorPlugin, ENTRY_POINT};
pub use store::DuplicateStore;

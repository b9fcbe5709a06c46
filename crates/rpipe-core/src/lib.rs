//! # rpipe-core
//!
//! Core crate for R_PIPELINE. Contains configuration schemas, the immutable
//! trace context, the observability capability consumed by the orchestrator,
//! and the unified error system.
//!
//! This crate has **no** internal dependencies on other R_PIPELINE crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
pub use types::trace::TraceContext;

//! Core type definitions used across the R_PIPELINE workspace.

pub mod trace;

pub use trace::TraceContext;

//! Core traits defined in `rpipe-core` and implemented by other crates.

pub mod observability;

pub use observability::{Observer, SpanHandle, SpanId, SpanRecorder, SpanStatus};

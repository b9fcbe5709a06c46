//! Observability backends for the orchestrator.

pub mod memory;
pub mod tracing_observer;

pub use memory::{MemoryObserver, SpanRecord};
pub use tracing_observer::TracingObserver;

//! # rpipe-plugin
//!
//! Plugin lifecycle engine for R_PIPELINE. Provides:
//!
//! - Plugin contracts parsed from `plugin.spec.json` documents
//! - A registry of admitted plugins ordered per lifecycle event
//! - Quality gates (coverage, security scan, contract compliance) guarding admission
//! - The lifecycle orchestrator with per-plugin isolation and timeouts
//! - `tracing` and in-memory observability backends

pub mod catalog;
pub mod contract;
pub mod gates;
pub mod loader;
pub mod manager;
pub mod observe;
pub mod orchestrator;
pub mod payload;
pub mod prelude;
pub mod registry;
pub mod runtime;
pub mod traits;

pub use catalog::EntryPointCatalog;
pub use contract::{ContractError, ContractErrorKind, LifecycleEvent, PluginSpec};
pub use gates::{GateReport, QualityGate, QualityGateEngine};
pub use loader::PluginLoader;
pub use manager::{PluginManager, SubmissionOutcome};
pub use orchestrator::{LifecycleOrchestrator, RunRequest, RunStatus, RunSummary};
pub use payload::{InvocationStatus, PluginInput, PluginOutput};
pub use registry::{PluginRegistry, PluginResolver, RegisteredPlugin};
pub use runtime::PipelineRuntime;
pub use traits::{ClosureHandler, PluginHandler};

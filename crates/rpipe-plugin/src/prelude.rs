//! Prelude for plugin authors.

pub use async_trait::async_trait;

pub use crate::catalog::EntryPointCatalog;
pub use crate::contract::{FieldSchema, LifecycleEvent, PluginSpec, RiskLevel, TRACE_ID_FIELD};
pub use crate::payload::{FILE_PATH_FIELD, InvocationStatus, PluginInput, PluginOutput};
pub use crate::traits::{ClosureHandler, PluginHandler};

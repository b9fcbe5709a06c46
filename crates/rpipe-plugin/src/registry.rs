//! Plugin registry: admitted contracts indexed by lifecycle event, kept in
//! registration order.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use rpipe_core::error::AppError;
use rpipe_core::result::AppResult;

use crate::contract::{ContractError, LifecycleEvent, PluginSpec};
use crate::gates::report::Admission;
use crate::traits::PluginHandler;

/// An admitted contract together with its bound entry point.
#[derive(Debug, Clone)]
pub struct RegisteredPlugin {
    /// The validated contract.
    pub spec: Arc<PluginSpec>,
    /// The handler named by `spec.entry_point`.
    pub handler: Arc<dyn PluginHandler>,
}

impl RegisteredPlugin {
    /// The plugin name.
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Source of the plugins bound to a lifecycle event.
///
/// The orchestrator depends on this seam rather than on the registry so that
/// an unavailable source can be surfaced as a failed run.
#[async_trait]
pub trait PluginResolver: Send + Sync + std::fmt::Debug {
    /// Returns the enabled plugins for `event`, in invocation order.
    async fn resolve(&self, event: &LifecycleEvent) -> AppResult<Vec<RegisteredPlugin>>;
}

/// What [`PluginRegistry::admit`] did with an admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitOutcome {
    /// Appended at `position`.
    Inserted {
        /// Index within the event sequence.
        position: usize,
    },
    /// Replaced a same-name entry at `position`.
    Replaced {
        /// Index within the event sequence.
        position: usize,
    },
    /// The contract was disabled; an older admitted version was removed.
    Removed,
    /// The contract was disabled and nothing was registered under its name.
    Skipped,
}

/// Registry of admitted plugins organized by lifecycle event.
#[derive(Debug)]
pub struct PluginRegistry {
    /// Events this pipeline runs, in canonical order.
    supported: Vec<LifecycleEvent>,
    /// Event → plugins in registration order.
    events: RwLock<HashMap<LifecycleEvent, Vec<RegisteredPlugin>>>,
}

impl PluginRegistry {
    /// Creates an empty registry accepting the given events.
    pub fn new(supported: Vec<LifecycleEvent>) -> Self {
        Self {
            supported,
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Events accepted by this registry, in canonical order.
    pub fn supported_events(&self) -> &[LifecycleEvent] {
        &self.supported
    }

    /// Validates a contract for submission. Does not register it.
    pub fn submit(&self, spec: &PluginSpec) -> Result<(), ContractError> {
        spec.validate_contract()?;
        spec.ensure_event_supported(&self.supported)?;
        debug!(plugin = %spec.name, version = %spec.version, "Contract accepted for gating");
        Ok(())
    }

    /// Registers a plugin that passed every quality gate.
    ///
    /// A same-name entry for the same event is replaced in place. A same-name
    /// entry under another event is moved to the end of the new event.
    pub async fn admit(&self, admission: Admission) -> AdmitOutcome {
        let plugin = admission.into_plugin();
        let name = plugin.spec.name.clone();
        let event = plugin.spec.lifecycle_event.clone();

        let mut events = self.events.write().await;

        if !plugin.spec.enabled {
            let removed = remove_named(&mut events, &name);
            info!(plugin = %name, removed, "Disabled plugin not admitted");
            return if removed {
                AdmitOutcome::Removed
            } else {
                AdmitOutcome::Skipped
            };
        }

        let moved_elsewhere = events
            .iter()
            .any(|(e, entries)| e != &event && entries.iter().any(|p| p.spec.name == name));
        if moved_elsewhere {
            remove_named(&mut events, &name);
        }

        let entries = events.entry(event.clone()).or_default();
        let outcome = match entries.iter().position(|p| p.spec.name == name) {
            Some(position) => {
                entries[position] = plugin;
                AdmitOutcome::Replaced { position }
            }
            None => {
                entries.push(plugin);
                AdmitOutcome::Inserted {
                    position: entries.len() - 1,
                }
            }
        };

        info!(plugin = %name, event = %event, outcome = ?outcome, "Plugin admitted");
        outcome
    }

    /// Returns the enabled plugins for `event` in registration order.
    pub async fn resolve(&self, event: &LifecycleEvent) -> Vec<RegisteredPlugin> {
        let events = self.events.read().await;
        events
            .get(event)
            .map(|entries| entries.iter().filter(|p| p.spec.enabled).cloned().collect())
            .unwrap_or_default()
    }

    /// Removes a plugin from whichever event holds it. Returns whether it was
    /// present.
    pub async fn deregister(&self, name: &str) -> bool {
        let mut events = self.events.write().await;
        let removed = remove_named(&mut events, name);
        if removed {
            info!(plugin = %name, "Plugin deregistered");
        }
        removed
    }

    /// Whether a plugin with `name` is registered.
    pub async fn contains(&self, name: &str) -> bool {
        let events = self.events.read().await;
        events
            .values()
            .any(|entries| entries.iter().any(|p| p.spec.name == name))
    }

    /// Returns every registered plugin grouped by event, in canonical event
    /// order.
    pub async fn list(&self) -> Vec<(LifecycleEvent, Vec<RegisteredPlugin>)> {
        let events = self.events.read().await;
        self.supported
            .iter()
            .filter_map(|e| events.get(e).map(|entries| (e.clone(), entries.clone())))
            .filter(|(_, entries)| !entries.is_empty())
            .collect()
    }

    /// Total number of registered plugins.
    pub async fn count(&self) -> usize {
        let events = self.events.read().await;
        events.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PluginResolver for PluginRegistry {
    async fn resolve(&self, event: &LifecycleEvent) -> AppResult<Vec<RegisteredPlugin>> {
        if !self.supported.contains(event) {
            return Err(AppError::not_found(format!(
                "lifecycle event '{event}' is not configured"
            )));
        }
        Ok(PluginRegistry::resolve(self, event).await)
    }
}

fn remove_named(events: &mut HashMap<LifecycleEvent, Vec<RegisteredPlugin>>, name: &str) -> bool {
    let mut removed = false;
    for entries in events.values_mut() {
        let before = entries.len();
        entries.retain(|p| p.spec.name != name);
        removed |= entries.len() != before;
    }
    events.retain(|_, entries| !entries.is_empty());
    removed
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;
    use crate::gates::report::GateReport;
    use crate::payload::PluginOutput;
    use crate::traits::ClosureHandler;

    fn spec(name: &str, version: &str, event: &str, enabled: bool) -> PluginSpec {
        PluginSpec::from_value(json!({
            "plugin_name": name,
            "version": version,
            "lifecycle_event": event,
            "entry_point": name,
            "enabled": enabled,
            "input_schema": {"required": ["file_path", "trace_id"]},
            "output_schema": {"required": ["status", "trace_id"]}
        }))
        .unwrap()
    }

    fn admission(spec: PluginSpec) -> Admission {
        let handler = ClosureHandler::wrap(&spec.name, |input| async move {
            PluginOutput::success(input.trace_id().unwrap_or_default())
        });
        GateReport::new(Path::new("/plugins/x"), Vec::new())
            .authorize(spec, handler)
            .unwrap()
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(LifecycleEvent::ordered(&[
            "file_detected".to_string(),
            "pre_merge".to_string(),
        ]))
    }

    fn pre_merge() -> LifecycleEvent {
        LifecycleEvent::parse("pre_merge").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_keeps_registration_order() {
        let registry = registry();
        registry.admit(admission(spec("x", "1.0.0", "pre-merge", true))).await;
        registry.admit(admission(spec("y", "1.0.0", "pre-merge", true))).await;

        let names: Vec<String> = registry
            .resolve(&pre_merge())
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_readmission_replaces_in_place() {
        let registry = registry();
        registry.admit(admission(spec("x", "1.0.0", "pre_merge", true))).await;
        registry.admit(admission(spec("y", "1.0.0", "pre_merge", true))).await;

        let outcome = registry.admit(admission(spec("x", "2.0.0", "pre_merge", true))).await;
        assert_eq!(outcome, AdmitOutcome::Replaced { position: 0 });

        let resolved = registry.resolve(&pre_merge()).await;
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].name(), "x");
        assert_eq!(resolved[0].spec.version, "2.0.0");
    }

    #[tokio::test]
    async fn test_readmission_under_new_event_moves_plugin() {
        let registry = registry();
        registry.admit(admission(spec("x", "1.0.0", "file_detected", true))).await;
        registry.admit(admission(spec("x", "1.1.0", "pre_merge", true))).await;

        let detected = LifecycleEvent::parse("file_detected").unwrap();
        assert!(registry.resolve(&detected).await.is_empty());
        assert_eq!(registry.resolve(&pre_merge()).await.len(), 1);
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_contract_removes_older_version() {
        let registry = registry();
        registry.admit(admission(spec("x", "1.0.0", "pre_merge", true))).await;
        let outcome = registry.admit(admission(spec("x", "1.1.0", "pre_merge", false))).await;
        assert_eq!(outcome, AdmitOutcome::Removed);
        assert!(!registry.contains("x").await);

        let outcome = registry.admit(admission(spec("z", "1.0.0", "pre_merge", false))).await;
        assert_eq!(outcome, AdmitOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_unknown_event_resolves_empty() {
        let registry = registry();
        let event = LifecycleEvent::parse("post_merge").unwrap();
        assert!(PluginRegistry::resolve(&registry, &event).await.is_empty());
        assert!(PluginResolver::resolve(&registry, &event).await.is_err());
    }

    #[tokio::test]
    async fn test_deregister_is_noop_when_absent() {
        let registry = registry();
        registry.admit(admission(spec("x", "1.0.0", "pre_merge", true))).await;
        assert!(!registry.deregister("missing").await);
        assert!(registry.deregister("x").await);
        assert!(registry.resolve(&pre_merge()).await.is_empty());
        assert!(registry.list().await.is_empty());
    }

    #[test]
    fn test_submit_rejects_unsupported_event() {
        let registry = registry();
        let err = registry
            .submit(&spec("x", "1.0.0", "post_merge", true))
            .unwrap_err();
        assert_eq!(err.fields, vec!["lifecycle_event".to_string()]);
    }
}

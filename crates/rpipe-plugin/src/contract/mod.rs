//! Plugin contract: the structural specification a plugin must satisfy.
//!
//! A contract is read from a `plugin.spec.json` document. Parsing happens in
//! three passes so that errors are as specific as possible:
//!
//! 1. top-level field presence on the raw JSON (`MissingField`, all at once),
//! 2. typed deserialization (`SchemaViolation` on wrong types),
//! 3. contract rules: `trace_id` in both schemas (`MissingField`), then
//!    version, timeout, and field-name rules (`SchemaViolation`).

pub mod error;
pub mod event;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

pub use error::{ContractError, ContractErrorKind};
pub use event::LifecycleEvent;

/// Field every input and output schema must require.
pub const TRACE_ID_FIELD: &str = "trace_id";

/// Top-level fields that must be present in every specification document.
/// The first entry also accepts the short alias `name`.
const REQUIRED_TOP_LEVEL: &[&str] = &[
    "plugin_name",
    "version",
    "lifecycle_event",
    "input_schema",
    "output_schema",
    "entry_point",
    "enabled",
];

/// Operational risk classification declared by the plugin author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Read-only or trivially reversible behavior.
    #[default]
    Low,
    /// Mutates pipeline state in recoverable ways.
    Medium,
    /// Mutates files or external systems.
    High,
    /// Irreversible effects.
    Critical,
}

/// Ordered set of field names a payload must carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Required field names, in declaration order, without repeats.
    #[serde(default)]
    pub required: Vec<String>,
    /// Remaining schema keywords, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl FieldSchema {
    /// Builds a schema from field names, dropping repeats.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::default();
        for field in fields {
            let field = field.into();
            if !schema.required.contains(&field) {
                schema.required.push(field);
            }
        }
        schema
    }

    /// Whether `field` is required.
    pub fn requires(&self, field: &str) -> bool {
        self.required.iter().any(|f| f == field)
    }

    /// Returns the required fields absent from `payload`, in order.
    pub fn missing_in(&self, payload: &serde_json::Map<String, Value>) -> Vec<String> {
        self.required
            .iter()
            .filter(|f| payload.get(f.as_str()).is_none_or(Value::is_null))
            .cloned()
            .collect()
    }

    fn dedup(&mut self) {
        let mut seen: Vec<String> = Vec::with_capacity(self.required.len());
        self.required.retain(|f| {
            if seen.contains(f) {
                false
            } else {
                seen.push(f.clone());
                true
            }
        });
    }
}

/// A plugin specification document.
#[derive(Debug, Clone, PartialEq, Validate, Serialize, Deserialize)]
pub struct PluginSpec {
    /// Unique plugin name.
    #[serde(rename = "plugin_name", alias = "name")]
    #[validate(length(min = 1, message = "plugin_name must not be empty"))]
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Author or maintainer.
    #[serde(default)]
    pub author: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Lifecycle event the plugin is bound to.
    pub lifecycle_event: LifecycleEvent,
    /// Name of the handler in the entry-point catalog.
    #[validate(length(min = 1, message = "entry_point must not be empty"))]
    pub entry_point: String,
    /// Whether the plugin should run.
    pub enabled: bool,
    /// Per-invocation time budget. Falls back to the pipeline default.
    #[serde(default)]
    #[validate(range(min = 1, message = "timeout_seconds must be a positive integer"))]
    pub timeout_seconds: Option<u64>,
    /// Declared operational risk.
    #[serde(default)]
    pub risk_level: RiskLevel,
    /// Whether the plugin can undo its effects.
    #[serde(default)]
    pub rollback_supported: bool,
    /// Fields the plugin requires in its input.
    pub input_schema: FieldSchema,
    /// Fields the plugin guarantees in a successful output.
    pub output_schema: FieldSchema,
    /// Declared runtime dependencies.
    #[serde(default)]
    pub dependencies: BTreeMap<String, Value>,
}

impl PluginSpec {
    /// Parses and validates a raw specification document.
    pub fn from_value(document: Value) -> Result<Self, ContractError> {
        let Value::Object(map) = &document else {
            return Err(ContractError::schema_violation(
                Vec::new(),
                "Plugin specification must be a JSON object",
            ));
        };

        let missing: Vec<String> = REQUIRED_TOP_LEVEL
            .iter()
            .filter(|field| {
                let present = map.contains_key(**field)
                    || (**field == "plugin_name" && map.contains_key("name"));
                !present
            })
            .map(|field| (*field).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ContractError::missing_fields(missing));
        }

        let mut spec: Self = serde_json::from_value(document).map_err(|e| {
            ContractError::schema_violation(Vec::new(), format!("Invalid specification: {e}"))
        })?;
        spec.input_schema.dedup();
        spec.output_schema.dedup();
        spec.validate_contract()?;
        Ok(spec)
    }

    /// Reads, parses, and validates a specification file.
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ContractError::schema_violation(
                Vec::new(),
                format!("Cannot read specification '{}': {e}", path.display()),
            )
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|e| {
            ContractError::schema_violation(
                Vec::new(),
                format!("Specification '{}' is not valid JSON: {e}", path.display()),
            )
        })?;
        Self::from_value(document)
    }

    /// Checks the contract rules on an already-typed specification.
    pub fn validate_contract(&self) -> Result<(), ContractError> {
        let mut missing = Vec::new();
        let mut messages = Vec::new();
        if !self.input_schema.requires(TRACE_ID_FIELD) {
            missing.push(format!("input_schema.required.{TRACE_ID_FIELD}"));
            messages.push("Input schema must require trace_id");
        }
        if !self.output_schema.requires(TRACE_ID_FIELD) {
            missing.push(format!("output_schema.required.{TRACE_ID_FIELD}"));
            messages.push("Output schema must require trace_id");
        }
        if !missing.is_empty() {
            return Err(ContractError::missing_with_message(
                missing,
                messages.join("; "),
            ));
        }

        if let Err(errors) = Validate::validate(self) {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| match k.as_ref() {
                    "name" => "plugin_name".to_string(),
                    other => other.to_string(),
                })
                .collect();
            fields.sort();
            return Err(ContractError::schema_violation(fields, errors.to_string()));
        }

        if !is_semver(&self.version) {
            return Err(ContractError::schema_violation(
                vec!["version".to_string()],
                format!("version '{}' is not a semantic version", self.version),
            ));
        }

        let blank: Vec<String> = [("input_schema", &self.input_schema), ("output_schema", &self.output_schema)]
            .iter()
            .filter(|(_, schema)| schema.required.iter().any(|f| f.trim().is_empty()))
            .map(|(name, _)| format!("{name}.required"))
            .collect();
        if !blank.is_empty() {
            return Err(ContractError::schema_violation(
                blank,
                "required field names must not be blank",
            ));
        }

        Ok(())
    }

    /// The effective invocation timeout.
    pub fn timeout(&self, default_seconds: u64) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(default_seconds).max(1))
    }

    /// Rejects a contract bound to an event the pipeline does not run.
    pub fn ensure_event_supported(&self, supported: &[LifecycleEvent]) -> Result<(), ContractError> {
        if supported.contains(&self.lifecycle_event) {
            return Ok(());
        }
        let names: Vec<&str> = supported.iter().map(LifecycleEvent::as_str).collect();
        Err(ContractError::schema_violation(
            vec!["lifecycle_event".to_string()],
            format!(
                "lifecycle event '{}' is not supported (expected one of: {})",
                self.lifecycle_event,
                names.join(", ")
            ),
        ))
    }
}

/// Accepts `MAJOR.MINOR.PATCH` with an optional `-pre` and/or `+build` suffix.
fn is_semver(version: &str) -> bool {
    let (without_build, build) = match version.split_once('+') {
        Some((head, build)) => (head, Some(build)),
        None => (version, None),
    };
    let (core, pre) = match without_build.split_once('-') {
        Some((head, pre)) => (head, Some(pre)),
        None => (without_build, None),
    };

    let suffix_ok = |s: Option<&str>| {
        s.is_none_or(|s| {
            !s.is_empty()
                && s.split('.')
                    .all(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        })
    };

    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) && (p.len() == 1 || !p.starts_with('0'))
        })
        && suffix_ok(pre)
        && suffix_ok(build)
}

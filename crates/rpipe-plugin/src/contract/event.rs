//! Lifecycle event names.
//!
//! Events are an open, configurable set. Names are normalized to snake case
//! so that `FileDetected`, `file-detected` and `file_detected` all refer to
//! the same event.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named stage in file processing that triggers registered plugins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LifecycleEvent(String);

impl LifecycleEvent {
    /// A file was observed for the first time.
    pub const FILE_DETECTED: &'static str = "file_detected";
    /// A file is about to be merged into its destination.
    pub const PRE_MERGE: &'static str = "pre_merge";
    /// A merge produced a conflict.
    pub const MERGE_CONFLICT: &'static str = "merge_conflict";
    /// A merge completed.
    pub const POST_MERGE: &'static str = "post_merge";

    /// Parses and normalizes an event name. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Builds the ordered event list from configured names, skipping blanks
    /// and repeated entries.
    pub fn ordered(names: &[String]) -> Vec<Self> {
        let mut events: Vec<Self> = Vec::with_capacity(names.len());
        for event in names.iter().filter_map(|n| Self::parse(n)) {
            if !events.contains(&event) {
                events.push(event);
            }
        }
        events
    }

    /// Returns the canonical snake-case name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LifecycleEvent {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "lifecycle event name must not be blank".to_string())
    }
}

impl From<LifecycleEvent> for String {
    fn from(event: LifecycleEvent) -> Self {
        event.0
    }
}

fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let split_camel = trimmed.chars().any(|c| c.is_ascii_lowercase());
    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut after_word_char = false;

    for c in trimmed.chars() {
        if matches!(c, '-' | '_' | ' ' | '.') {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            after_word_char = false;
        } else if c.is_ascii_uppercase() {
            if split_camel && after_word_char {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            after_word_char = false;
        } else {
            out.push(c);
            after_word_char = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    out.trim_end_matches('_').to_string()
}

//! Plugin directory loader.
//!
//! Each sub-directory of the plugin root that contains a specification file
//! is one plugin. Gate sequences for different plugins run concurrently;
//! admission then happens in directory-name order so that registration order
//! is reproducible across restarts.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{error, info};

use rpipe_core::error::AppError;
use rpipe_core::result::AppResult;

use crate::manager::{PluginManager, SubmissionOutcome};

/// Discovers and submits plugin directories.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    root: PathBuf,
    spec_file_name: String,
}

impl PluginLoader {
    /// Creates a loader for `root`.
    pub fn new(root: impl Into<PathBuf>, spec_file_name: &str) -> Self {
        Self {
            root: root.into(),
            spec_file_name: spec_file_name.to_string(),
        }
    }

    /// Lists plugin directories, sorted by name. A missing root yields none.
    pub async fn discover(&self) -> AppResult<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(root = %self.root.display(), "Plugin directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    rpipe_core::error::ErrorKind::Storage,
                    format!("Cannot read plugin directory '{}'", self.root.display()),
                    e,
                ));
            }
        };

        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_plugin_dir(&path, &self.spec_file_name).await {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// Submits every discovered plugin through `manager`.
    pub async fn load_all(&self, manager: &PluginManager) -> AppResult<Vec<SubmissionOutcome>> {
        let dirs = self.discover().await?;
        let candidates = join_all(dirs.iter().map(|dir| manager.evaluate(dir))).await;

        let mut outcomes = Vec::with_capacity(candidates.len());
        for (dir, candidate) in dirs.iter().zip(candidates) {
            match candidate {
                Ok(candidate) => outcomes.push(manager.admit_candidate(candidate).await),
                Err(e) => error!(path = %dir.display(), error = %e, "Plugin submission failed"),
            }
        }

        let admitted = outcomes.iter().filter(|o| o.admitted).count();
        info!(
            root = %self.root.display(),
            discovered = dirs.len(),
            admitted,
            "Plugin directory loaded"
        );
        Ok(outcomes)
    }
}

async fn is_plugin_dir(path: &Path, spec_file_name: &str) -> bool {
    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    is_dir && tokio::fs::try_exists(path.join(spec_file_name)).await.unwrap_or(false)
}

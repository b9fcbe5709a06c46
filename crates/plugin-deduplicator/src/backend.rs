//! Persistence boundary of the fingerprint store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use rpipe_core::config::store::StoreConfig;

use crate::error::DedupError;

/// Durable fingerprint → first-seen-path mapping.
#[async_trait]
pub trait FingerprintBackend: Send + Sync + std::fmt::Debug {
    /// Loads every recorded fingerprint.
    async fn load(&self) -> Result<BTreeMap<String, String>, DedupError>;

    /// Durably records a first sighting. Returns the already recorded owner
    /// when `fingerprint` has one, in which case nothing is written. When
    /// this returns `Err` or is dropped before completing, the previously
    /// persisted state is intact.
    async fn record(&self, fingerprint: &str, path: &str) -> Result<Option<String>, DedupError>;
}

/// Builds the backend named by configuration.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn FingerprintBackend>, DedupError> {
    match config.backend.as_str() {
        "file" => {
            info!(path = %config.path, "Using JSON file fingerprint store");
            Ok(Arc::new(JsonFileBackend::new(&config.path)))
        }
        "memory" => {
            info!("Using in-memory fingerprint store");
            Ok(Arc::new(MemoryBackend::new()))
        }
        other => Err(DedupError::UnknownBackend(other.to_string())),
    }
}

/// Process-lifetime backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FingerprintBackend for MemoryBackend {
    async fn load(&self) -> Result<BTreeMap<String, String>, DedupError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn record(&self, fingerprint: &str, path: &str) -> Result<Option<String>, DedupError> {
        let mut entries = self.entries.lock().await;
        if let Some(owner) = entries.get(fingerprint) {
            return Ok(Some(owner.clone()));
        }
        entries.insert(fingerprint.to_string(), path.to_string());
        Ok(None)
    }
}

/// JSON snapshot file, rewritten atomically on every record.
///
/// Each write goes to a sibling temporary file which is flushed to disk and
/// then renamed over the snapshot, so a crash leaves either the old or the
/// new snapshot, never a torn one.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
    snapshot: Mutex<Option<BTreeMap<String, String>>>,
}

impl JsonFileBackend {
    /// Creates a backend persisting to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: Mutex::new(None),
        }
    }

    /// The snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_snapshot(&self) -> Result<BTreeMap<String, String>, DedupError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(DedupError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&raw).map_err(|source| DedupError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_snapshot(&self, entries: &BTreeMap<String, String>) -> Result<(), DedupError> {
        let body = serde_json::to_vec_pretty(entries)?;
        let io_err = |source| DedupError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(io_err)?;
        file.write_all(&body).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);

        if let Err(source) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(io_err(source));
        }
        Ok(())
    }
}

#[async_trait]
impl FingerprintBackend for JsonFileBackend {
    async fn load(&self) -> Result<BTreeMap<String, String>, DedupError> {
        let mut snapshot = self.snapshot.lock().await;
        let entries = self.read_snapshot().await?;
        debug!(path = %self.path.display(), entries = entries.len(), "Fingerprint snapshot loaded");
        *snapshot = Some(entries.clone());
        Ok(entries)
    }

    async fn record(&self, fingerprint: &str, path: &str) -> Result<Option<String>, DedupError> {
        let mut snapshot = self.snapshot.lock().await;
        let mut next = match snapshot.as_ref() {
            Some(entries) => entries.clone(),
            None => self.read_snapshot().await?,
        };
        if let Some(owner) = next.get(fingerprint) {
            let owner = owner.clone();
            *snapshot = Some(next);
            return Ok(Some(owner));
        }

        // The committed snapshot only changes once the rename has landed.
        next.insert(fingerprint.to_string(), path.to_string());
        self.write_snapshot(&next).await?;
        *snapshot = Some(next);
        Ok(None)
    }
}

//! Duplicate-detection store.
//!
//! Every fingerprint owns a slot guarded by its own async mutex. Checks for
//! different fingerprints proceed in parallel; two concurrent first sightings
//! of the same fingerprint are serialized so that exactly one of them records
//! ownership.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use rpipe_core::config::store::StoreConfig;
use rpipe_core::result::AppResult;

use crate::backend::{self, FingerprintBackend};

type Slot = Arc<Mutex<Option<String>>>;

/// Fingerprint → first-seen path, first write wins.
#[derive(Debug)]
pub struct DuplicateStore {
    slots: DashMap<String, Slot>,
    backend: Arc<dyn FingerprintBackend>,
}

impl DuplicateStore {
    /// Opens a store, loading every fingerprint the backend holds.
    pub async fn open(backend: Arc<dyn FingerprintBackend>) -> AppResult<Self> {
        let entries = backend.load().await?;
        let slots = DashMap::with_capacity(entries.len());
        for (fingerprint, path) in entries {
            slots.insert(fingerprint, Arc::new(Mutex::new(Some(path))));
        }
        info!(entries = slots.len(), "Duplicate store opened");
        Ok(Self { slots, backend })
    }

    /// Opens the store described by configuration.
    pub async fn from_config(config: &StoreConfig) -> AppResult<Self> {
        let backend = backend::from_config(config)?;
        Self::open(backend).await
    }

    /// Opens an empty, non-persistent store.
    pub async fn in_memory() -> AppResult<Self> {
        Self::open(Arc::new(backend::MemoryBackend::new())).await
    }

    /// Returns `(true, first_path)` when `fingerprint` was seen before.
    /// Otherwise records `file_path` as its owner and returns `(false, "")`.
    ///
    /// Ownership is only recorded once the backend has persisted it; a
    /// failed or abandoned write leaves the fingerprint unowned. An owner
    /// the backend already holds is reported as the first path.
    pub async fn check_duplicate(
        &self,
        file_path: &str,
        fingerprint: &str,
    ) -> AppResult<(bool, String)> {
        let slot = self
            .slots
            .entry(fingerprint.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut owner = slot.lock().await;
        if let Some(first) = owner.as_ref() {
            debug!(fingerprint = %fingerprint, duplicate_of = %first, "Duplicate fingerprint");
            return Ok((true, first.clone()));
        }

        if let Some(first) = self.backend.record(fingerprint, file_path).await? {
            debug!(fingerprint = %fingerprint, duplicate_of = %first, "Fingerprint already persisted");
            *owner = Some(first.clone());
            return Ok((true, first));
        }
        *owner = Some(file_path.to_string());
        debug!(fingerprint = %fingerprint, path = %file_path, "Fingerprint recorded");
        Ok((false, String::new()))
    }

    /// The recorded owner of `fingerprint`.
    pub async fn owner_of(&self, fingerprint: &str) -> Option<String> {
        let slot = self.slots.get(fingerprint).map(|s| s.value().clone())?;
        let owner = slot.lock().await;
        owner.clone()
    }

    /// Number of fingerprints with a recorded owner or a pending check.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

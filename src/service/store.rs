//! Persistence of generated images. Records are written once and never mutated, so
//! every backend is a put/get keyed by UUID.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageBackend;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage is disabled")]
    Disabled,

    #[error("Corrupt record {0}: {1}")]
    Corrupt(Uuid, String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A generated PNG with its identifier and creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub id: Uuid,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait BarcodeStore: Send + Sync {
    /// Whether records are actually kept.
    fn enabled(&self) -> bool {
        true
    }

    async fn put(&self, image: &StoredImage) -> StoreResult<()>;

    /// Absent records are `Ok(None)`.
    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredImage>>;
}

// Disabled
//------------------------------------------------------------------------------

/// Keeps nothing. Selected when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

#[async_trait]
impl BarcodeStore for DisabledStore {
    fn enabled(&self) -> bool {
        false
    }

    async fn put(&self, _image: &StoredImage) -> StoreResult<()> {
        Err(StoreError::Disabled)
    }

    async fn get(&self, _id: Uuid) -> StoreResult<Option<StoredImage>> {
        Ok(None)
    }
}

// Memory
//------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, StoredImage>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BarcodeStore for MemoryStore {
    async fn put(&self, image: &StoredImage) -> StoreResult<()> {
        self.records.write().await.insert(image.id, image.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredImage>> {
        Ok(self.records.read().await.get(&id).cloned())
    }
}

// Local directory
// Each record is `<id>.png` holding the image and `<id>.json` holding its metadata.
//------------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Metadata {
    id: Uuid,
    created_at: DateTime<Utc>,
    size: usize,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub async fn new(base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await.map_err(|e| {
            StoreError::Config(format!("Failed to create storage directory {}: {}", base_path.display(), e))
        })?;
        Ok(Self { base_path })
    }

    fn path(&self, id: Uuid, ext: &str) -> PathBuf {
        self.base_path.join(format!("{id}.{ext}"))
    }
}

#[async_trait]
impl BarcodeStore for LocalStore {
    async fn put(&self, image: &StoredImage) -> StoreResult<()> {
        let meta = Metadata { id: image.id, created_at: image.created_at, size: image.bytes.len() };
        let json = serde_json::to_vec_pretty(&meta).map_err(|e| StoreError::Corrupt(image.id, e.to_string()))?;
        fs::write(self.path(image.id, "png"), &image.bytes).await?;
        // Metadata last, a record without it reads as absent
        fs::write(self.path(image.id, "json"), json).await?;
        debug!(id = %image.id, size = image.bytes.len(), "Stored record");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<StoredImage>> {
        let json = match fs::read(self.path(id, "json")).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: Metadata = serde_json::from_slice(&json).map_err(|e| StoreError::Corrupt(id, e.to_string()))?;
        let bytes = fs::read(self.path(id, "png")).await?;
        if bytes.len() != meta.size {
            return Err(StoreError::Corrupt(id, format!("expected {} bytes, found {}", meta.size, bytes.len())));
        }
        Ok(Some(StoredImage { id, bytes, created_at: meta.created_at }))
    }
}

/// Opens the configured backend.
pub async fn create_store(backend: &StorageBackend) -> StoreResult<Arc<dyn BarcodeStore>> {
    let store: Arc<dyn BarcodeStore> = match backend {
        StorageBackend::None => Arc::new(DisabledStore),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Local(path) => Arc::new(LocalStore::new(path.clone()).await?),
    };
    Ok(store)
}

#[cfg(test)]
mod store_tests {
    use super::*;

    fn record() -> StoredImage {
        StoredImage { id: Uuid::new_v4(), bytes: vec![0x89, b'P', b'N', b'G', 1, 2, 3], created_at: Utc::now() }
    }

    #[tokio::test]
    async fn test_disabled() {
        let store = DisabledStore;
        assert!(!store.enabled());
        assert!(matches!(store.put(&record()).await, Err(StoreError::Disabled)));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        let rec = record();
        store.put(&rec).await.unwrap();
        assert_eq!(store.get(rec.id).await.unwrap(), Some(rec));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested")).await.unwrap();
        let rec = record();
        store.put(&rec).await.unwrap();
        assert!(dir.path().join("nested").join(format!("{}.png", rec.id)).exists());
        assert_eq!(store.get(rec.id).await.unwrap(), Some(rec));
        assert_eq!(store.get(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path()).await.unwrap();
        let rec = record();
        store.put(&rec).await.unwrap();
        std::fs::write(dir.path().join(format!("{}.png", rec.id)), b"short").unwrap();
        assert!(matches!(store.get(rec.id).await, Err(StoreError::Corrupt(..))));
    }

    #[tokio::test]
    async fn test_create_store() {
        assert!(!create_store(&StorageBackend::None).await.unwrap().enabled());
        assert!(create_store(&StorageBackend::Memory).await.unwrap().enabled());
        let dir = tempfile::tempdir().unwrap();
        let store = create_store(&StorageBackend::Local(dir.path().join("codes"))).await.unwrap();
        assert!(store.enabled());
        assert!(dir.path().join("codes").is_dir());
    }
}

//! Generate and read orchestration: validation, registry lookup, the codecs on the
//! blocking pool, and the store policy.

pub mod store;

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::builder::{self, EncodeHints};
use crate::common::BarcodeError;
use crate::image_codec;
use crate::reader::{DecodeHints, DecodedResult, Decoder, ReadError};
use crate::symbology::{self, UnknownSymbology};
use store::{BarcodeStore, DisabledStore, StoreError, StoredImage};

pub const DEFAULT_MAX_DIMENSION: u32 = 4096;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    UnknownSymbology(#[from] UnknownSymbology),

    #[error("Data is not valid for barcode format: {0}")]
    Encoding(BarcodeError),

    #[error("invalid image. {0}")]
    InvalidImage(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl From<ReadError> for ServiceError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::InvalidImage(cause) => Self::InvalidImage(cause),
            ReadError::NotFound => Self::NotFound(ReadError::NotFound.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Unexpected(format!("Codec task failed: {err}"))
    }
}

/// Result of a generate call. `id` is set only when the image was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBarcode {
    pub id: Option<Uuid>,
    pub bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

// Service
//------------------------------------------------------------------------------

#[derive(Clone)]
pub struct BarcodeService {
    store: Arc<dyn BarcodeStore>,
    max_dimension: u32,
}

impl Default for BarcodeService {
    fn default() -> Self {
        Self::new(Arc::new(DisabledStore), DEFAULT_MAX_DIMENSION)
    }
}

impl BarcodeService {
    pub fn new(store: Arc<dyn BarcodeStore>, max_dimension: u32) -> Self {
        Self { store, max_dimension }
    }

    pub fn storage_enabled(&self) -> bool {
        self.store.enabled()
    }

    fn validate_dimension(&self, name: &str, value: u32) -> Result<(), ServiceError> {
        if value == 0 || value > self.max_dimension {
            return Err(ServiceError::Validation(format!(
                "{name} must be between 1 and {}, got {value}",
                self.max_dimension
            )));
        }
        Ok(())
    }

    pub async fn generate(
        &self,
        kind: &str,
        data: &str,
        width: u32,
        height: u32,
        store: bool,
    ) -> Result<GeneratedBarcode, ServiceError> {
        self.generate_with_hints(kind, data, width, height, store, EncodeHints::default()).await
    }

    /// Validates, encodes and renders to PNG, then persists when `store` is requested and
    /// a backend is configured. Without a backend the bytes come back with no id.
    pub async fn generate_with_hints(
        &self,
        kind: &str,
        data: &str,
        width: u32,
        height: u32,
        store: bool,
        hints: EncodeHints,
    ) -> Result<GeneratedBarcode, ServiceError> {
        if kind.trim().is_empty() {
            return Err(ServiceError::Validation("type must not be empty".into()));
        }
        if data.is_empty() {
            return Err(ServiceError::Validation("data must not be empty".into()));
        }
        self.validate_dimension("width", width)?;
        self.validate_dimension("height", height)?;
        let symbology = symbology::resolve(kind)?;

        let data = data.to_string();
        let bytes = tokio::task::spawn_blocking(move || {
            let img = builder::encode(&data, symbology, width, height, hints).map_err(ServiceError::Encoding)?;
            image_codec::to_png(&img).map_err(|e| ServiceError::Unexpected(format!("PNG encoding failed: {e}")))
        })
        .await??;
        let created_at = Utc::now();

        if !store {
            info!(%symbology, width, height, size = bytes.len(), "Generated barcode");
            return Ok(GeneratedBarcode { id: None, bytes, created_at });
        }
        if !self.store.enabled() {
            debug!(%symbology, "Storage requested but no backend is configured");
            return Ok(GeneratedBarcode { id: None, bytes, created_at });
        }

        let record = StoredImage { id: Uuid::new_v4(), bytes, created_at };
        self.store.put(&record).await.inspect_err(|e| warn!(error = %e, "Failed to store barcode"))?;
        info!(%symbology, id = %record.id, size = record.bytes.len(), "Generated and stored barcode");
        Ok(GeneratedBarcode { id: Some(record.id), bytes: record.bytes, created_at })
    }

    /// Looks up a stored image. A miss, or no backend at all, is `None`.
    pub async fn find_barcode(&self, id: &str) -> Result<Option<StoredImage>, ServiceError> {
        let id = Uuid::parse_str(id.trim()).map_err(|_| ServiceError::Validation(format!("Invalid barcode id: {id}")))?;
        let found = self.store.get(id).await?;
        debug!(%id, found = found.is_some(), "Barcode lookup");
        Ok(found)
    }

    /// Decodes an uploaded image.
    pub async fn read(&self, bytes: Vec<u8>, hints: DecodeHints) -> Result<DecodedResult, ServiceError> {
        let size = bytes.len();
        let res = tokio::task::spawn_blocking(move || {
            let img = image_codec::gray_from_bytes(&bytes)?;
            Decoder::new(hints).decode(&img)
        })
        .await?;
        match res {
            Ok(res) => {
                info!(format = %res.format, size, "Decoded barcode");
                Ok(res)
            }
            Err(e) => {
                debug!(error = %e, size, "Read failed");
                Err(e.into())
            }
        }
    }

    /// Decodes a base64 encoded image.
    pub async fn read_base64(&self, data: &str, hints: DecodeHints) -> Result<DecodedResult, ServiceError> {
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| ServiceError::Validation(format!("data is not valid base64: {e}")))?;
        self.read(bytes, hints).await
    }
}

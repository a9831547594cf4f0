//! The `Storage` contract the ingest consumer writes through.

use async_trait::async_trait;
use picvault_core::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    /// Whether repeating the same operation can succeed.
    ///
    /// A bad key stays bad; everything else may be a transient disk condition.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StorageError::InvalidKey(_) | StorageError::NotFound(_))
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Archived file {}", key)),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable keyed byte store.
///
/// The ingest consumer depends on this trait only, so the archive can move to
/// another backend without touching the pipeline.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` at `storage_key`, replacing any existing content.
    ///
    /// Returns only after the bytes are durable.
    async fn put(&self, storage_key: &str, data: &[u8]) -> StorageResult<()>;

    /// Read a file by its storage key
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Delete a file by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;
}

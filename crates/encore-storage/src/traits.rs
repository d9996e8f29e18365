//! Storage abstraction trait
//!
//! Review images, posters and avatars are written once under a fresh name, linked by
//! their public URL, and deleted when nothing references them any more. That is the
//! whole surface a backend has to provide.

use crate::keys;
use async_trait::async_trait;
use encore_core::AppError;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// **Key format:** `{bucket}/{filename}`. See the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a file into a bucket and return (storage_key, public_url)
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)>;

    /// Delete a file by its storage key. A key with no object behind it counts as
    /// deleted.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Delete several keys, continuing past failures.
    ///
    /// Returns the keys that could not be deleted together with their errors.
    async fn delete_many(&self, storage_keys: &[String]) -> Vec<(String, StorageError)> {
        let mut failures = Vec::new();
        for key in storage_keys {
            if let Err(e) = self.delete(key).await {
                failures.push((key.clone(), e));
            }
        }
        failures
    }

    /// Base URL that every public object URL of this backend starts with
    fn public_base_url(&self) -> String;

    /// Map a public URL produced by this backend back to its storage key.
    ///
    /// `None` means the URL was not produced by this backend.
    fn key_for_url(&self, url: &str) -> Option<String> {
        keys::key_from_url(&self.public_base_url(), url)
    }
}

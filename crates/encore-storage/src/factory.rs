#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{S3Settings, S3Storage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use encore_core::Config;
use std::sync::Arc;

fn required(value: &Option<String>, name: &str) -> StorageResult<String> {
    value
        .clone()
        .ok_or_else(|| StorageError::ConfigError(format!("{} not configured", name)))
}

/// Build the backend `STORAGE_BACKEND` selects.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => Arc::new(S3Storage::new(S3Settings {
            bucket: required(&config.s3_bucket, "S3_BUCKET")?,
            region: required(&config.s3_region, "S3_REGION or AWS_REGION")?,
            endpoint: config.s3_endpoint.clone(),
        })?),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => Arc::new(
            LocalStorage::new(
                required(&config.local_storage_path, "LOCAL_STORAGE_PATH")?,
                required(&config.local_storage_base_url, "LOCAL_STORAGE_BASE_URL")?,
            )
            .await?,
        ),

        #[allow(unreachable_patterns)]
        other => {
            return Err(StorageError::ConfigError(format!(
                "{} storage is not compiled into this build",
                other
            )))
        }
    };

    tracing::debug!(
        backend = %config.storage_backend,
        public_base_url = %storage.public_base_url(),
        "Storage backend ready"
    );
    Ok(storage)
}

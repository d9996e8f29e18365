use crate::keys;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::time::Instant;

/// Where review images, posters and avatars live on S3 or an S3-compatible provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint such as `http://localhost:9000` for MinIO
    pub endpoint: Option<String>,
}

impl S3Settings {
    /// Path-style `{endpoint}/{bucket}` for custom endpoints, otherwise the
    /// virtual-hosted AWS form.
    fn public_base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

/// Object storage backed by one S3 bucket. Credentials come from the AWS environment.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    public_base: String,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

impl S3Storage {
    pub fn new(settings: S3Settings) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(settings.region.clone())
            .with_bucket_name(settings.bucket.clone());

        if let Some(endpoint) = &settings.endpoint {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            public_base: settings.public_base_url(),
            bucket: settings.bucket,
        })
    }
}

#[async_trait]
impl Storage for S3Storage {
    /// Stores the object with its content type so browsers render images inline.
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)> {
        let key = keys::storage_key(bucket, filename)?;
        let size = data.len();
        let start = Instant::now();

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        if let Err(e) = self
            .store
            .put_opts(
                &Path::from(key.as_str()),
                PutPayload::from(Bytes::from(data)),
                options,
            )
            .await
        {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = elapsed_ms(start),
                "S3 upload failed"
            );
            return Err(StorageError::UploadFailed(e.to_string()));
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = elapsed_ms(start),
            "S3 upload successful"
        );

        let url = keys::public_url(&self.public_base, &key);
        Ok((key, url))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let start = Instant::now();

        match self.store.delete(&Path::from(storage_key)).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = elapsed_ms(start),
                    "S3 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %storage_key,
                    duration_ms = elapsed_ms(start),
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    fn public_base_url(&self) -> String {
        self.public_base.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(endpoint: Option<&str>) -> S3Settings {
        S3Settings {
            bucket: "encore-media".to_string(),
            region: "ap-northeast-2".to_string(),
            endpoint: endpoint.map(str::to_string),
        }
    }

    #[test]
    fn aws_urls_are_virtual_hosted() {
        assert_eq!(
            settings(None).public_base_url(),
            "https://encore-media.s3.ap-northeast-2.amazonaws.com"
        );
    }

    #[test]
    fn custom_endpoint_urls_map_back_to_keys() {
        let storage = S3Storage::new(settings(Some("http://localhost:9000/"))).unwrap();

        assert_eq!(storage.public_base_url(), "http://localhost:9000/encore-media");
        assert_eq!(
            storage
                .key_for_url("http://localhost:9000/encore-media/reviews/a.jpg")
                .as_deref(),
            Some("reviews/a.jpg")
        );
        assert_eq!(
            storage.key_for_url("https://encore-media.s3.ap-northeast-2.amazonaws.com/reviews/a.jpg"),
            None
        );
    }
}

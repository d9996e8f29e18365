//! Configuration module
//!
//! Environment-driven configuration for the review core. Services only receive the
//! slice they need (`MediaConfig`, `SearchConfig`, `ReviewConfig`), so tests can build
//! those directly without touching the environment.

use std::env;
use std::path::PathBuf;

use crate::constants::{
    FEED_PAGE_SIZE, MAX_IMAGE_SIZE_BYTES, MIN_REVIEW_CONTENT_CHARS, SEARCH_MIN_TERM_CHARS,
    SEARCH_PAGE_SIZE,
};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 10;
const BYTES_PER_MB: usize = 1024 * 1024;

/// Limits applied to staged images.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaConfig {
    pub max_image_size_bytes: usize,
    /// MIME prefix every staged file must carry
    pub required_mime_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_image_size_bytes: MAX_IMAGE_SIZE_BYTES,
            required_mime_prefix: "image/".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    pub min_term_chars: usize,
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_term_chars: SEARCH_MIN_TERM_CHARS,
            page_size: SEARCH_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewConfig {
    pub min_content_chars: usize,
    pub feed_page_size: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            min_content_chars: MIN_REVIEW_CONTENT_CHARS,
            feed_page_size: FEED_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Not every command talks to the relational store, so this stays optional here and
    /// callers that need it report a missing value themselves.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub storage_backend: StorageBackend,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub wizard_state_dir: PathBuf,
    pub media: MediaConfig,
    pub search: SearchConfig,
    pub review: ReviewConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Local,
        };

        let max_image_size_mb = env_parse("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_BYTES / BYTES_PER_MB);

        let wizard_state_dir = env::var("WIZARD_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".encore"));

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .ok()
                .or_else(|| Some("./storage".to_string())),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL")
                .ok()
                .or_else(|| Some("http://localhost:3000/storage".to_string())),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            wizard_state_dir,
            media: MediaConfig {
                max_image_size_bytes: max_image_size_mb * BYTES_PER_MB,
                ..MediaConfig::default()
            },
            search: SearchConfig {
                page_size: env_parse("SEARCH_PAGE_SIZE", SEARCH_PAGE_SIZE),
                ..SearchConfig::default()
            },
            review: ReviewConfig {
                min_content_chars: env_parse("MIN_REVIEW_LENGTH", MIN_REVIEW_CONTENT_CHARS),
                feed_page_size: env_parse("FEED_PAGE_SIZE", FEED_PAGE_SIZE),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.media.max_image_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_SIZE_MB must be greater than 0"));
        }

        if self.search.page_size == 0 || self.review.feed_page_size == 0 {
            return Err(anyhow::anyhow!(
                "SEARCH_PAGE_SIZE and FEED_PAGE_SIZE must be greater than 0"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

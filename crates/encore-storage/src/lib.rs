//! Encore Storage Library
//!
//! Object storage for review images, concert posters and avatars. It provides the
//! `Storage` trait and implementations for S3 (through `object_store`) and the local
//! filesystem.
//!
//! # Storage key format
//!
//! Every object lives under a bucket prefix: `{bucket}/{filename}`, for example
//! `reviews/3f2b...c1.jpg`. The public URL of an object is the backend's public base URL
//! followed by its key, which lets callers map a stored URL back to its key. Key
//! generation and URL parsing live in the `keys` module so all backends agree.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use encore_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Settings, S3Storage};
pub use traits::{Storage, StorageError, StorageResult};

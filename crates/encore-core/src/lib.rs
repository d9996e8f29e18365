//! Encore Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Encore components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, MediaConfig, ReviewConfig, SearchConfig};
pub use error::{log_error, AppError, ErrorMetadata, FieldErrors, LogLevel, WriteStep};
pub use models::{ArtistRef, ConcertRef, EntityRef, VenueRef};
pub use storage_types::StorageBackend;

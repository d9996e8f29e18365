//! Encore Processing Library
//!
//! Per-file checks for staged images and the optimisation applied to concert posters
//! and profile avatars before upload. Codec and resampling work is delegated to the
//! `image` and `webp` crates.

#[cfg(feature = "image")]
pub mod image;
pub mod validator;

#[cfg(feature = "image")]
pub use image::{ImageOptimizer, OptimizePreset, OptimizedImage, ProcessingError};
pub use validator::{file_extension, MediaValidator, ValidationError};

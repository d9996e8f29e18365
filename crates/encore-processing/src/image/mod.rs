//! Image optimisation for posters and avatars

mod optimizer;

pub use optimizer::{ImageOptimizer, OptimizePreset, OptimizedImage, ProcessingError};

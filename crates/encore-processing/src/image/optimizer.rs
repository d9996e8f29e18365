use bytes::Bytes;
use encore_core::constants::{AVATAR_DIMENSIONS, OPTIMIZED_WEBP_QUALITY, POSTER_DIMENSIONS};
use image::imageops::FilterType;
use image::GenericImageView;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Optimisation task failed: {0}")]
    Task(String),
}

/// Target shapes for optimised uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizePreset {
    /// 800x1067 portrait, cover fit
    Poster,
    /// 256x256 square, cover fit
    Avatar,
}

impl OptimizePreset {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            OptimizePreset::Poster => POSTER_DIMENSIONS,
            OptimizePreset::Avatar => AVATAR_DIMENSIONS,
        }
    }

    pub fn quality(&self) -> f32 {
        OPTIMIZED_WEBP_QUALITY
    }
}

#[derive(Debug, Clone)]
pub struct OptimizedImage {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Resizes to fill the preset's box (cropping the overflow) and encodes as WebP.
pub struct ImageOptimizer;

impl ImageOptimizer {
    pub fn optimize_blocking(
        data: &[u8],
        preset: OptimizePreset,
    ) -> Result<OptimizedImage, ProcessingError> {
        let start = Instant::now();
        let img = image::load_from_memory(data).map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let (source_width, source_height) = img.dimensions();

        let (width, height) = preset.dimensions();
        let resized = img.resize_to_fill(width, height, FilterType::Lanczos3);

        let rgba = resized.to_rgba8();
        let encoded = webp::Encoder::from_rgba(&rgba, width, height).encode(preset.quality());
        let data = Bytes::copy_from_slice(&encoded);

        tracing::debug!(
            ?preset,
            source_width,
            source_height,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Image optimised"
        );

        Ok(OptimizedImage {
            data,
            width,
            height,
            content_type: "image/webp",
            extension: "webp",
        })
    }

    /// Same as `optimize_blocking`, run on the blocking thread pool.
    pub async fn optimize(
        data: Vec<u8>,
        preset: OptimizePreset,
    ) -> Result<OptimizedImage, ProcessingError> {
        tokio::task::spawn_blocking(move || Self::optimize_blocking(&data, preset))
            .await
            .map_err(|e| ProcessingError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    #[test]
    fn poster_is_cover_fitted() {
        let out = ImageOptimizer::optimize_blocking(&create_test_image(1200, 600), OptimizePreset::Poster)
            .unwrap();
        assert_eq!((out.width, out.height), (800, 1067));
        assert_eq!(out.content_type, "image/webp");

        let decoded = image::load_from_memory(&out.data).unwrap();
        assert_eq!(decoded.dimensions(), (800, 1067));
    }

    #[tokio::test]
    async fn avatar_is_square() {
        let out = ImageOptimizer::optimize(create_test_image(300, 500), OptimizePreset::Avatar)
            .await
            .unwrap();
        assert_eq!((out.width, out.height), (256, 256));
    }

    #[test]
    fn rejects_undecodable_bytes() {
        assert!(matches!(
            ImageOptimizer::optimize_blocking(b"not an image", OptimizePreset::Avatar),
            Err(ProcessingError::Decode(_))
        ));
    }
}

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::cache::{CacheError, CacheKey};
use crate::origin::OriginError;

pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 630;
pub const DEFAULT_QUALITY: u8 = 80;

pub const CONTENT_TYPE: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformParams {
    pub width: u32,
    pub height: u32,
    pub quality: u8,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl TransformParams {
    /// Fills in defaults and clamps quality into 1..=100.
    pub fn new(width: Option<u32>, height: Option<u32>, quality: Option<u8>) -> Self {
        Self {
            width: width.unwrap_or(DEFAULT_WIDTH),
            height: height.unwrap_or(DEFAULT_HEIGHT),
            quality: quality.unwrap_or(DEFAULT_QUALITY).clamp(1, 100),
        }
    }

    pub fn cache_key(&self, image_name: &str) -> CacheKey {
        CacheKey::new(image_name, self.width, self.height, self.quality)
    }
}

// Decode, shrink into the bounding box and re-encode as JPEG
pub fn transform_image(image_data: &[u8], params: &TransformParams) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(image_data)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let resized = resize_to_fit(img, params.width, params.height);

    encode_jpeg(&resized, params.quality)
}

/// Shrink-only resize that keeps the aspect ratio. An image already inside
/// the box is returned untouched.
pub fn resize_to_fit(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    let (current_width, current_height) = img.dimensions();

    if current_width <= max_width && current_height <= max_height {
        return img;
    }

    img.resize(max_width, max_height, FilterType::Lanczos3)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut output = Vec::new();

    // JPEG has no alpha channel
    let rgb = img.to_rgb8();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(|e| ImageError::Encode(format!("JPEG encoding failed: {}", e)))?;

    Ok(output)
}

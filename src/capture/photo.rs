use anyhow::{anyhow, Result};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, GenericImageView};

use crate::ranging::CameraImage;

pub const DEFAULT_MAX_DIMENSION: u32 = 1024;
pub const DEFAULT_QUALITY: u8 = 70;

/// Downscales camera images and compresses them to JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoEncoder {
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl PhotoEncoder {
    pub fn new(max_dimension: u32, quality: u8) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn encode(&self, image: &CameraImage) -> Result<Vec<u8>> {
        match image {
            CameraImage::Decoded(decoded) => self.encode_image(decoded),
            CameraImage::Encoded(bytes) => {
                let decoded = image::load_from_memory(bytes)
                    .map_err(|err| anyhow!("failed to decode camera image: {err}"))?;
                self.encode_image(&decoded)
            }
        }
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow!("camera image is empty"));
        }

        let (target_width, target_height) = scaled_dimensions(width, height, self.max_dimension);
        let rgb = if (target_width, target_height) == (width, height) {
            image.to_rgb8()
        } else {
            image
                .resize_exact(target_width, target_height, FilterType::Triangle)
                .to_rgb8()
        };

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .map_err(|err| anyhow!("JPEG encode failed: {err}"))?;
        Ok(buffer)
    }
}

/// Fits `width` x `height` inside a `max_dimension` square keeping the aspect
/// ratio. Never upscales.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let max = f64::from(max_dimension);
    let scale = (max / f64::from(width))
        .min(max / f64::from(height))
        .min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max_dimension);
    (scaled(width), scaled(height))
}

//! Image clean-up before a page is sent to the vision service.
//!
//! Steps, in order: grayscale, downscale to `max_dimension`, contrast
//! stretch, unsharp mask. The result is re-encoded in the page's own format;
//! if it is still above `max_bytes` a second, more aggressive encode is
//! attempted.
//!
//! Preprocessing never fails a page. Any decode or encode problem logs a
//! warning and the original image goes through unchanged.

use crate::config::PreprocessConfig;
use crate::error::PreprocessError;
use crate::pipeline::encode::{encode_image, EncodeQuality, PageImage};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use tracing::{debug, warn};

/// Makes page images smaller and easier to read.
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Optimise `image`, falling back to the input on any failure.
    pub fn optimize(&self, image: PageImage) -> PageImage {
        match self.try_optimize(&image) {
            Ok(optimised) => optimised,
            Err(e) => {
                warn!("Image preprocessing skipped: {}", e);
                image
            }
        }
    }

    fn try_optimize(&self, image: &PageImage) -> Result<PageImage, PreprocessError> {
        let decoded = image::load_from_memory(&image.bytes).map_err(PreprocessError::Decode)?;

        let gray = self.enhance(decoded);
        let format = image.format;

        let bytes = encode_image(&gray, format, EncodeQuality::Standard(self.config.quality))
            .map_err(PreprocessError::Encode)?;
        if bytes.len() <= self.config.max_bytes {
            debug!(
                "Preprocessed image: {} → {} bytes",
                image.bytes.len(),
                bytes.len()
            );
            return Ok(PageImage::new(bytes, format));
        }

        let reduced = encode_image(
            &gray,
            format,
            EncodeQuality::Reduced(self.config.reduced_quality),
        )
        .map_err(PreprocessError::Encode)?;
        if reduced.len() <= self.config.max_bytes {
            debug!(
                "Preprocessed image at reduced quality: {} → {} bytes",
                image.bytes.len(),
                reduced.len()
            );
            return Ok(PageImage::new(reduced, format));
        }

        Err(PreprocessError::TooLarge {
            size: reduced.len(),
            limit: self.config.max_bytes,
        })
    }

    fn enhance(&self, img: DynamicImage) -> DynamicImage {
        let mut gray = img.grayscale();

        let max = self.config.max_dimension.max(1);
        if gray.width() > max || gray.height() > max {
            gray = gray.resize(max, max, FilterType::CatmullRom);
        }

        let stretched = stretch_contrast(gray.to_luma8());
        DynamicImage::ImageLuma8(stretched)
            .unsharpen(self.config.sharpen_sigma, self.config.sharpen_threshold)
    }
}

/// Linearly map the darkest pixel to 0 and the brightest to 255.
fn stretch_contrast(mut img: GrayImage) -> GrayImage {
    let (lo, hi) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if hi <= lo || (lo == 0 && hi == u8::MAX) {
        return img;
    }

    let range = f32::from(hi - lo);
    for p in img.pixels_mut() {
        let v = f32::from(p[0] - lo) * 255.0 / range;
        p[0] = v.round().clamp(0.0, 255.0) as u8;
    }
    img
}

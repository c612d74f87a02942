//! Image encoding: `DynamicImage` → PNG/JPEG bytes, and bytes → `ImageData`
//! for the vision API.
//!
//! PNG is the default page format because it is lossless: text crispness
//! matters more than payload size for recognition accuracy. JPEG is offered
//! for providers with tight upload limits.

use crate::config::RasterFormat;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// An encoded page image travelling between pipeline stages.
#[derive(Clone, PartialEq, Eq)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub format: RasterFormat,
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl PageImage {
    pub fn new(bytes: Vec<u8>, format: RasterFormat) -> Self {
        Self { bytes, format }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Compression effort for one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeQuality {
    /// JPEG quality 1–100, or default PNG compression.
    Standard(u8),
    /// JPEG quality 1–100, or maximum PNG compression.
    Reduced(u8),
}

/// Encode `img` in `format`.
pub fn encode_image(
    img: &DynamicImage,
    format: RasterFormat,
    quality: EncodeQuality,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        RasterFormat::Png => {
            let compression = match quality {
                EncodeQuality::Standard(_) => CompressionType::Default,
                EncodeQuality::Reduced(_) => CompressionType::Best,
            };
            let encoder = PngEncoder::new_with_quality(
                Cursor::new(&mut buf),
                compression,
                FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
        }
        RasterFormat::Jpg => {
            let q = match quality {
                EncodeQuality::Standard(q) | EncodeQuality::Reduced(q) => q.clamp(1, 100),
            };
            let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), q);
            // JPEG has no alpha channel.
            match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {
                    img.write_with_encoder(encoder)?
                }
                DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLuma16(_) => {
                    DynamicImage::ImageLuma8(img.to_luma8()).write_with_encoder(encoder)?
                }
                _ => DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?,
            }
        }
    }
    debug!("Encoded {:?} image → {} bytes", format, buf.len());
    Ok(buf)
}

/// Wrap a page image as a base64 attachment for a multimodal request.
///
/// `detail: "high"` asks GPT-4-class models for the full tile budget;
/// without it fine print is lost.
pub fn to_image_data(image: &PageImage) -> ImageData {
    let b64 = STANDARD.encode(&image.bytes);
    ImageData::new(b64, image.mime_type()).with_detail("high")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn red_square() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn encodes_png() {
        let bytes = encode_image(&red_square(), RasterFormat::Png, EncodeQuality::Standard(85))
            .expect("encode should succeed");
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn encodes_rgba_as_jpeg() {
        let bytes = encode_image(&red_square(), RasterFormat::Jpg, EncodeQuality::Standard(85))
            .expect("encode should succeed");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn image_data_is_base64() {
        let png = encode_image(&red_square(), RasterFormat::Png, EncodeQuality::Standard(85)).unwrap();
        let data = to_image_data(&PageImage::new(png.clone(), RasterFormat::Png));
        assert_eq!(data.mime_type, "image/png");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, png);
    }
}

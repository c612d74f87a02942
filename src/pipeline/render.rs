//! Page rasterisation: render one PDF page to an encoded image.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. `tokio::task::spawn_blocking` moves the work onto the
//! blocking pool so the runtime's worker threads never stall on rendering.
//!
//! ## Why cap pixels as well as density?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would be a 14 000 × 20 000
//! px bitmap. `max_pixels` caps the longest edge regardless of physical size,
//! keeping memory bounded.

use crate::config::RasterFormat;
use crate::error::RasterError;
use crate::pipeline::encode::{encode_image, EncodeQuality, PageImage};
use crate::pipeline::pdfium::{bind_pdfium, describe_load_error};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// JPEG quality used when pages are rasterised straight to JPEG.
const RASTER_JPEG_QUALITY: u8 = 90;

/// Rendering parameters for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterOptions {
    /// Dots per inch.
    pub density: u32,
    pub format: RasterFormat,
    /// Longest edge in pixels.
    pub max_pixels: u32,
}

/// Renders document pages to images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, pdf: Arc<[u8]>) -> Result<usize, RasterError>;

    /// Render 1-based `page_number`.
    async fn rasterize(
        &self,
        pdf: Arc<[u8]>,
        page_number: usize,
        options: RasterOptions,
    ) -> Result<PageImage, RasterError>;
}

/// [`Rasterizer`] backed by pdfium.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumRasterizer;

#[async_trait]
impl Rasterizer for PdfiumRasterizer {
    async fn page_count(&self, pdf: Arc<[u8]>) -> Result<usize, RasterError> {
        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium().map_err(RasterError::Unavailable)?;
            let document = pdfium
                .load_pdf_from_byte_slice(&pdf, None)
                .map_err(|e| RasterError::DocumentUnreadable(describe_load_error(&e)))?;
            Ok(document.pages().len() as usize)
        })
        .await
        .map_err(|e| RasterError::Unavailable(format!("render task panicked: {e}")))?
    }

    async fn rasterize(
        &self,
        pdf: Arc<[u8]>,
        page_number: usize,
        options: RasterOptions,
    ) -> Result<PageImage, RasterError> {
        tokio::task::spawn_blocking(move || rasterize_blocking(&pdf, page_number, options))
            .await
            .map_err(|e| RasterError::PageFailed {
                page: page_number,
                detail: format!("render task panicked: {e}"),
            })?
    }
}

/// Blocking implementation of page rendering.
fn rasterize_blocking(
    pdf: &[u8],
    page_number: usize,
    options: RasterOptions,
) -> Result<PageImage, RasterError> {
    let pdfium = bind_pdfium().map_err(RasterError::Unavailable)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| RasterError::DocumentUnreadable(describe_load_error(&e)))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let page_failed = |detail: String| RasterError::PageFailed {
        page: page_number,
        detail,
    };

    if page_number == 0 || page_number > total {
        return Err(page_failed(format!(
            "out of range (document has {total} pages)"
        )));
    }
    let index = u16::try_from(page_number - 1)
        .map_err(|_| page_failed("page index exceeds pdfium's u16 range".into()))?;
    let page = pages.get(index).map_err(|e| page_failed(format!("{e:?}")))?;

    let (width, height) = target_size(
        page.width().value,
        page.height().value,
        options.density,
        options.max_pixels,
    );
    let render_config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| page_failed(format!("{e:?}")))?;
    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px at {} DPI",
        page_number,
        image.width(),
        image.height(),
        options.density
    );

    let bytes = encode_image(
        &image,
        options.format,
        EncodeQuality::Standard(RASTER_JPEG_QUALITY),
    )
    .map_err(|e| page_failed(format!("image encoding failed: {e}")))?;

    Ok(PageImage::new(bytes, options.format))
}

/// Pixel size for a page of `width_pt × height_pt` points at `density`,
/// scaled down proportionally so neither edge exceeds `max_pixels`.
fn target_size(width_pt: f32, height_pt: f32, density: u32, max_pixels: u32) -> (u32, u32) {
    let scale = density as f32 / POINTS_PER_INCH;
    let w = (width_pt * scale).max(1.0);
    let h = (height_pt * scale).max(1.0);
    let longest = w.max(h);
    let cap = max_pixels.max(1) as f32;
    let ratio = if longest > cap { cap / longest } else { 1.0 };
    (
        ((w * ratio).round() as u32).max(1),
        ((h * ratio).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_page_at_300_dpi() {
        // 8.5 × 11 in.
        assert_eq!(target_size(612.0, 792.0, 300, 10_000), (2550, 3300));
    }

    #[test]
    fn cap_preserves_aspect_ratio() {
        let (w, h) = target_size(612.0, 792.0, 300, 1650);
        assert_eq!(h, 1650);
        assert_eq!(w, 1275);
    }

    #[test]
    fn degenerate_page_is_at_least_one_pixel() {
        assert_eq!(target_size(0.0, 0.0, 72, 100), (1, 1));
    }
}

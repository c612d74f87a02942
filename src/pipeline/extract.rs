//! Native text-layer extraction.
//!
//! Two backends sit behind the [`TextExtractor`] trait:
//!
//! * [`PdfiumTextExtractor`]: pdfium's text layer, the most faithful for
//!   complex layouts.
//! * [`LopdfTextExtractor`]: pure Rust, no shared library; handles simple
//!   documents when pdfium is not installed.
//!
//! [`FallbackTextExtractor`] chains them: each extractor is tried in order
//! until one succeeds.

use crate::error::ExtractionError;
use crate::pipeline::pdfium::{bind_pdfium, describe_load_error};
use async_trait::async_trait;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, warn};

/// Inclusive 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    pub fn single(page: usize) -> Self {
        Self {
            first: page,
            last: page,
        }
    }

    /// Check the range against a document of `total` pages.
    pub fn checked(self, total: usize) -> Result<RangeInclusive<usize>, ExtractionError> {
        if self.first == 0 || self.first > self.last {
            return Err(ExtractionError::Backend(format!(
                "invalid page range {}–{}",
                self.first, self.last
            )));
        }
        if self.last > total {
            return Err(ExtractionError::PageOutOfRange {
                page: self.last,
                total,
            });
        }
        Ok(self.first..=self.last)
    }
}

/// Text pulled from the document's native text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    /// Pages in the whole document, whatever range was requested.
    pub page_count: usize,
}

/// Reads the native text layer of a PDF.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Extract the text of `pages`, or of the whole document when `None`.
    /// Pages are joined with a blank line.
    async fn extract(
        &self,
        pdf: Arc<[u8]>,
        pages: Option<PageRange>,
    ) -> Result<ExtractedText, ExtractionError>;
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`TextExtractor`] over pdfium's text layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumTextExtractor;

#[async_trait]
impl TextExtractor for PdfiumTextExtractor {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    async fn extract(
        &self,
        pdf: Arc<[u8]>,
        pages: Option<PageRange>,
    ) -> Result<ExtractedText, ExtractionError> {
        tokio::task::spawn_blocking(move || pdfium_extract_blocking(&pdf, pages))
            .await
            .map_err(|e| ExtractionError::Backend(format!("extract task panicked: {e}")))?
    }
}

fn pdfium_extract_blocking(
    pdf: &[u8],
    pages: Option<PageRange>,
) -> Result<ExtractedText, ExtractionError> {
    let pdfium = bind_pdfium().map_err(ExtractionError::Backend)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| ExtractionError::Unreadable(describe_load_error(&e)))?;

    let doc_pages = document.pages();
    let page_count = doc_pages.len() as usize;
    let range = pages
        .unwrap_or(PageRange {
            first: 1,
            last: page_count.max(1),
        })
        .checked(page_count)?;

    let mut parts = Vec::new();
    for page_number in range {
        let index = u16::try_from(page_number - 1).map_err(|_| {
            ExtractionError::Backend(format!("page {page_number} exceeds pdfium's u16 range"))
        })?;
        let page = doc_pages
            .get(index)
            .map_err(|e| ExtractionError::Backend(format!("page {page_number}: {e:?}")))?;
        // A page without a text layer is simply empty.
        let text = page.text().map(|t| t.all()).unwrap_or_default();
        parts.push(text);
    }

    Ok(ExtractedText {
        text: parts.join("\n\n"),
        page_count,
    })
}

// ── lopdf ────────────────────────────────────────────────────────────────

/// [`TextExtractor`] over `lopdf`'s content-stream decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfTextExtractor;

#[async_trait]
impl TextExtractor for LopdfTextExtractor {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    async fn extract(
        &self,
        pdf: Arc<[u8]>,
        pages: Option<PageRange>,
    ) -> Result<ExtractedText, ExtractionError> {
        tokio::task::spawn_blocking(move || lopdf_extract_blocking(&pdf, pages))
            .await
            .map_err(|e| ExtractionError::Backend(format!("extract task panicked: {e}")))?
    }
}

fn lopdf_extract_blocking(
    pdf: &[u8],
    pages: Option<PageRange>,
) -> Result<ExtractedText, ExtractionError> {
    let document =
        lopdf::Document::load_mem(pdf).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;
    let page_count = document.get_pages().len();
    let range = pages
        .unwrap_or(PageRange {
            first: 1,
            last: page_count.max(1),
        })
        .checked(page_count)?;

    let mut parts = Vec::new();
    for page_number in range {
        let text = document
            .extract_text(&[page_number as u32])
            .map_err(|e| ExtractionError::Backend(format!("page {page_number}: {e}")))?;
        parts.push(text.trim_end().to_string());
    }

    Ok(ExtractedText {
        text: parts.join("\n\n"),
        page_count,
    })
}

// ── Chain ────────────────────────────────────────────────────────────────

/// Tries each extractor in order until one succeeds.
pub struct FallbackTextExtractor {
    extractors: Vec<Arc<dyn TextExtractor>>,
}

impl FallbackTextExtractor {
    pub fn new(extractors: Vec<Arc<dyn TextExtractor>>) -> Self {
        Self { extractors }
    }

    /// pdfium first, lopdf second.
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(PdfiumTextExtractor),
            Arc::new(LopdfTextExtractor),
        ])
    }
}

impl Default for FallbackTextExtractor {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
impl TextExtractor for FallbackTextExtractor {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn extract(
        &self,
        pdf: Arc<[u8]>,
        pages: Option<PageRange>,
    ) -> Result<ExtractedText, ExtractionError> {
        let mut last_error: Option<ExtractionError> = None;

        for extractor in &self.extractors {
            match extractor.extract(Arc::clone(&pdf), pages).await {
                Ok(extracted) => {
                    debug!("Text extracted with {} backend", extractor.name());
                    return Ok(extracted);
                }
                // Out of range is a property of the document, not the backend.
                Err(e @ ExtractionError::PageOutOfRange { .. }) => return Err(e),
                Err(e) => {
                    warn!("Text extractor {} failed: {}, trying next", extractor.name(), e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ExtractionError::Backend("no text extractors configured".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Result<&'static str, ExtractionError>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(e: ExtractionError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(e),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextExtractor for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract(
            &self,
            _pdf: Arc<[u8]>,
            _pages: Option<PageRange>,
        ) -> Result<ExtractedText, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|t| ExtractedText {
                text: t.to_string(),
                page_count: 1,
            })
        }
    }

    fn pdf() -> Arc<[u8]> {
        Arc::from(&b"%PDF-1.7"[..])
    }

    #[test]
    fn page_range_checks() {
        assert_eq!(PageRange::single(2).checked(3).unwrap(), 2..=2);
        assert!(matches!(
            PageRange::single(4).checked(3),
            Err(ExtractionError::PageOutOfRange { page: 4, total: 3 })
        ));
        assert!(PageRange::single(0).checked(3).is_err());
    }

    #[tokio::test]
    async fn chain_falls_through_to_next_backend() {
        let broken = Fixed::err(ExtractionError::Backend("no pdfium".into()));
        let working = Fixed::ok("hello");
        let chain = FallbackTextExtractor::new(vec![broken.clone(), working.clone()]);

        let out = chain.extract(pdf(), None).await.unwrap();
        assert_eq!(out.text, "hello");
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(working.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn chain_stops_at_first_success() {
        let first = Fixed::ok("first");
        let second = Fixed::ok("second");
        let chain = FallbackTextExtractor::new(vec![first, second.clone()]);

        assert_eq!(chain.extract(pdf(), None).await.unwrap().text, "first");
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn chain_reports_last_error() {
        let chain = FallbackTextExtractor::new(vec![
            Fixed::err(ExtractionError::Backend("a".into())),
            Fixed::err(ExtractionError::Unreadable("b".into())),
        ]);
        let err = chain.extract(pdf(), None).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(ref m) if m == "b"));
    }

    #[tokio::test]
    async fn lopdf_rejects_garbage() {
        let err = LopdfTextExtractor
            .extract(Arc::from(&b"%PDF-garbage"[..]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }
}

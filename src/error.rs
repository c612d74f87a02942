//! Error types for the edgequake-pdf2text library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2TextError`]: **Fatal**: the run cannot proceed at all (corrupt
//!   document, bad credentials, invalid configuration). Returned as
//!   `Err(Pdf2TextError)` from the top-level `process*` functions.
//!
//! * [`PageError`]: **Non-fatal**: a single page could not be rasterised or
//!   recognised, but every other page is fine. Stored inside
//!   [`crate::output::PageResult`] next to `skipped: true` so callers can
//!   inspect partial success instead of losing the whole document.
//!
//! Collaborator errors ([`ExtractionError`], [`RasterError`], [`OcrError`],
//! [`PreprocessError`]) sit between the two: the orchestrator decides, per call site, whether one
//! becomes a fallback, a skipped page or a fatal error.

use crate::pipeline::retry::{RetryClass, Retryable};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2text library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2TextError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read, but is not a PDF.
    #[error("Input '{source_name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { source_name: String, magic: Vec<u8> },

    /// The input exceeds `max_file_size`.
    #[error("Input '{source_name}' is {size} bytes, above the {limit} byte limit (OCR_MAX_FILE_SIZE)")]
    FileTooLarge {
        source_name: String,
        size: u64,
        limit: u64,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// Neither the text layer nor the rasteriser could open the document.
    #[error("Document is unreadable: {detail}")]
    DocumentUnreadable { detail: String },

    /// Native text was insufficient and OCR is disabled for this request.
    #[error("No usable text layer ({reason}) and OCR is disabled")]
    NoTextLayer { reason: String },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The vision service rejected our credentials; retrying cannot help.
    #[error("OCR authentication failed: {detail}")]
    OcrAuth { detail: String },

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Some pages were skipped.
    ///
    /// Returned by [`crate::output::HybridOutput::into_strict`] when the
    /// caller wants to treat any skipped page as an error.
    #[error("{skipped}/{total} pages were skipped during processing")]
    PartialFailure { skipped: usize, total: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output text file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, or install pdfium where the\n\
system loader can find it (e.g. /usr/local/lib).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored on a skipped [`crate::output::PageResult`]. The run continues and
/// reports `success: true` with a non-zero `skipped_pages` count.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageError {
    /// The page could not be rendered to an image.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The vision service failed on every attempt.
    #[error("Page {page}: OCR failed after {attempts} attempts: {detail}")]
    OcrFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The page was beyond `max_ocr_pages` and never sent to OCR.
    #[error("Page {page}: not processed, OCR page limit of {limit} reached")]
    PageLimitExceeded { page: usize, limit: usize },

    /// The document deadline passed before the page's OCR finished.
    #[error("Page {page}: document timeout of {secs}s reached before OCR completed")]
    DeadlineExceeded { page: usize, secs: u64 },

    /// The page has no native text and OCR was turned off for the run.
    #[error("Page {page}: no native text and OCR is disabled")]
    OcrDisabled { page: usize },
}

// ── Collaborator errors ──────────────────────────────────────────────────

/// Native text extraction failed.
///
/// Never fatal on its own: the orchestrator falls back to per-page
/// classification and OCR.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("cannot open document: {0}")]
    Unreadable(String),

    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("{0}")]
    Backend(String),
}

/// Rasterisation failed.
#[derive(Debug, Clone, Error)]
pub enum RasterError {
    /// The whole document cannot be opened; fatal for the run.
    #[error("cannot open document: {0}")]
    DocumentUnreadable(String),

    /// One page failed; that page is skipped.
    #[error("page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The rendering backend itself could not be loaded.
    #[error("rasteriser unavailable: {0}")]
    Unavailable(String),
}

/// Image clean-up failed. Never fatal: the original image is used instead.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("decode failed: {0}")]
    Decode(#[source] image::ImageError),

    #[error("encode failed: {0}")]
    Encode(#[source] image::ImageError),

    /// Still above the size cap after the reduced-quality encode.
    #[error("{size} bytes after reduced-quality encode, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// A vision-OCR call failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OcrError {
    /// Timeout, connection reset, 5xx.
    #[error("transient OCR failure: {0}")]
    Transient(String),

    /// HTTP 429 or an equivalent quota signal.
    #[error("OCR rate limit: {0}")]
    Quota(String),

    /// Bad credentials or configuration.
    #[error("OCR authentication failed: {0}")]
    Auth(String),

    /// The service answered, but with no text.
    #[error("OCR returned an empty response")]
    EmptyResponse,

    /// The per-attempt timeout elapsed.
    #[error("OCR call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The image could not be prepared for the service.
    #[error("invalid OCR input: {0}")]
    InvalidInput(String),
}

impl Retryable for OcrError {
    fn retry_class(&self) -> RetryClass {
        match self {
            OcrError::Transient(_) | OcrError::EmptyResponse | OcrError::Timeout { .. } => {
                RetryClass::Transient
            }
            OcrError::Quota(_) => RetryClass::Quota,
            OcrError::Auth(_) | OcrError::InvalidInput(_) => RetryClass::Fatal,
        }
    }
}

//! # edgequake-pdf2text
//!
//! Extract plain text from PDF documents, page by page choosing between the
//! native text layer and vision-model OCR.
//!
//! ## Why this crate?
//!
//! Direct text extraction is free and exact, but scanned pages have no text
//! layer and broken encodings produce one full of garbage. OCR works on
//! everything but costs money and time. This crate only pays for OCR where
//! the native text cannot be trusted: a statistical validator ([`text_quality`])
//! judges the whole document first, then each page is classified on its own,
//! and only the failing pages are rasterised and sent to a vision model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     read local file or download from URL, check %PDF
//!  ├─ 2. Triage    whole-document text quality (entropy, density, repeats)
//!  ├─ 3. Classify  per-page native text length
//!  ├─ 4. OCR       rasterise ▶ preprocess ▶ vision model, in paced batches
//!  └─ 5. Output    page-ordered text + per-page results + metadata
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2text::{process, HybridConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OCR provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = HybridConfig::builder().with_env_overrides()?.build()?;
//!     let output = process("document.pdf", &config).await?;
//!     println!("{}", output.text);
//!     eprintln!("{:?}: {} text / {} OCR / {} skipped pages",
//!         output.metadata.method,
//!         output.metadata.text_pages,
//!         output.metadata.ocr_pages,
//!         output.metadata.skipped_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2text` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2text = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod triage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    HybridConfig, HybridConfigBuilder, OcrOptions, PageSeparator, PreprocessConfig,
    ProcessOptions, RasterFormat,
};
pub use convert::{
    default_orchestrator, inspect, process, process_bytes, process_sync, process_to_file,
    process_with_options,
};
pub use error::{
    ExtractionError, OcrError, PageError, Pdf2TextError, PreprocessError, RasterError,
};
pub use orchestrator::{consolidate, HybridOrchestrator};
pub use output::{
    HybridOutput, PageMethod, PageResult, ProcessingMetadata, ProcessingMethod,
    ProcessingResponse,
};
pub use pipeline::extract::{ExtractedText, PageRange, TextExtractor};
pub use pipeline::ocr::{Recognition, VisionOcrClient, VisionService};
pub use pipeline::preprocess::ImagePreprocessor;
pub use pipeline::render::{RasterOptions, Rasterizer};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use text_quality::{TextQualityValidator, ValidationResult, ValidatorConfig};
pub use triage::{TriageReport, TriageVerdict};

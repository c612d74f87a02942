//! Top-level entry points.
//!
//! Every function here builds a [`HybridOrchestrator`] with the default
//! collaborators:
//!
//! | Role | Implementation |
//! |------|----------------|
//! | native text | [`FallbackTextExtractor`]: pdfium, then lopdf |
//! | rasteriser | [`PdfiumRasterizer`] |
//! | vision OCR | [`DeferredLlmVisionService`] behind a [`VisionOcrClient`] |
//!
//! The vision provider is resolved on the first OCR call, so documents with
//! a good text layer need no API key. Build a [`HybridOrchestrator`] directly
//! to swap any collaborator.

use crate::config::{HybridConfig, ProcessOptions};
use crate::error::Pdf2TextError;
use crate::orchestrator::HybridOrchestrator;
use crate::output::{HybridOutput, ProcessingMetadata};
use crate::pipeline::extract::FallbackTextExtractor;
use crate::pipeline::input::{check_pdf_bytes, load_input};
use crate::pipeline::llm::DeferredLlmVisionService;
use crate::pipeline::ocr::VisionOcrClient;
use crate::pipeline::render::PdfiumRasterizer;
use crate::triage::TriageReport;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Orchestrator wired to the default collaborators.
pub fn default_orchestrator(config: &HybridConfig) -> HybridOrchestrator {
    let service = Arc::new(DeferredLlmVisionService::new(config.clone()));
    HybridOrchestrator::new(
        config.clone(),
        Arc::new(FallbackTextExtractor::standard()),
        Arc::new(PdfiumRasterizer),
        Arc::new(VisionOcrClient::from_config(service, config)),
    )
}

/// Extract the text of a PDF file or URL.
///
/// This is the primary entry point for the library. Uses `config.options`
/// as the per-request options.
///
/// # Returns
/// `Ok(HybridOutput)` on success, even if some pages were skipped
/// (check `output.metadata.skipped_pages`, or call
/// [`HybridOutput::into_strict`]).
///
/// # Errors
/// Returns `Err(Pdf2TextError)` only for fatal errors: unreadable input,
/// oversized or non-PDF data, rejected credentials.
pub async fn process(
    input: impl AsRef<str>,
    config: &HybridConfig,
) -> Result<HybridOutput, Pdf2TextError> {
    process_with_options(input, config, &config.options).await
}

/// [`process`] with explicit per-request options.
pub async fn process_with_options(
    input: impl AsRef<str>,
    config: &HybridConfig,
    options: &ProcessOptions,
) -> Result<HybridOutput, Pdf2TextError> {
    let input = input.as_ref();
    info!("Processing: {}", input);
    let loaded = load_input(input, config).await?;
    default_orchestrator(config)
        .process(loaded.bytes, options)
        .await
}

/// Extract the text of a PDF held in memory.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2text::{process_bytes, HybridConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("document.pdf")?;
/// let output = process_bytes(&bytes, &HybridConfig::default()).await?;
/// println!("{}", output.text);
/// # Ok(())
/// # }
/// ```
pub async fn process_bytes(
    bytes: &[u8],
    config: &HybridConfig,
) -> Result<HybridOutput, Pdf2TextError> {
    check_pdf_bytes("<bytes>", bytes, config.max_file_size)?;
    default_orchestrator(config)
        .process(Arc::from(bytes), &config.options)
        .await
}

/// Extract text and write it to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn process_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &HybridConfig,
) -> Result<ProcessingMetadata, Pdf2TextError> {
    let output = process(input, config).await?;
    write_atomic(output_path.as_ref(), &output.text).await?;
    Ok(output.metadata)
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    input: impl AsRef<str>,
    config: &HybridConfig,
) -> Result<HybridOutput, Pdf2TextError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2TextError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(input, config))
}

/// Report how a document would be triaged, without running OCR.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(
    input: impl AsRef<str>,
    config: &HybridConfig,
) -> Result<TriageReport, Pdf2TextError> {
    let loaded = load_input(input.as_ref(), config).await?;
    default_orchestrator(config)
        .triage_report(loaded.bytes)
        .await
}

async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2TextError> {
    let failed = |source: std::io::Error| Pdf2TextError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(failed)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_creates_parents_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.txt");

        write_atomic(&path, "hello").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!path.with_extension("txt.tmp").exists());
    }

    #[tokio::test]
    async fn process_bytes_rejects_non_pdf_before_any_backend() {
        let err = process_bytes(b"PK\x03\x04zip", &HybridConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2TextError::NotAPdf { .. }));
    }
}

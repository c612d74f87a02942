//! The hybrid pipeline: triage, per-page classification, OCR dispatch and
//! consolidation.
//!
//! ```text
//! bytes ──▶ whole-document triage ──accepted──▶ text-only output
//!                 │
//!              rejected
//!                 ▼
//!           per-page classify ──text──▶ slot[n] = PageResult{text}
//!                 │
//!                ocr
//!                 ▼
//!     rasterise ▶ preprocess ▶ VisionOcrClient   (paced batches of
//!                 │                               max_pages_parallel)
//!                 ▼
//!           slot[n] = PageResult{ocr | skipped}
//!                 │
//!                 ▼
//!           consolidate (page order) ──▶ HybridOutput
//! ```
//!
//! Only the OCR stage is concurrent. Every page owns one slot that is
//! written exactly once, so completion order never reaches the output.
//!
//! ## Failure policy
//!
//! | Failure | Effect |
//! |---------|--------|
//! | native extraction fails | every page goes to OCR |
//! | one page fails to rasterise | that page is skipped |
//! | OCR fails after all attempts | that page is skipped |
//! | document deadline passes | unfinished pages are skipped |
//! | page beyond `max_ocr_pages` | that page is skipped |
//! | OCR disabled, page has no native text | that page is skipped |
//! | document cannot be opened | fatal [`Pdf2TextError::DocumentUnreadable`] |
//! | vision service rejects credentials | fatal [`Pdf2TextError::OcrAuth`] |

use crate::config::{HybridConfig, PageSeparator, ProcessOptions};
use crate::error::{OcrError, PageError, Pdf2TextError, RasterError};
use crate::output::{HybridOutput, PageMethod, PageResult, ProcessingMetadata, ProcessingMethod};
use crate::pipeline::batch::{run_in_batches, BatchPlan};
use crate::pipeline::extract::{ExtractedText, PageRange, TextExtractor};
use crate::pipeline::ocr::VisionOcrClient;
use crate::pipeline::preprocess::ImagePreprocessor;
use crate::pipeline::render::{RasterOptions, Rasterizer};
use crate::pipeline::retry::RetryError;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::prompts::ocr_prompt;
use crate::triage::{page_length, PageTriage, Triage, TriageReport};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Drives one document through the hybrid pipeline.
///
/// All collaborators are injected, so tests can run the full pipeline
/// against in-memory fakes.
pub struct HybridOrchestrator {
    config: HybridConfig,
    triage: Triage,
    preprocessor: ImagePreprocessor,
    extractor: Arc<dyn TextExtractor>,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<VisionOcrClient>,
    progress: ProgressCallback,
}

impl std::fmt::Debug for HybridOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridOrchestrator")
            .field("config", &self.config)
            .field("extractor", &self.extractor.name())
            .field("ocr", &self.ocr)
            .finish()
    }
}

impl HybridOrchestrator {
    pub fn new(
        config: HybridConfig,
        extractor: Arc<dyn TextExtractor>,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<VisionOcrClient>,
    ) -> Self {
        let progress = config
            .progress_callback
            .clone()
            .unwrap_or_else(|| Arc::new(NoopProgressCallback));
        Self {
            triage: Triage::from_config(&config),
            preprocessor: ImagePreprocessor::new(config.preprocess.clone()),
            config,
            extractor,
            rasterizer,
            ocr,
            progress,
        }
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Process one document.
    pub async fn process(
        &self,
        pdf: Arc<[u8]>,
        options: &ProcessOptions,
    ) -> Result<HybridOutput, Pdf2TextError> {
        options.validate()?;
        let start = Instant::now();

        // ── Stage 1: whole-document triage ───────────────────────────────
        let (native, page_count) = self.read_document(&pdf).await?;
        let native_text = native.as_ref().map_or("", |n| n.text.as_str());
        let pages = self.native_pages(&pdf, page_count, native.is_some()).await;
        let verdict = self
            .triage
            .assess_document(native_text, &page_lengths(&pages));
        self.progress
            .on_triage(page_count, verdict.accepted, &verdict.reason);

        if verdict.accepted {
            info!(
                "Triage: native text accepted ({} pages, confidence {:.2})",
                page_count, verdict.validation.confidence
            );
            return Ok(self.text_only(native_text, page_count, verdict.reason, start));
        }
        info!("Triage: {}; classifying {} pages", verdict.reason, page_count);

        if !options.enable_ocr {
            return self.native_only(pages, verdict.reason, start);
        }

        // ── Stage 2: per-page classification ────────────────────────────
        let mut slots: Vec<Option<PageResult>> = vec![None; page_count];
        let mut ocr_pages = Vec::new();
        for (i, native_page) in pages.into_iter().enumerate() {
            let page = i + 1;
            let method = native_page
                .text
                .as_deref()
                .map_or(PageMethod::Ocr, |t| self.triage.classify_page(t));
            self.progress.on_page_classified(page, method);

            match (method, native_page.text) {
                (PageMethod::Text, Some(text)) => {
                    let result =
                        PageResult::from_text(page, text.trim().to_string(), native_page.elapsed_ms);
                    write_slot(&mut slots, result)?;
                }
                _ => ocr_pages.push(page),
            }
        }
        debug!(
            "Classified {} pages: {} text, {} OCR",
            page_count,
            page_count - ocr_pages.len(),
            ocr_pages.len()
        );

        // ── Stage 3: OCR dispatch ────────────────────────────────────────
        let limit = self.config.max_ocr_pages;
        if ocr_pages.len() > limit {
            let over = ocr_pages.split_off(limit);
            warn!(
                "{} pages need OCR, above the limit of {}; skipping {}",
                limit + over.len(),
                limit,
                over.len()
            );
            for page in over {
                let error = PageError::PageLimitExceeded { page, limit };
                write_slot(&mut slots, self.skip(page, error, 0))?;
            }
        }

        if !ocr_pages.is_empty() {
            for result in self.run_ocr(&pdf, ocr_pages, options, start).await? {
                write_slot(&mut slots, result)?;
            }
        }

        // ── Stage 4: consolidation ───────────────────────────────────────
        let page_results = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| Pdf2TextError::Internal(format!("page {} has no result", i + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.finish(page_results, verdict.reason, start))
    }

    /// Run both triage gates and report what [`Self::process`] would do,
    /// without rasterising or calling any vision service.
    pub async fn triage_report(&self, pdf: Arc<[u8]>) -> Result<TriageReport, Pdf2TextError> {
        let (native, page_count) = self.read_document(&pdf).await?;
        let native_text = native.as_ref().map_or("", |n| n.text.as_str());
        let native_pages = self.native_pages(&pdf, page_count, native.is_some()).await;
        let verdict = self
            .triage
            .assess_document(native_text, &page_lengths(&native_pages));

        let pages = if verdict.accepted {
            Vec::new()
        } else {
            native_pages
                .iter()
                .enumerate()
                .map(|(i, native_page)| {
                    let text = native_page.text.as_deref().unwrap_or_default();
                    PageTriage {
                        page_number: i + 1,
                        char_length: page_length(text),
                        method: self.triage.classify_page(text),
                    }
                })
                .collect()
        };

        Ok(TriageReport {
            page_count,
            verdict,
            pages,
        })
    }

    // ── Stages ───────────────────────────────────────────────────────────

    /// Native text of the whole document plus its page count.
    ///
    /// When extraction fails the page count comes from the rasteriser; if
    /// that also fails the document is unreadable.
    async fn read_document(
        &self,
        pdf: &Arc<[u8]>,
    ) -> Result<(Option<ExtractedText>, usize), Pdf2TextError> {
        let native = match self.extractor.extract(Arc::clone(pdf), None).await {
            Ok(extracted) => Some(extracted),
            Err(e) => {
                warn!("Native text extraction failed ({}); every page goes to OCR", e);
                None
            }
        };

        let page_count = match &native {
            Some(extracted) => extracted.page_count,
            None => self
                .rasterizer
                .page_count(Arc::clone(pdf))
                .await
                .map_err(document_error)?,
        };
        if page_count == 0 {
            return Err(Pdf2TextError::DocumentUnreadable {
                detail: "document has no pages".into(),
            });
        }
        Ok((native, page_count))
    }

    /// Native text of every page. All `None` when `has_text_layer` is false,
    /// since extraction already failed for the whole document.
    async fn native_pages(
        &self,
        pdf: &Arc<[u8]>,
        page_count: usize,
        has_text_layer: bool,
    ) -> Vec<NativePage> {
        let mut pages = Vec::with_capacity(page_count);
        for page in 1..=page_count {
            let page_start = Instant::now();
            let text = if has_text_layer {
                self.page_text(pdf, page).await
            } else {
                None
            };
            pages.push(NativePage {
                text,
                elapsed_ms: elapsed_ms(page_start),
            });
        }
        pages
    }

    async fn page_text(&self, pdf: &Arc<[u8]>, page: usize) -> Option<String> {
        match self
            .extractor
            .extract(Arc::clone(pdf), Some(PageRange::single(page)))
            .await
        {
            Ok(extracted) => Some(extracted.text),
            Err(e) => {
                debug!("Page {}: native extraction failed ({})", page, e);
                None
            }
        }
    }

    async fn run_ocr(
        &self,
        pdf: &Arc<[u8]>,
        pages: Vec<usize>,
        options: &ProcessOptions,
        start: Instant,
    ) -> Result<Vec<PageResult>, Pdf2TextError> {
        let prompt = ocr_prompt(
            self.config.system_prompt.as_deref(),
            options.ocr.language.as_deref(),
        );
        let raster = RasterOptions {
            density: options.ocr.density,
            format: options.ocr.format,
            max_pixels: self.config.max_rendered_pixels,
        };
        let enhance = options.ocr.enhance_image;
        let deadline = self.config.document_timeout().map(|t| start + t);
        let plan = BatchPlan::new(options.ocr.max_pages_parallel, self.ocr.batch_delay())
            .with_deadline(deadline);

        info!(
            "OCR: {} pages via {}, {} at a time",
            pages.len(),
            self.ocr.service_name(),
            plan.batch_size
        );
        self.progress.on_ocr_start(pages.len());

        let outcome = run_in_batches(
            pages,
            &plan,
            |page| self.ocr_page(Arc::clone(pdf), page, &prompt, raster, enhance),
            |index, batch| self.progress.on_ocr_batch_start(index, batch),
        )
        .await?;

        let secs = self.config.document_timeout_secs.unwrap_or_default();
        let mut results = outcome.completed;
        for page in outcome.expired {
            let error = PageError::DeadlineExceeded { page, secs };
            results.push(self.skip(page, error, elapsed_ms(start)));
        }
        Ok(results)
    }

    /// Rasterise, clean up and recognise one page.
    ///
    /// `Err` is reserved for failures that end the whole run.
    async fn ocr_page(
        &self,
        pdf: Arc<[u8]>,
        page: usize,
        prompt: &str,
        raster: RasterOptions,
        enhance: bool,
    ) -> Result<PageResult, Pdf2TextError> {
        let start = Instant::now();
        self.progress.on_ocr_page_start(page);

        let image = match self.rasterizer.rasterize(pdf, page, raster).await {
            Ok(image) => image,
            Err(RasterError::PageFailed { detail, .. }) => {
                let error = PageError::RasterisationFailed { page, detail };
                return Ok(self.skip(page, error, elapsed_ms(start)));
            }
            Err(e) => return Err(document_error(e)),
        };
        let image = if enhance {
            self.preprocessor.optimize(image)
        } else {
            image
        };

        let label = format!("Page {page}");
        match self.ocr.extract_text(&image, prompt, &label).await {
            Ok(outcome) => {
                self.progress
                    .on_ocr_page_complete(page, outcome.text.len(), outcome.confidence);
                Ok(PageResult::from_ocr(
                    page,
                    outcome.text,
                    outcome.confidence,
                    elapsed_ms(start),
                ))
            }
            Err(RetryError::Fatal(OcrError::Auth(detail))) => {
                Err(Pdf2TextError::OcrAuth { detail })
            }
            Err(e) => {
                let attempts = e.attempts();
                let error = PageError::OcrFailed {
                    page,
                    attempts,
                    detail: e.into_inner().to_string(),
                };
                Ok(self.skip(page, error, elapsed_ms(start)))
            }
        }
    }

    fn skip(&self, page: usize, error: PageError, processing_time_ms: u64) -> PageResult {
        warn!("{}", error);
        self.progress.on_ocr_page_error(page, &error.to_string());
        PageResult::skipped(page, error, processing_time_ms)
    }

    // ── Output ───────────────────────────────────────────────────────────

    /// OCR is off: every page with native text is kept, however weak, and
    /// pages without any are skipped.
    fn native_only(
        &self,
        pages: Vec<NativePage>,
        reason: String,
        start: Instant,
    ) -> Result<HybridOutput, Pdf2TextError> {
        let page_results: Vec<PageResult> = pages
            .into_iter()
            .enumerate()
            .map(|(i, native_page)| {
                let page = i + 1;
                match native_page.text.filter(|t| !t.trim().is_empty()) {
                    Some(text) => {
                        PageResult::from_text(page, text.trim().to_string(), native_page.elapsed_ms)
                    }
                    None => {
                        debug!("Page {}: no native text, OCR disabled", page);
                        PageResult::skipped(page, PageError::OcrDisabled { page }, 0)
                    }
                }
            })
            .collect();

        if page_results.iter().all(|r| r.skipped) {
            return Err(Pdf2TextError::NoTextLayer { reason });
        }
        warn!("OCR disabled; returning native text as-is");
        Ok(self.finish(page_results, format!("OCR disabled: {reason}"), start))
    }

    /// Whole-document acceptance implies every page cleared the page gate,
    /// so every page counts as a text page.
    fn text_only(
        &self,
        text: &str,
        page_count: usize,
        trigger_reason: String,
        start: Instant,
    ) -> HybridOutput {
        self.progress.on_complete(page_count, 0);
        HybridOutput {
            text: text.trim().to_string(),
            metadata: ProcessingMetadata {
                method: ProcessingMethod::TextOnly,
                page_count,
                text_pages: page_count,
                ocr_pages: 0,
                skipped_pages: 0,
                total_processing_time_ms: elapsed_ms(start),
                average_ocr_confidence: 0.0,
                trigger_reason,
            },
            page_results: Vec::new(),
        }
    }

    fn finish(
        &self,
        page_results: Vec<PageResult>,
        trigger_reason: String,
        start: Instant,
    ) -> HybridOutput {
        let text = consolidate(&page_results, &self.config.page_separator);

        let text_pages = page_results
            .iter()
            .filter(|r| r.method == PageMethod::Text)
            .count();
        let skipped_pages = page_results.iter().filter(|r| r.skipped).count();
        let skipped_ocr = page_results
            .iter()
            .filter(|r| r.skipped && !matches!(r.error, Some(PageError::OcrDisabled { .. })))
            .count();
        let recognised: Vec<f64> = page_results
            .iter()
            .filter(|r| r.method == PageMethod::Ocr && !r.skipped)
            .map(|r| r.confidence)
            .collect();
        let ocr_pages = recognised.len();
        let average_ocr_confidence = if recognised.is_empty() {
            0.0
        } else {
            recognised.iter().sum::<f64>() / ocr_pages as f64
        };

        let metadata = ProcessingMetadata {
            method: ProcessingMethod::from_counts(text_pages, ocr_pages, skipped_ocr),
            page_count: page_results.len(),
            text_pages,
            ocr_pages,
            skipped_pages,
            total_processing_time_ms: elapsed_ms(start),
            average_ocr_confidence,
            trigger_reason,
        };
        info!(
            "Done: {} pages ({} text, {} OCR, {} skipped) in {}ms",
            metadata.page_count,
            text_pages,
            ocr_pages,
            skipped_pages,
            metadata.total_processing_time_ms
        );
        self.progress.on_complete(metadata.page_count, skipped_pages);

        HybridOutput {
            text,
            metadata,
            page_results,
        }
    }
}

/// Native text of one page and how long extracting it took.
struct NativePage {
    text: Option<String>,
    elapsed_ms: u64,
}

fn page_lengths(pages: &[NativePage]) -> Vec<usize> {
    pages
        .iter()
        .map(|p| p.text.as_deref().map_or(0, page_length))
        .collect()
}

/// Join page texts in page-number order, whatever order `page_results` is in.
///
/// Skipped and empty pages contribute nothing, not even a separator.
pub fn consolidate(page_results: &[PageResult], separator: &PageSeparator) -> String {
    let mut ordered: Vec<&PageResult> = page_results
        .iter()
        .filter(|r| !r.skipped && !r.text.trim().is_empty())
        .collect();
    ordered.sort_by_key(|r| r.page_number);

    let mut out = String::new();
    for (i, result) in ordered.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator.render(result.page_number));
        }
        out.push_str(result.text.trim());
    }
    out
}

fn write_slot(slots: &mut [Option<PageResult>], result: PageResult) -> Result<(), Pdf2TextError> {
    let page = result.page_number;
    let Some(slot) = page.checked_sub(1).and_then(|i| slots.get_mut(i)) else {
        return Err(Pdf2TextError::Internal(format!(
            "page {page} is outside the document"
        )));
    };
    if slot.is_some() {
        return Err(Pdf2TextError::Internal(format!(
            "page {page} produced two results"
        )));
    }
    *slot = Some(result);
    Ok(())
}

fn document_error(e: RasterError) -> Pdf2TextError {
    match e {
        RasterError::Unavailable(detail) => Pdf2TextError::PdfiumBindingFailed(detail),
        RasterError::DocumentUnreadable(detail) => Pdf2TextError::DocumentUnreadable { detail },
        RasterError::PageFailed { page, detail } => Pdf2TextError::DocumentUnreadable {
            detail: format!("page {page}: {detail}"),
        },
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize, text: &str) -> PageResult {
        PageResult::from_text(n, text.to_string(), 0)
    }

    #[test]
    fn consolidation_ignores_input_order() {
        let forward = vec![page(1, "one"), page(2, "two"), page(3, "three")];
        let mut shuffled = forward.clone();
        shuffled.swap(0, 2);
        shuffled.swap(1, 2);

        let sep = PageSeparator::default();
        assert_eq!(consolidate(&forward, &sep), "one\n\ntwo\n\nthree");
        assert_eq!(consolidate(&shuffled, &sep), consolidate(&forward, &sep));
    }

    #[test]
    fn skipped_pages_leave_no_gap() {
        let results = vec![
            page(1, "one"),
            PageResult::skipped(
                2,
                PageError::PageLimitExceeded { page: 2, limit: 1 },
                0,
            ),
            page(3, "three"),
        ];
        assert_eq!(
            consolidate(&results, &PageSeparator::Marker),
            "one\n\n--- page 3 ---\n\nthree"
        );
    }

    #[test]
    fn slots_are_write_once() {
        let mut slots = vec![None, None];
        write_slot(&mut slots, page(2, "b")).unwrap();
        assert!(write_slot(&mut slots, page(2, "again")).is_err());
        assert!(write_slot(&mut slots, page(3, "c")).is_err());
        assert!(write_slot(&mut slots, page(0, "zero")).is_err());
        assert!(slots[0].is_none());
    }

    #[test]
    fn raster_errors_map_to_fatal_kinds() {
        assert!(matches!(
            document_error(RasterError::Unavailable("no lib".into())),
            Pdf2TextError::PdfiumBindingFailed(_)
        ));
        assert!(matches!(
            document_error(RasterError::DocumentUnreadable("bad xref".into())),
            Pdf2TextError::DocumentUnreadable { .. }
        ));
    }
}

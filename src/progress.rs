//! Progress-callback trait for processing events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::HybridConfigBuilder::progress_callback`] to follow a run:
//! triage verdict, per-page classification, OCR batches and per-page OCR
//! outcomes.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2text::{HybridConfig, ProcessingProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognised: AtomicUsize,
//! }
//!
//! impl ProcessingProgressCallback for CountingCallback {
//!     fn on_ocr_page_complete(&self, page_num: usize, text_len: usize, confidence: f64) {
//!         self.recognised.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}: {text_len} chars ({confidence:.2})");
//!     }
//! }
//!
//! let config = HybridConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { recognised: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PageMethod;
use std::sync::Arc;

/// Called by the orchestrator as a run progresses.
///
/// OCR events fire from concurrently running page tasks, so implementations
/// must protect shared mutable state. All methods default to no-ops.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Whole-document triage finished.
    ///
    /// `accepted` is true when the native text layer was used as-is.
    fn on_triage(&self, page_count: usize, accepted: bool, reason: &str) {
        let _ = (page_count, accepted, reason);
    }

    /// A page was classified during per-page triage.
    fn on_page_classified(&self, page_num: usize, method: PageMethod) {
        let _ = (page_num, method);
    }

    /// OCR is about to start for `pages` pages.
    fn on_ocr_start(&self, pages: usize) {
        let _ = pages;
    }

    /// A batch of OCR pages is being dispatched (0-based batch index).
    fn on_ocr_batch_start(&self, batch_index: usize, pages: &[usize]) {
        let _ = (batch_index, pages);
    }

    /// OCR began for one page.
    fn on_ocr_page_start(&self, page_num: usize) {
        let _ = page_num;
    }

    /// OCR produced text for one page.
    fn on_ocr_page_complete(&self, page_num: usize, text_len: usize, confidence: f64) {
        let _ = (page_num, text_len, confidence);
    }

    /// A page was skipped.
    fn on_ocr_page_error(&self, page_num: usize, error: &str) {
        let _ = (page_num, error);
    }

    /// The run finished.
    fn on_complete(&self, page_count: usize, skipped_pages: usize) {
        let _ = (page_count, skipped_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::HybridConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        classified: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ProcessingProgressCallback for TrackingCallback {
        fn on_page_classified(&self, _page_num: usize, _method: PageMethod) {
            self.classified.fetch_add(1, Ordering::SeqCst);
        }

        fn on_ocr_page_complete(&self, _page_num: usize, _len: usize, _confidence: f64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_ocr_page_error(&self, _page_num: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_triage(3, false, "low word density");
        cb.on_page_classified(1, PageMethod::Text);
        cb.on_ocr_start(2);
        cb.on_ocr_batch_start(0, &[2, 3]);
        cb.on_ocr_page_start(2);
        cb.on_ocr_page_complete(2, 120, 0.9);
        cb.on_ocr_page_error(3, "timeout");
        cb.on_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_classified(1, PageMethod::Text);
        tracker.on_page_classified(2, PageMethod::Ocr);
        tracker.on_ocr_page_complete(2, 10, 0.7);
        tracker.on_ocr_page_error(3, "boom");

        assert_eq!(tracker.classified.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_ocr_start(10);
    }
}

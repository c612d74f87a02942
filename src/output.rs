//! Output types: per-page results, run metadata and the response envelope.
//!
//! Everything here serialises to camelCase JSON, matching what HTTP callers
//! of the pipeline expect:
//!
//! ```json
//! { "success": true,
//!   "data": { "text": "…", "metadata": { "method": "hybrid", … },
//!             "pageResults": [ { "pageNumber": 1, "method": "text", … } ] } }
//! ```

use crate::error::{PageError, Pdf2TextError};
use serde::{Deserialize, Serialize};

/// How a single page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMethod {
    Text,
    Ocr,
}

/// Result for one page. Created once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// 1-based.
    pub page_number: usize,
    /// Empty when `skipped`.
    pub text: String,
    pub method: PageMethod,
    /// 1.0 for native text; the OCR estimate otherwise; 0.0 when skipped.
    pub confidence: f64,
    pub processing_time_ms: u64,
    pub skipped: bool,
    /// Why the page was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
}

impl PageResult {
    /// A page whose native text layer was good enough.
    pub fn from_text(page_number: usize, text: String, processing_time_ms: u64) -> Self {
        Self {
            page_number,
            text,
            method: PageMethod::Text,
            confidence: 1.0,
            processing_time_ms,
            skipped: false,
            error: None,
        }
    }

    /// A page recognised by OCR.
    pub fn from_ocr(
        page_number: usize,
        text: String,
        confidence: f64,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            page_number,
            text,
            method: PageMethod::Ocr,
            confidence,
            processing_time_ms,
            skipped: false,
            error: None,
        }
    }

    /// An OCR page that produced nothing.
    pub fn skipped(page_number: usize, error: PageError, processing_time_ms: u64) -> Self {
        Self {
            page_number,
            text: String::new(),
            method: PageMethod::Ocr,
            confidence: 0.0,
            processing_time_ms,
            skipped: true,
            error: Some(error),
        }
    }
}

/// Which strategies contributed to the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMethod {
    TextOnly,
    OcrOnly,
    Hybrid,
}

impl ProcessingMethod {
    /// Derive the method from page counts. Skipped pages were OCR
    /// candidates, so they count on the OCR side.
    pub fn from_counts(text_pages: usize, ocr_pages: usize, skipped_pages: usize) -> Self {
        let ocr_side = ocr_pages + skipped_pages;
        match (text_pages > 0, ocr_side > 0) {
            (true, true) => ProcessingMethod::Hybrid,
            (false, true) => ProcessingMethod::OcrOnly,
            _ => ProcessingMethod::TextOnly,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub method: ProcessingMethod,
    pub page_count: usize,
    pub text_pages: usize,
    pub ocr_pages: usize,
    pub skipped_pages: usize,
    pub total_processing_time_ms: u64,
    /// Mean confidence over successfully recognised OCR pages; 0 when none.
    pub average_ocr_confidence: f64,
    /// Why OCR was (or was not) needed, e.g. the validator's reason.
    pub trigger_reason: String,
}

/// Final text plus everything known about how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridOutput {
    pub text: String,
    pub metadata: ProcessingMetadata,
    /// Ordered by page number. Empty when whole-document triage succeeded.
    pub page_results: Vec<PageResult>,
}

impl HybridOutput {
    /// Pages that were skipped, in page order.
    pub fn skipped_pages(&self) -> impl Iterator<Item = &PageResult> {
        self.page_results.iter().filter(|p| p.skipped)
    }

    /// Treat any skipped page as an error.
    ///
    /// The default contract is graceful degradation; callers that need
    /// complete coverage opt in here.
    pub fn into_strict(self) -> Result<Self, Pdf2TextError> {
        let skipped = self.metadata.skipped_pages;
        if skipped > 0 {
            return Err(Pdf2TextError::PartialFailure {
                skipped,
                total: self.metadata.page_count,
            });
        }
        Ok(self)
    }
}

/// The `{success, data?, error?}` envelope returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<HybridOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<HybridOutput, Pdf2TextError>> for ProcessingResponse {
    fn from(result: Result<HybridOutput, Pdf2TextError>) -> Self {
        match result {
            Ok(output) => Self {
                success: true,
                data: Some(output),
                error: None,
            },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(skipped: usize) -> HybridOutput {
        HybridOutput {
            text: "a".into(),
            metadata: ProcessingMetadata {
                method: ProcessingMethod::OcrOnly,
                page_count: 3,
                text_pages: 0,
                ocr_pages: 3 - skipped,
                skipped_pages: skipped,
                total_processing_time_ms: 10,
                average_ocr_confidence: 0.8,
                trigger_reason: "no text layer".into(),
            },
            page_results: vec![],
        }
    }

    #[test]
    fn method_from_counts() {
        assert_eq!(ProcessingMethod::from_counts(2, 2, 0), ProcessingMethod::Hybrid);
        assert_eq!(ProcessingMethod::from_counts(0, 3, 0), ProcessingMethod::OcrOnly);
        assert_eq!(ProcessingMethod::from_counts(0, 2, 1), ProcessingMethod::OcrOnly);
        assert_eq!(ProcessingMethod::from_counts(3, 0, 0), ProcessingMethod::TextOnly);
        assert_eq!(ProcessingMethod::from_counts(2, 0, 1), ProcessingMethod::Hybrid);
    }

    #[test]
    fn metadata_serialises_camel_case() {
        let json = serde_json::to_value(output(0).metadata).unwrap();
        assert_eq!(json["method"], "ocr-only");
        assert_eq!(json["skippedPages"], 0);
        assert!(json.get("averageOcrConfidence").is_some());
    }

    #[test]
    fn skipped_page_shape() {
        let p = PageResult::skipped(
            2,
            PageError::OcrFailed {
                page: 2,
                attempts: 3,
                detail: "empty".into(),
            },
            5,
        );
        assert!(p.skipped);
        assert!(p.text.is_empty());
        assert_eq!(p.confidence, 0.0);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["pageNumber"], 2);
        assert_eq!(json["method"], "ocr");
        assert_eq!(json["error"]["kind"], "ocrFailed");
    }

    #[test]
    fn strict_mode_rejects_skipped_pages() {
        assert!(output(0).into_strict().is_ok());
        let err = output(1).into_strict().unwrap_err();
        assert!(matches!(
            err,
            Pdf2TextError::PartialFailure {
                skipped: 1,
                total: 3
            }
        ));
    }

    #[test]
    fn response_envelope() {
        let ok: ProcessingResponse = Ok(output(1)).into();
        assert!(ok.success);
        let json = serde_json::to_value(&ok).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["data"]["metadata"]["skippedPages"], 1);

        let err: ProcessingResponse =
            Err(Pdf2TextError::DocumentUnreadable { detail: "bad xref".into() }).into();
        assert!(!err.success);
        assert!(err.data.is_none());
        assert!(err.error.unwrap().contains("bad xref"));
    }
}

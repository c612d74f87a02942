//! Deciding where text comes from.
//!
//! Two gates with independent thresholds:
//!
//! * **Whole document**: the native text of the entire document must be
//!   longer than `whole_document_min_chars`, pass the
//!   [`TextQualityValidator`], and every page must clear the per-page gate.
//!   When it does, nothing else runs. A few good pages cannot carry scanned
//!   ones past this gate.
//! * **Per page**: a page whose trimmed native text is longer than
//!   `page_min_chars` is taken as-is; anything shorter goes to OCR. This gate
//!   is length-only: a good document's title page is short but real.

use crate::config::HybridConfig;
use crate::output::PageMethod;
use serde::{Deserialize, Serialize};
use text_quality::{TextQualityValidator, ValidationResult};

/// Outcome of whole-document triage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageVerdict {
    /// The native text can be returned without per-page work.
    pub accepted: bool,
    /// Why, in words. Becomes `triggerReason` in the run metadata.
    pub reason: String,
    pub validation: ValidationResult,
}

/// Native-text statistics for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTriage {
    pub page_number: usize,
    /// Trimmed character count of the native text; 0 when extraction failed.
    pub char_length: usize,
    pub method: PageMethod,
}

/// What [`crate::inspect`] reports: the decisions a run would make, without
/// running OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageReport {
    pub page_count: usize,
    pub verdict: TriageVerdict,
    /// Empty when the whole document was accepted.
    pub pages: Vec<PageTriage>,
}

impl TriageReport {
    /// Pages that would be sent to OCR.
    pub fn ocr_pages(&self) -> impl Iterator<Item = &PageTriage> {
        self.pages.iter().filter(|p| p.method == PageMethod::Ocr)
    }
}

/// Applies both triage gates.
#[derive(Debug, Clone)]
pub struct Triage {
    validator: TextQualityValidator,
    whole_document_min_chars: usize,
    page_min_chars: usize,
}

impl Triage {
    pub fn new(
        validator: TextQualityValidator,
        whole_document_min_chars: usize,
        page_min_chars: usize,
    ) -> Self {
        Self {
            validator,
            whole_document_min_chars,
            page_min_chars,
        }
    }

    pub fn from_config(config: &HybridConfig) -> Self {
        Self::new(
            TextQualityValidator::new(config.validator.clone()),
            config.whole_document_min_chars,
            config.page_min_chars,
        )
    }

    /// Whole-document gate.
    ///
    /// `page_lengths` holds the trimmed native length of each page in order,
    /// as measured by [`page_length`]; 0 where extraction failed.
    pub fn assess_document(&self, text: &str, page_lengths: &[usize]) -> TriageVerdict {
        let validation = self.validator.validate(text);
        let uncovered: Vec<usize> = page_lengths
            .iter()
            .enumerate()
            .filter(|&(_, &len)| len <= self.page_min_chars)
            .map(|(i, _)| i + 1)
            .collect();
        let length = validation.metrics.char_length;

        let (accepted, reason) = if length <= self.whole_document_min_chars {
            (
                false,
                format!(
                    "native text too short ({} ≤ {} chars)",
                    length, self.whole_document_min_chars
                ),
            )
        } else if !validation.is_valid {
            (
                false,
                format!(
                    "low text quality (confidence {:.2}): {}",
                    validation.confidence, validation.reason
                ),
            )
        } else if !uncovered.is_empty() {
            (
                false,
                format!(
                    "{} of {} pages lack a usable text layer (pages {})",
                    uncovered.len(),
                    page_lengths.len(),
                    join_pages(&uncovered)
                ),
            )
        } else {
            (true, validation.reason.clone())
        };

        TriageVerdict {
            accepted,
            reason,
            validation,
        }
    }

    /// Per-page gate.
    pub fn classify_page(&self, text: &str) -> PageMethod {
        if page_length(text) > self.page_min_chars {
            PageMethod::Text
        } else {
            PageMethod::Ocr
        }
    }
}

/// Trimmed character count, as the per-page gate measures it.
pub fn page_length(text: &str) -> usize {
    text.trim().chars().count()
}

fn join_pages(pages: &[usize]) -> String {
    const SHOWN: usize = 10;
    let mut out = pages
        .iter()
        .take(SHOWN)
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if pages.len() > SHOWN {
        out.push_str(", ...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triage() -> Triage {
        Triage::from_config(&HybridConfig::default())
    }

    const PROSE: &str = "The quarterly report shows steady growth across all regions. \
        Revenue increased by twelve percent while operating costs remained flat.";

    /// Lengths of two well-covered pages.
    const COVERED: &[usize] = &[70, 62];

    #[test]
    fn accepts_good_prose() {
        let v = triage().assess_document(PROSE, COVERED);
        assert!(v.accepted, "{v:?}");
        assert!(v.validation.is_valid);
    }

    #[test]
    fn short_text_is_rejected_even_if_valid() {
        let v = triage().assess_document("A short but perfectly fine sentence.", &[36]);
        assert!(!v.accepted);
        assert!(v.reason.contains("too short"), "{}", v.reason);
    }

    #[test]
    fn garbage_is_rejected_with_quality_reason() {
        let v = triage().assess_document(&".".repeat(80), &[80]);
        assert!(!v.accepted);
        assert!(v.reason.contains("low text quality"), "{}", v.reason);
        assert!(!v.validation.is_valid);
    }

    #[test]
    fn good_text_with_textless_pages_is_rejected() {
        let v = triage().assess_document(PROSE, &[70, 62, 0, 0]);
        assert!(!v.accepted);
        assert!(v.validation.is_valid);
        assert_eq!(v.reason, "2 of 4 pages lack a usable text layer (pages 3, 4)");
    }

    #[test]
    fn page_exactly_at_the_page_threshold_blocks_acceptance() {
        assert!(!triage().assess_document(PROSE, &[70, 20]).accepted);
        assert!(triage().assess_document(PROSE, &[70, 21]).accepted);
    }

    #[test]
    fn long_uncovered_lists_are_truncated() {
        let mut lengths = vec![0; 12];
        lengths.push(200);
        let v = triage().assess_document(PROSE, &lengths);
        assert!(v.reason.starts_with("12 of 13 pages"), "{}", v.reason);
        assert!(v.reason.ends_with("(pages 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, ...)"));
    }

    #[test]
    fn page_gate_is_length_only_and_strict() {
        let t = triage();
        // exactly 20 chars after trimming
        assert_eq!(t.classify_page("   abcdefghij0123456789  "), PageMethod::Ocr);
        assert_eq!(t.classify_page("abcdefghij0123456789X"), PageMethod::Text);
        assert_eq!(t.classify_page(""), PageMethod::Ocr);
    }

    #[test]
    fn thresholds_are_independent() {
        let config = HybridConfig::builder()
            .whole_document_min_chars(500)
            .page_min_chars(5)
            .build()
            .unwrap();
        let t = Triage::from_config(&config);
        assert!(!t.assess_document(PROSE, COVERED).accepted);
        assert_eq!(t.classify_page("Title"), PageMethod::Ocr);
        assert_eq!(t.classify_page("Title page"), PageMethod::Text);
    }
}

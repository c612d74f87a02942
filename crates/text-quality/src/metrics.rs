//! Text normalisation and the statistics the scorer works from.

use crate::entropy::EntropyCalculator;
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

/// Statistics derived from one normalised text. Recomputed on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    /// Length of the normalised text in Unicode scalar values.
    pub char_length: usize,
    pub word_count: usize,
    /// `word_count / char_length`, 0 for empty text.
    pub word_density: f64,
    /// As reported by the configured [`EntropyCalculator`].
    pub entropy: f64,
    /// Distinct characters after lowercasing.
    pub unique_char_count: usize,
    /// Mean word length in chars, 0 when there are no words.
    pub average_word_length: f64,
    pub repetitive_patterns: bool,
}

/// NFKC-normalise, trim, and collapse every whitespace run to one space.
///
/// NFKC rather than NFC so that presentation forms common in PDF text layers
/// (`ﬁ` ligatures, full-width digits) compare equal to their plain spellings.
pub fn normalize_text(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compute [`ValidationMetrics`] for text that has already been through
/// [`normalize_text`].
pub fn compute_metrics(
    normalized: &str,
    tokenizer: &dyn Tokenizer,
    entropy: &dyn EntropyCalculator,
) -> ValidationMetrics {
    let char_length = normalized.chars().count();
    let words = tokenizer.tokenize(normalized);
    let word_count = words.len();

    let word_density = if char_length == 0 {
        0.0
    } else {
        word_count as f64 / char_length as f64
    };

    let average_word_length = if word_count == 0 {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count as f64
    };

    let unique_char_count = normalized
        .chars()
        .flat_map(char::to_lowercase)
        .collect::<HashSet<_>>()
        .len();

    ValidationMetrics {
        char_length,
        word_count,
        word_density,
        entropy: entropy.entropy(normalized),
        unique_char_count,
        average_word_length,
        repetitive_patterns: has_repetitive_patterns(normalized, &words),
    }
}

// ── Repetition detection ─────────────────────────────────────────────────

/// Same character this many times in a row.
const CHAR_RUN_LIMIT: usize = 5;
/// A 2–4 char unit repeated this many times back to back.
const UNIT_REPEAT_LIMIT: usize = 3;
/// Share of all word tokens a single word may take.
const DOMINANT_WORD_SHARE: f64 = 0.3;

fn has_repetitive_patterns(text: &str, words: &[&str]) -> bool {
    let chars: Vec<char> = text.chars().collect();
    has_char_run(&chars) || has_repeated_unit(&chars) || has_dominant_word(words)
}

fn has_char_run(chars: &[char]) -> bool {
    let mut run = 0usize;
    let mut prev: Option<char> = None;
    for &c in chars {
        if prev == Some(c) {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        if run >= CHAR_RUN_LIMIT {
            return true;
        }
    }
    false
}

fn has_repeated_unit(chars: &[char]) -> bool {
    (2..=4).any(|unit| {
        let span = unit * UNIT_REPEAT_LIMIT;
        chars.len() >= span
            && (0..=chars.len() - span).any(|start| {
                let first = &chars[start..start + unit];
                (1..UNIT_REPEAT_LIMIT).all(|k| {
                    let from = start + k * unit;
                    &chars[from..from + unit] == first
                })
            })
    })
}

/// A word counts as dominant only if it actually repeats; otherwise any
/// three-word text would trip the 30% share.
fn has_dominant_word(words: &[&str]) -> bool {
    if words.is_empty() {
        return false;
    }
    let mut freq: HashMap<String, usize> = HashMap::new();
    for w in words {
        *freq.entry(w.to_lowercase()).or_insert(0) += 1;
    }
    let top = freq.values().copied().max().unwrap_or(0);
    top >= 2 && top as f64 / words.len() as f64 > DOMINANT_WORD_SHARE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ShannonEntropy;
    use crate::tokenizer::UniversalTokenizer;

    fn metrics(text: &str) -> ValidationMetrics {
        compute_metrics(&normalize_text(text), &UniversalTokenizer, &ShannonEntropy)
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a \t\n b   c  "), "a b c");
    }

    #[test]
    fn normalize_folds_ligatures() {
        assert_eq!(normalize_text("ﬁnal"), "final");
    }

    #[test]
    fn empty_text_metrics_are_zero() {
        let m = metrics("   ");
        assert_eq!(m.char_length, 0);
        assert_eq!(m.word_count, 0);
        assert_eq!(m.word_density, 0.0);
        assert_eq!(m.average_word_length, 0.0);
        assert!(!m.repetitive_patterns);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let m = metrics("đồng");
        assert_eq!(m.char_length, 4);
        assert_eq!(m.word_count, 1);
        assert_eq!(m.average_word_length, 4.0);
    }

    #[test]
    fn unique_chars_are_case_insensitive() {
        let m = metrics("AaBb");
        assert_eq!(m.unique_char_count, 2);
    }

    #[test]
    fn detects_single_char_runs() {
        assert!(metrics("wait.....").repetitive_patterns);
        assert!(!metrics("wait....").repetitive_patterns);
    }

    #[test]
    fn detects_repeated_units() {
        assert!(metrics("xo abababc").repetitive_patterns);
        assert!(metrics("the l1|l1|l1| end").repetitive_patterns);
        assert!(!metrics("banana split").repetitive_patterns);
    }

    #[test]
    fn detects_dominant_word() {
        assert!(metrics("page one page two page three page").repetitive_patterns);
        assert!(!metrics("hello brave world").repetitive_patterns);
    }

    #[test]
    fn prose_is_not_repetitive() {
        let m = metrics("Hợp đồng mua bán nhà đất được ký kết ngày hôm nay.");
        assert!(!m.repetitive_patterns);
        assert_eq!(m.word_count, 12);
    }
}

//! Thresholds and deduction weights for the quality scorer.
//!
//! The numbers below are empirical. They were tuned against real text layers
//! (digital contracts, scanned forms with junk OCR layers, broken CID fonts)
//! rather than derived from a model, so every one of them is a field callers
//! can override instead of a constant.

use serde::{Deserialize, Serialize};

/// Thresholds controlling when a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Normalised texts shorter than this (in chars) are rejected outright
    /// with confidence 0. Default: 10.
    pub min_absolute_length: usize,

    /// Words per character below which the text is a hard fail. Default: 0.05.
    ///
    /// English prose sits around 0.15–0.20; a page of dots or box-drawing
    /// glyphs sits at 0.
    pub min_word_density: f64,

    /// Minimum number of word tokens. Default: 3.
    pub min_word_count: usize,

    /// Mean word length below which the text looks like scattered glyphs.
    /// Default: 2.5.
    pub min_average_word_length: f64,

    /// Mean word length above which the "words" are probably runs of
    /// garbled characters with the spaces missing. Default: 15.
    pub max_average_word_length: f64,

    /// Shannon entropy (bits/char) below which the text is too repetitive.
    /// Default: 1.5.
    pub min_text_entropy: f64,

    /// Distinct lowercase chars divided by `min(char_length, 50)`. Default: 0.25.
    pub min_unique_char_ratio: f64,

    /// Verdict threshold: `is_valid ⟺ confidence ≥ confidence_threshold`.
    /// Default: 0.5.
    pub confidence_threshold: f64,

    /// Deduction applied by each rule.
    pub weights: ScoringWeights,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_absolute_length: 10,
            min_word_density: 0.05,
            min_word_count: 3,
            min_average_word_length: 2.5,
            max_average_word_length: 15.0,
            min_text_entropy: 1.5,
            min_unique_char_ratio: 0.25,
            confidence_threshold: 0.5,
            weights: ScoringWeights::default(),
        }
    }
}

/// How much confidence each failing rule removes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Confidence returned (not deducted) on a word-density hard fail. Default: 0.1.
    pub critical_density_confidence: f64,
    /// Default: 0.5.
    pub low_word_count: f64,
    /// Default: 0.3.
    pub short_words: f64,
    /// Default: 0.4.
    pub long_words: f64,
    /// Default: 0.4.
    pub low_entropy: f64,
    /// Default: 0.3.
    pub repetitive_patterns: f64,
    /// Default: 0.2.
    pub low_char_diversity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            critical_density_confidence: 0.1,
            low_word_count: 0.5,
            short_words: 0.3,
            long_words: 0.4,
            low_entropy: 0.4,
            repetitive_patterns: 0.3,
            low_char_diversity: 0.2,
        }
    }
}

//! Confidence scoring and the valid/invalid verdict.
//!
//! ## Rule order
//!
//! Word density is checked first and short-circuits: when fewer than one char
//! in twenty belongs to a word, nothing else about the text matters. The
//! remaining rules each subtract their weight from 1.0 in a fixed order and the
//! verdict's `reason` is the message of the last rule that fired, so the most
//! specific failure encountered is the one reported.

use crate::config::ValidatorConfig;
use crate::entropy::{EntropyCalculator, ShannonEntropy};
use crate::metrics::{compute_metrics, normalize_text, ValidationMetrics};
use crate::tokenizer::{Tokenizer, UniversalTokenizer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reason reported when no rule fired.
pub const REASON_ACCEPTABLE: &str = "text quality acceptable";

/// The validator's verdict for one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Heuristic quality estimate in `[0, 1]`.
    pub confidence: f64,
    /// `confidence ≥ confidence_threshold`.
    pub is_valid: bool,
    pub reason: String,
    pub metrics: ValidationMetrics,
}

/// Statistical text-quality validator.
///
/// Cheap to clone; strategies are shared behind `Arc`.
#[derive(Clone)]
pub struct TextQualityValidator {
    config: ValidatorConfig,
    tokenizer: Arc<dyn Tokenizer>,
    entropy: Arc<dyn EntropyCalculator>,
}

impl Default for TextQualityValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl fmt::Debug for TextQualityValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextQualityValidator")
            .field("config", &self.config)
            .field("tokenizer", &"<dyn Tokenizer>")
            .field("entropy", &"<dyn EntropyCalculator>")
            .finish()
    }
}

impl TextQualityValidator {
    /// Validator with the universal tokenizer and raw Shannon entropy.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            tokenizer: Arc::new(UniversalTokenizer),
            entropy: Arc::new(ShannonEntropy),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    pub fn with_entropy_calculator(mut self, entropy: impl EntropyCalculator + 'static) -> Self {
        self.entropy = Arc::new(entropy);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Score `text`. Never fails: empty or malformed input is an invalid
    /// verdict, not an error.
    pub fn validate(&self, text: &str) -> ValidationResult {
        let normalized = normalize_text(text);
        let metrics = compute_metrics(&normalized, &*self.tokenizer, &*self.entropy);
        let cfg = &self.config;

        if metrics.char_length < cfg.min_absolute_length {
            return self.verdict(
                0.0,
                format!(
                    "too short ({} < {} chars)",
                    metrics.char_length, cfg.min_absolute_length
                ),
                metrics,
            );
        }

        if metrics.word_density < cfg.min_word_density {
            return self.verdict(
                cfg.weights.critical_density_confidence,
                format!(
                    "critical: low word density ({:.3} < {:.3})",
                    metrics.word_density, cfg.min_word_density
                ),
                metrics,
            );
        }

        let w = &cfg.weights;
        let mut confidence = 1.0;
        let mut reason: Option<String> = None;

        if metrics.word_count < cfg.min_word_count {
            confidence -= w.low_word_count;
            reason = Some(format!(
                "too few words ({} < {})",
                metrics.word_count, cfg.min_word_count
            ));
        }

        if metrics.average_word_length < cfg.min_average_word_length {
            confidence -= w.short_words;
            reason = Some(format!(
                "average word length too short ({:.2} < {:.2})",
                metrics.average_word_length, cfg.min_average_word_length
            ));
        } else if metrics.average_word_length > cfg.max_average_word_length {
            confidence -= w.long_words;
            reason = Some(format!(
                "average word length too long ({:.2} > {:.2}), likely garbled",
                metrics.average_word_length, cfg.max_average_word_length
            ));
        }

        if metrics.entropy < cfg.min_text_entropy {
            confidence -= w.low_entropy;
            reason = Some(format!(
                "low entropy ({:.2} < {:.2})",
                metrics.entropy, cfg.min_text_entropy
            ));
        }

        if metrics.repetitive_patterns {
            confidence -= w.repetitive_patterns;
            reason = Some("repetitive patterns detected".to_string());
        }

        let diversity_window = metrics.char_length.min(50) as f64;
        let diversity = metrics.unique_char_count as f64 / diversity_window;
        if diversity < cfg.min_unique_char_ratio {
            confidence -= w.low_char_diversity;
            reason = Some(format!(
                "low character diversity ({:.2} < {:.2})",
                diversity, cfg.min_unique_char_ratio
            ));
        }

        self.verdict(
            confidence,
            reason.unwrap_or_else(|| REASON_ACCEPTABLE.to_string()),
            metrics,
        )
    }

    fn verdict(&self, confidence: f64, reason: String, metrics: ValidationMetrics) -> ValidationResult {
        // Round away float noise so 1.0 − 0.3 − 0.2 compares equal to 0.5.
        let confidence = ((confidence * 1e6).round() / 1e6).clamp(0.0, 1.0);
        ValidationResult {
            confidence,
            is_valid: confidence >= self.config.confidence_threshold,
            reason,
            metrics,
        }
    }
}

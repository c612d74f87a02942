//! # text-quality
//!
//! Decide whether a string pulled out of a document's native text layer is
//! real content or garbage.
//!
//! PDF text layers lie. Scanned pages often carry an invisible OCR layer full
//! of `l1l1|||`, broken encodings produce strings of dots or replacement
//! glyphs, and some generators emit one glyph per "word". A byte-length check
//! cannot tell these apart from prose, so this crate computes a handful of
//! cheap, language-agnostic statistics and folds them into a confidence score:
//!
//! ```text
//! text ──▶ normalise ──▶ metrics ──▶ deductions ──▶ confidence ──▶ verdict
//!          (NFKC, ws)    (words,     (fixed order,   [0, 1]        ≥ threshold
//!                         entropy,    configurable
//!                         repeats)    weights)
//! ```
//!
//! Everything here is pure: no I/O, no global state, and the same input always
//! yields the same [`ValidationResult`].
//!
//! ## Quick Start
//!
//! ```rust
//! use text_quality::TextQualityValidator;
//!
//! let validator = TextQualityValidator::default();
//!
//! let verdict = validator.validate("Hợp đồng mua bán nhà đất được ký kết ngày hôm nay.");
//! assert!(verdict.is_valid);
//!
//! let verdict = validator.validate(".............................................");
//! assert!(!verdict.is_valid);
//! ```
//!
//! ## Strategies
//!
//! Word splitting and entropy are strategies chosen at construction time:
//!
//! | Trait | Default | Alternative |
//! |-------|---------|-------------|
//! | [`Tokenizer`] | [`UniversalTokenizer`] | [`UnicodeWordTokenizer`] (UAX #29) |
//! | [`EntropyCalculator`] | [`ShannonEntropy`] | [`ScaledEntropy`] (0–10 scale) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod entropy;
pub mod metrics;
pub mod tokenizer;
pub mod validator;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ScoringWeights, ValidatorConfig};
pub use entropy::{EntropyCalculator, ScaledEntropy, ShannonEntropy};
pub use metrics::{compute_metrics, normalize_text, ValidationMetrics};
pub use tokenizer::{Tokenizer, UnicodeWordTokenizer, UniversalTokenizer};
pub use validator::{TextQualityValidator, ValidationResult};

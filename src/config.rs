//! Configuration types for hybrid PDF-to-text processing.
//!
//! Two layers:
//!
//! * [`HybridConfig`]: service-level knobs that rarely change between
//!   documents: triage thresholds, retry budget, pacing, provider selection.
//!   Built via [`HybridConfigBuilder`], optionally seeded from the
//!   environment with [`HybridConfigBuilder::with_env_overrides`].
//! * [`ProcessOptions`]: per-request options (`enableOcr`, `density`,
//!   `format`, …) as they arrive from a caller, serialisable in camelCase.
//!
//! # Thresholds
//! `whole_document_min_chars` and `page_min_chars` are independent. The
//! whole-document gate is the coarse one: a document must clear it *and*
//! satisfy the validator to skip per-page work. The page gate is finer and
//! purely length-based, because a single page of a good document can be
//! legitimately short (a title page, a signature block).

use crate::error::Pdf2TextError;
use crate::pipeline::retry::RetryPolicy;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use text_quality::ValidatorConfig;

/// Default vision model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Service-level configuration for the hybrid pipeline.
///
/// # Example
/// ```rust
/// use edgequake_pdf2text::HybridConfig;
///
/// let config = HybridConfig::builder()
///     .page_min_chars(40)
///     .max_retries(5)
///     .model("gpt-4.1-mini")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct HybridConfig {
    /// Text-quality validator thresholds and deduction weights.
    pub validator: ValidatorConfig,

    /// Whole-document triage accepts the native text only when its
    /// normalised length exceeds this. Default: 50.
    pub whole_document_min_chars: usize,

    /// A page whose trimmed native text is longer than this is taken as-is;
    /// otherwise it goes to OCR. Default: 20.
    pub page_min_chars: usize,

    /// Inputs larger than this are rejected before parsing. Default: 50 MiB.
    pub max_file_size: u64,

    /// At most this many pages per document are sent to OCR; the rest are
    /// skipped with [`crate::error::PageError::PageLimitExceeded`]. Default: 100.
    pub max_ocr_pages: usize,

    /// Per-attempt timeout for one vision call, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Whole-run OCR deadline in seconds. When it passes no further batch is
    /// dispatched and unfinished pages are skipped. Default: none.
    pub document_timeout_secs: Option<u64>,

    /// Total attempts per vision call, including the first. Default: 3.
    pub max_retries: u32,

    /// Backoff after the first failed attempt, doubled on each further
    /// failure. Default: 1000.
    pub retry_backoff_ms: u64,

    /// Factor applied to the backoff after a rate-limit error. Default: 4.
    pub quota_backoff_multiplier: u32,

    /// Pause between two OCR batches. Default: 1000.
    pub batch_delay_ms: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Longest edge of a rasterised page in pixels, whatever the density.
    /// Default: 4000.
    pub max_rendered_pixels: u32,

    /// Image clean-up applied before OCR when `enhance_image` is set.
    pub preprocess: PreprocessConfig,

    /// Separator placed between consolidated pages.
    pub page_separator: PageSeparator,

    /// Default per-request options, used by entry points that take none.
    pub options: ProcessOptions,

    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for transcription. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,

    /// Custom OCR prompt. If None, uses [`crate::prompts::DEFAULT_OCR_PROMPT`].
    pub system_prompt: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            validator: ValidatorConfig::default(),
            whole_document_min_chars: 50,
            page_min_chars: 20,
            max_file_size: 50 * 1024 * 1024,
            max_ocr_pages: 100,
            api_timeout_secs: 60,
            document_timeout_secs: None,
            max_retries: 3,
            retry_backoff_ms: 1000,
            quota_backoff_multiplier: 4,
            batch_delay_ms: 1000,
            download_timeout_secs: 120,
            max_rendered_pixels: 4000,
            preprocess: PreprocessConfig::default(),
            page_separator: PageSeparator::default(),
            options: ProcessOptions::default(),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for HybridConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridConfig")
            .field("validator", &self.validator)
            .field("whole_document_min_chars", &self.whole_document_min_chars)
            .field("page_min_chars", &self.page_min_chars)
            .field("max_file_size", &self.max_file_size)
            .field("max_ocr_pages", &self.max_ocr_pages)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("document_timeout_secs", &self.document_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("batch_delay_ms", &self.batch_delay_ms)
            .field("options", &self.options)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProcessingProgressCallback>"),
            )
            .finish()
    }
}

impl HybridConfig {
    /// Create a new builder for `HybridConfig`.
    pub fn builder() -> HybridConfigBuilder {
        HybridConfigBuilder {
            config: Self::default(),
        }
    }

    /// Retry policy shared by every vision call of a run.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.retry_backoff_ms),
            quota_multiplier: self.quota_backoff_multiplier,
        }
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn document_timeout(&self) -> Option<Duration> {
        self.document_timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for [`HybridConfig`].
#[derive(Debug)]
pub struct HybridConfigBuilder {
    config: HybridConfig,
}

impl HybridConfigBuilder {
    pub fn validator(mut self, validator: ValidatorConfig) -> Self {
        self.config.validator = validator;
        self
    }

    pub fn whole_document_min_chars(mut self, n: usize) -> Self {
        self.config.whole_document_min_chars = n;
        self
    }

    pub fn page_min_chars(mut self, n: usize) -> Self {
        self.config.page_min_chars = n;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_ocr_pages(mut self, n: usize) -> Self {
        self.config.max_ocr_pages = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn document_timeout_secs(mut self, secs: u64) -> Self {
        self.config.document_timeout_secs = Some(secs);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn quota_backoff_multiplier(mut self, n: u32) -> Self {
        self.config.quota_backoff_multiplier = n.max(1);
        self
    }

    pub fn batch_delay_ms(mut self, ms: u64) -> Self {
        self.config.batch_delay_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.config.preprocess = preprocess;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn options(mut self, options: ProcessOptions) -> Self {
        self.config.options = options;
        self
    }

    /// Adjust the default options in place, keeping values already set
    /// (e.g. by [`with_env_overrides`](Self::with_env_overrides)).
    pub fn map_options(mut self, f: impl FnOnce(&mut ProcessOptions)) -> Self {
        f(&mut self.config.options);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Apply the recognised environment variables on top of the current
    /// values. Unset variables leave the field untouched; unparsable ones
    /// are reported by [`build`](Self::build).
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `OCR_MAX_FILE_SIZE` | `max_file_size` (bytes) |
    /// | `OCR_MAX_PAGES` | `max_ocr_pages` |
    /// | `OCR_DEFAULT_DENSITY` | `options.ocr.density` |
    /// | `OCR_MAX_PAGES_PARALLEL` | `options.ocr.max_pages_parallel` |
    /// | `TIMEOUT` | `api_timeout_secs` |
    /// | `MAX_RETRIES` | `max_retries` |
    /// | `MIN_WORD_COUNT` | `validator.min_word_count` |
    /// | `MIN_WORD_DENSITY` | `validator.min_word_density` |
    /// | `MIN_TEXT_ENTROPY` | `validator.min_text_entropy` |
    /// | `MIN_AVERAGE_WORD_LENGTH` | `validator.min_average_word_length` |
    /// | `OCR_TRIGGER_CONFIDENCE_THRESHOLD` | `validator.confidence_threshold` |
    pub fn with_env_overrides(self) -> Result<Self, Pdf2TextError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Like [`with_env_overrides`](Self::with_env_overrides) but reads from
    /// an arbitrary lookup.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Pdf2TextError> {
        let c = &mut self.config;
        override_from(&lookup, "OCR_MAX_FILE_SIZE", &mut c.max_file_size)?;
        override_from(&lookup, "OCR_MAX_PAGES", &mut c.max_ocr_pages)?;
        override_from(&lookup, "OCR_DEFAULT_DENSITY", &mut c.options.ocr.density)?;
        override_from(
            &lookup,
            "OCR_MAX_PAGES_PARALLEL",
            &mut c.options.ocr.max_pages_parallel,
        )?;
        override_from(&lookup, "TIMEOUT", &mut c.api_timeout_secs)?;
        override_from(&lookup, "MAX_RETRIES", &mut c.max_retries)?;
        override_from(&lookup, "MIN_WORD_COUNT", &mut c.validator.min_word_count)?;
        override_from(&lookup, "MIN_WORD_DENSITY", &mut c.validator.min_word_density)?;
        override_from(&lookup, "MIN_TEXT_ENTROPY", &mut c.validator.min_text_entropy)?;
        override_from(
            &lookup,
            "MIN_AVERAGE_WORD_LENGTH",
            &mut c.validator.min_average_word_length,
        )?;
        override_from(
            &lookup,
            "OCR_TRIGGER_CONFIDENCE_THRESHOLD",
            &mut c.validator.confidence_threshold,
        )?;
        Ok(self)
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HybridConfig, Pdf2TextError> {
        let c = &self.config;
        c.options.validate()?;
        if c.max_retries == 0 {
            return Err(Pdf2TextError::InvalidConfig(
                "MAX_RETRIES counts total attempts and must be ≥ 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&c.validator.confidence_threshold) {
            return Err(Pdf2TextError::InvalidConfig(format!(
                "confidence threshold must be within 0–1, got {}",
                c.validator.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&c.validator.min_word_density) {
            return Err(Pdf2TextError::InvalidConfig(format!(
                "minimum word density must be within 0–1, got {}",
                c.validator.min_word_density
            )));
        }
        if c.max_file_size == 0 {
            return Err(Pdf2TextError::InvalidConfig(
                "max file size must be > 0".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Pdf2TextError::InvalidConfig(
                "API timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

fn override_from<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) -> Result<(), Pdf2TextError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    if let Some(raw) = lookup(key) {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(());
        }
        *slot = raw
            .parse()
            .map_err(|e| Pdf2TextError::InvalidConfig(format!("{key}={raw:?}: {e}")))?;
    }
    Ok(())
}

// ── Per-request options ──────────────────────────────────────────────────

/// Options for one processing request.
///
/// Deserialises from the flat camelCase shape callers send:
/// `{"enableOcr": true, "language": "vi", "enhanceImage": true,
///   "density": 300, "format": "png", "maxPagesParallel": 5}`.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessOptions {
    /// When false, a low-quality text layer is returned as-is (or the run
    /// fails with [`Pdf2TextError::NoTextLayer`] when there is none).
    pub enable_ocr: bool,

    #[serde(flatten)]
    pub ocr: OcrOptions,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            enable_ocr: true,
            ocr: OcrOptions::default(),
        }
    }
}

impl ProcessOptions {
    pub fn validate(&self) -> Result<(), Pdf2TextError> {
        self.ocr.validate()
    }
}

/// OCR settings, fixed for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrOptions {
    /// Rasterisation density in DPI. Range: 72–600. Default: 300.
    pub density: u32,
    pub format: RasterFormat,
    /// Run the [`crate::pipeline::preprocess::ImagePreprocessor`] before OCR.
    pub enhance_image: bool,
    /// OCR batch size. Default: 5.
    pub max_pages_parallel: usize,
    /// Language hint passed to the vision model, e.g. `"vi"` or `"German"`.
    pub language: Option<String>,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            density: 300,
            format: RasterFormat::Png,
            enhance_image: true,
            max_pages_parallel: 5,
            language: None,
        }
    }
}

impl OcrOptions {
    pub fn validate(&self) -> Result<(), Pdf2TextError> {
        if !(72..=600).contains(&self.density) {
            return Err(Pdf2TextError::InvalidConfig(format!(
                "density must be 72–600 DPI, got {}",
                self.density
            )));
        }
        if self.max_pages_parallel == 0 {
            return Err(Pdf2TextError::InvalidConfig(
                "maxPagesParallel must be ≥ 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of rasterised pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// Lossless; the safer choice for small print. (default)
    #[default]
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
}

impl RasterFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpg => "image/jpeg",
        }
    }
}

impl std::str::FromStr for RasterFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(RasterFormat::Png),
            "jpg" | "jpeg" => Ok(RasterFormat::Jpg),
            other => Err(format!("unknown image format '{other}' (expected png or jpg)")),
        }
    }
}

/// Image clean-up parameters for [`crate::pipeline::preprocess::ImagePreprocessor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreprocessConfig {
    /// Longest edge after resizing, in pixels. Default: 2048.
    pub max_dimension: u32,
    /// JPEG quality of the first encode. Default: 85.
    pub quality: u8,
    /// JPEG quality of the single retry when the first encode is too large.
    /// PNG output switches to maximum compression instead. Default: 60.
    pub reduced_quality: u8,
    /// Size cap of the encoded payload. Default: 4 MiB.
    pub max_bytes: usize,
    /// Unsharp-mask blur radius. Default: 1.0.
    pub sharpen_sigma: f32,
    /// Unsharp-mask threshold. Default: 2.
    pub sharpen_threshold: i32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: 2048,
            quality: 85,
            reduced_quality: 60,
            max_bytes: 4 * 1024 * 1024,
            sharpen_sigma: 1.0,
            sharpen_threshold: 2,
        }
    }
}

/// How to separate pages in the consolidated text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Blank line between pages: "\n\n". (default)
    #[default]
    BlankLine,
    /// ASCII form feed on its own line, as `pdftotext` emits.
    FormFeed,
    /// Marker line with the page number: "--- page N ---".
    Marker,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator placed *before* page `page_num` (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::FormFeed => "\n\u{000C}\n".to_string(),
            PageSeparator::Marker => format!("\n\n--- page {} ---\n\n", page_num),
            PageSeparator::Custom(s) => s.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = HybridConfig::default();
        assert_eq!(c.whole_document_min_chars, 50);
        assert_eq!(c.page_min_chars, 20);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.options.ocr.density, 300);
        assert_eq!(c.options.ocr.max_pages_parallel, 5);
        assert!(c.options.enable_ocr);
        assert_eq!(c.validator.confidence_threshold, 0.5);
    }

    #[test]
    fn env_overrides_apply() {
        let c = HybridConfig::builder()
            .with_overrides_from(lookup(&[
                ("OCR_MAX_PAGES", "7"),
                ("OCR_DEFAULT_DENSITY", "150"),
                ("OCR_MAX_PAGES_PARALLEL", "2"),
                ("TIMEOUT", "30"),
                ("MAX_RETRIES", "4"),
                ("MIN_WORD_DENSITY", "0.08"),
                ("OCR_TRIGGER_CONFIDENCE_THRESHOLD", "0.7"),
            ]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(c.max_ocr_pages, 7);
        assert_eq!(c.options.ocr.density, 150);
        assert_eq!(c.options.ocr.max_pages_parallel, 2);
        assert_eq!(c.api_timeout_secs, 30);
        assert_eq!(c.max_retries, 4);
        assert_eq!(c.validator.min_word_density, 0.08);
        assert_eq!(c.validator.confidence_threshold, 0.7);
        // Untouched fields keep their defaults.
        assert_eq!(c.page_min_chars, 20);
    }

    #[test]
    fn unparsable_env_value_is_invalid_config() {
        let err = HybridConfig::builder()
            .with_overrides_from(lookup(&[("MAX_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, Pdf2TextError::InvalidConfig(ref m) if m.contains("MAX_RETRIES")));
    }

    #[test]
    fn blank_env_value_is_ignored() {
        let c = HybridConfig::builder()
            .with_overrides_from(lookup(&[("OCR_MAX_PAGES", "  ")]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(c.max_ocr_pages, 100);
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(HybridConfig::builder().max_retries(0).build().is_err());

        let mut options = ProcessOptions::default();
        options.ocr.density = 20;
        assert!(HybridConfig::builder().options(options).build().is_err());

        let mut options = ProcessOptions::default();
        options.ocr.max_pages_parallel = 0;
        assert!(HybridConfig::builder().options(options).build().is_err());
    }

    #[test]
    fn map_options_keeps_env_values() {
        let c = HybridConfig::builder()
            .with_overrides_from(lookup(&[("OCR_DEFAULT_DENSITY", "150")]))
            .unwrap()
            .map_options(|o| o.enable_ocr = false)
            .build()
            .unwrap();
        assert_eq!(c.options.ocr.density, 150);
        assert!(!c.options.enable_ocr);
    }

    #[test]
    fn retry_policy_reflects_config() {
        let c = HybridConfig::builder()
            .max_retries(5)
            .retry_backoff_ms(250)
            .build()
            .unwrap();
        let p = c.retry_policy();
        assert_eq!(p.max_attempts, 5);
        assert_eq!(p.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn options_deserialise_from_flat_camel_case() {
        let o: ProcessOptions = serde_json::from_str(
            r#"{"enableOcr": false, "language": "vi", "enhanceImage": false,
                "density": 200, "format": "jpeg", "maxPagesParallel": 3}"#,
        )
        .unwrap();
        assert!(!o.enable_ocr);
        assert_eq!(o.ocr.language.as_deref(), Some("vi"));
        assert!(!o.ocr.enhance_image);
        assert_eq!(o.ocr.density, 200);
        assert_eq!(o.ocr.format, RasterFormat::Jpg);
        assert_eq!(o.ocr.max_pages_parallel, 3);
    }

    #[test]
    fn options_missing_fields_take_defaults() {
        let o: ProcessOptions = serde_json::from_str(r#"{"format": "png"}"#).unwrap();
        assert_eq!(o, ProcessOptions::default());
    }

    #[test]
    fn raster_format_parses() {
        assert_eq!("PNG".parse::<RasterFormat>(), Ok(RasterFormat::Png));
        assert_eq!("jpeg".parse::<RasterFormat>(), Ok(RasterFormat::Jpg));
        assert!("tiff".parse::<RasterFormat>().is_err());
        assert_eq!(RasterFormat::Jpg.mime_type(), "image/jpeg");
    }

    #[test]
    fn separators_render() {
        assert_eq!(PageSeparator::BlankLine.render(2), "\n\n");
        assert!(PageSeparator::Marker.render(3).contains("page 3"));
        assert_eq!(PageSeparator::Custom("|".into()).render(2), "|");
    }
}

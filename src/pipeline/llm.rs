//! Vision OCR over an `edgequake-llm` provider.
//!
//! [`LlmVisionService`] turns a page image into one chat request:
//!
//! 1. **System message** carrying the OCR prompt
//! 2. **User message** with the page as a base64 image attachment (empty text)
//!
//! Retries do not live here. Every failure is mapped onto an [`OcrError`]
//! class and [`crate::pipeline::ocr::VisionOcrClient`] decides what to do
//! with it.

use crate::config::{HybridConfig, DEFAULT_MODEL};
use crate::error::{OcrError, Pdf2TextError};
use crate::pipeline::encode::{to_image_data, PageImage};
use crate::pipeline::ocr::{Recognition, VisionService};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

/// [`VisionService`] backed by a multimodal chat model.
pub struct LlmVisionService {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for LlmVisionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmVisionService")
            .field("provider", &self.label)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl LlmVisionService {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Resolve a provider from `config` and apply its sampling settings.
    pub fn from_config(config: &HybridConfig) -> Result<Self, Pdf2TextError> {
        let (provider, label) = resolve_provider(config)?;
        info!("Using vision provider: {}", label);
        Ok(Self::new(provider, label)
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl VisionService for LlmVisionService {
    fn name(&self) -> &str {
        &self.label
    }

    async fn infer(&self, image: &PageImage, prompt: &str) -> Result<Recognition, OcrError> {
        if image.bytes.is_empty() {
            return Err(OcrError::InvalidInput("empty page image".into()));
        }

        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user_with_images("", vec![to_image_data(image)]),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options()))
            .await
            .map_err(|e| classify_provider_error(&e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        Ok(Recognition::text(response.content))
    }
}

/// [`LlmVisionService`] whose provider is resolved on the first call.
///
/// Text-only documents never reach OCR, so they never need an API key.
/// A resolution failure surfaces as [`OcrError::Auth`] and aborts the run.
pub struct DeferredLlmVisionService {
    config: HybridConfig,
    service: OnceCell<LlmVisionService>,
}

impl DeferredLlmVisionService {
    pub fn new(config: HybridConfig) -> Self {
        Self {
            config,
            service: OnceCell::new(),
        }
    }

    fn resolved(&self) -> Result<&LlmVisionService, OcrError> {
        self.service
            .get_or_try_init(|| LlmVisionService::from_config(&self.config))
            .map_err(|e| OcrError::Auth(e.to_string()))
    }
}

#[async_trait]
impl VisionService for DeferredLlmVisionService {
    fn name(&self) -> &str {
        self.service.get().map_or("llm", |s| s.name())
    }

    async fn infer(&self, image: &PageImage, prompt: &str) -> Result<Recognition, OcrError> {
        self.resolved()?.infer(image, prompt).await
    }
}

static RE_AUTH_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:401|403)\b").expect("valid auth status regex"));

static RE_QUOTA_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b429\b").expect("valid quota status regex"));

/// Map a provider error message onto a retry class.
///
/// Providers surface HTTP failures as text, so the status code and the
/// usual vendor wording are matched case-insensitively. Status codes only
/// count as whole numbers: digits inside request ids or byte counts do not.
pub fn classify_provider_error(message: &str) -> OcrError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if RE_AUTH_STATUS.is_match(&lower)
        || has(&["unauthorized", "forbidden", "api key", "api_key", "authentication"])
    {
        OcrError::Auth(message.to_string())
    } else if RE_QUOTA_STATUS.is_match(&lower)
        || has(&["rate limit", "rate_limit", "quota", "too many requests"])
    {
        OcrError::Quota(message.to_string())
    } else if has(&["timed out", "timeout"]) {
        OcrError::Transient(format!("provider timeout: {message}"))
    } else {
        OcrError::Transient(message.to_string())
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2TextError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2TextError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`, `config.model`).
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
///    when both are set.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, even if other keys are too.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`].
///
/// Returns the provider with a label for logs.
pub fn resolve_provider(
    config: &HybridConfig,
) -> Result<(Arc<dyn LLMProvider>, String), Pdf2TextError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return Ok((create_vision_provider(name, model)?, format!("{name}/{model}")));
    }

    if let (Some(name), Some(model)) = (
        non_empty_env("EDGEQUAKE_LLM_PROVIDER"),
        non_empty_env("EDGEQUAKE_MODEL"),
    ) {
        let provider = create_vision_provider(&name, &model)?;
        return Ok((provider, format!("{name}/{model}")));
    }

    if non_empty_env("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return Ok((
            create_vision_provider("openai", model)?,
            format!("openai/{model}"),
        ));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2TextError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_fatal_class() {
        assert!(matches!(
            classify_provider_error("HTTP 401 Unauthorized"),
            OcrError::Auth(_)
        ));
        assert!(matches!(
            classify_provider_error("Invalid API key provided"),
            OcrError::Auth(_)
        ));
    }

    #[test]
    fn rate_limits_are_quota_class() {
        assert!(matches!(
            classify_provider_error("status 429: Too Many Requests"),
            OcrError::Quota(_)
        ));
        assert!(matches!(
            classify_provider_error("You exceeded your current quota"),
            OcrError::Quota(_)
        ));
    }

    #[test]
    fn everything_else_is_transient() {
        assert!(matches!(
            classify_provider_error("502 Bad Gateway"),
            OcrError::Transient(_)
        ));
        match classify_provider_error("request timed out") {
            OcrError::Transient(m) => assert!(m.contains("timeout")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_digits_inside_ids_do_not_classify() {
        assert!(matches!(
            classify_provider_error("502 Bad Gateway (request id req_8f4031c)"),
            OcrError::Transient(_)
        ));
        assert!(matches!(
            classify_provider_error("503 Service Unavailable: body was 14291 bytes"),
            OcrError::Transient(_)
        ));
        assert!(matches!(
            classify_provider_error("error status 403 (request id req_8f4031c)"),
            OcrError::Auth(_)
        ));
    }

    #[test]
    fn deferred_service_is_unresolved_until_first_call() {
        let service = DeferredLlmVisionService::new(HybridConfig::default());
        assert_eq!(service.name(), "llm");
        assert!(service.service.get().is_none());
    }
}

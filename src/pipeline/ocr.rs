//! Vision OCR client: one image in, recognised text out.
//!
//! [`VisionOcrClient`] wraps any [`VisionService`] with the policies every
//! call needs:
//!
//! * a per-attempt timeout, nested inside the retry budget,
//! * answer clean-up via [`clean_ocr_text`],
//! * retries with exponential backoff via [`with_retry`], where an answer
//!   that is empty after clean-up counts as a retryable failure,
//! * a heuristic confidence score when the service does not report one.
//!
//! [`VisionOcrClient::extract_text_batch`] runs many images through
//! [`run_in_batches`] with bounded concurrency and inter-batch pacing. Each
//! image is retried on its own; only an authentication failure stops the
//! batch.
//!
//! The client holds no mutable state. One instance is shared by every page
//! worker of a run.

use crate::config::HybridConfig;
use crate::error::{OcrError, Pdf2TextError};
use crate::pipeline::batch::{run_in_batches, BatchPlan};
use crate::pipeline::encode::PageImage;
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::retry::{with_retry, RetryError, RetryPolicy};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Raw answer from a vision service.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Service-reported confidence, if it has one.
    pub confidence: Option<f64>,
}

impl Recognition {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// A vision-capable text recognition backend.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Recognise the text in `image`. A single attempt; no retries.
    async fn infer(&self, image: &PageImage, prompt: &str) -> Result<Recognition, OcrError>;
}

/// Successful recognition of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutcome {
    /// Cleaned with [`clean_ocr_text`]; never empty.
    pub text: String,
    /// In `[0, 1]`.
    pub confidence: f64,
    /// Wall time across all attempts, backoff included.
    pub processing_time_ms: u64,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Per-image result of a batch.
pub type OcrResult = Result<OcrOutcome, RetryError<OcrError>>;

/// Retrying, paced front-end to a [`VisionService`].
#[derive(Clone)]
pub struct VisionOcrClient {
    service: Arc<dyn VisionService>,
    policy: RetryPolicy,
    call_timeout: Duration,
    batch_size: usize,
    batch_delay: Duration,
}

impl std::fmt::Debug for VisionOcrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionOcrClient")
            .field("service", &self.service.name())
            .field("policy", &self.policy)
            .field("call_timeout", &self.call_timeout)
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .finish()
    }
}

impl VisionOcrClient {
    /// Defaults: 3 attempts from 1 s, 60 s per call, batches of 5, 1 s apart.
    pub fn new(service: Arc<dyn VisionService>) -> Self {
        Self {
            service,
            policy: RetryPolicy::default(),
            call_timeout: Duration::from_secs(60),
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
        }
    }

    /// Retry budget, call timeout and pacing taken from `config`.
    pub fn from_config(service: Arc<dyn VisionService>, config: &HybridConfig) -> Self {
        Self::new(service)
            .with_policy(config.retry_policy())
            .with_call_timeout(config.api_timeout())
            .with_batch_size(config.options.ocr.max_pages_parallel)
            .with_batch_delay(config.batch_delay())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn batch_delay(&self) -> Duration {
        self.batch_delay
    }

    /// Recognise one image, retrying per the client's policy.
    ///
    /// `label` prefixes retry warnings, e.g. `"page 3"`.
    pub async fn extract_text(
        &self,
        image: &PageImage,
        prompt: &str,
        label: &str,
    ) -> Result<OcrOutcome, RetryError<OcrError>> {
        let start = Instant::now();
        let mut attempts = 0u32;
        let timeout = self.call_timeout;

        let recognition = with_retry(&self.policy, label, |attempt| {
            attempts = attempt + 1;
            let service = Arc::clone(&self.service);
            async move {
                let answer = tokio::time::timeout(timeout, service.infer(image, prompt))
                    .await
                    .map_err(|_| OcrError::Timeout {
                        secs: timeout.as_secs(),
                    })??;
                let text = clean_ocr_text(&answer.text);
                if text.trim().is_empty() {
                    return Err(OcrError::EmptyResponse);
                }
                Ok(Recognition { text, ..answer })
            }
        })
        .await?;

        let confidence = recognition
            .confidence
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or_else(|| estimate_confidence(&recognition.text));
        let processing_time_ms = start.elapsed().as_millis() as u64;
        debug!(
            "{}: {} chars via {} (confidence {:.2}, {} attempts, {}ms)",
            label,
            recognition.text.len(),
            self.service.name(),
            confidence,
            attempts,
            processing_time_ms
        );

        Ok(OcrOutcome {
            text: recognition.text,
            confidence,
            processing_time_ms,
            attempts,
        })
    }

    /// Recognise many images in paced batches of `batch_size`.
    ///
    /// Results come back in input order. A failed image yields an `Err`
    /// entry; an authentication failure aborts the whole call.
    pub async fn extract_text_batch(
        &self,
        images: Vec<PageImage>,
        prompt: &str,
    ) -> Result<Vec<OcrResult>, OcrError> {
        let plan = BatchPlan::new(self.batch_size, self.batch_delay);
        let items: Vec<(usize, PageImage)> = images.into_iter().enumerate().collect();

        let outcome = run_in_batches(
            items,
            &plan,
            |(index, image)| async move {
                let label = format!("image {}", index + 1);
                match self.extract_text(&image, prompt, &label).await {
                    Err(RetryError::Fatal(OcrError::Auth(detail))) => Err(OcrError::Auth(detail)),
                    result => Ok((index, result)),
                }
            },
            |batch, items| debug!("OCR batch {}: {} images", batch + 1, items.len()),
        )
        .await?;

        let mut completed = outcome.completed;
        completed.sort_by_key(|(index, _)| *index);
        Ok(completed.into_iter().map(|(_, result)| result).collect())
    }
}

/// Guess recognition quality from the shape of the text.
///
/// Starts at 0.5 and rewards length and the presence of letters, digits,
/// punctuation, line breaks and column spacing.
pub fn estimate_confidence(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let len = text.chars().count();
    let mut score: f64 = 0.5;
    if len > 100 {
        score += 0.2;
    }
    if len > 500 {
        score += 0.1;
    }
    if text.chars().any(char::is_alphabetic) {
        score += 0.1;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        score += 0.05;
    }
    if text.chars().any(|c| c.is_ascii_punctuation()) {
        score += 0.05;
    }
    if text.contains('\n') {
        score += 0.05;
    }
    if text.contains("  ") {
        score += 0.05;
    }

    (score.min(1.0) * 1e6).round() / 1e6
}

// ── Chain ────────────────────────────────────────────────────────────────

/// Tries each vision service in order; a failing or rate-limited service
/// hands over to the next one.
pub struct FallbackVisionService {
    services: Vec<Arc<dyn VisionService>>,
}

impl FallbackVisionService {
    pub fn new(services: Vec<Arc<dyn VisionService>>) -> Result<Self, Pdf2TextError> {
        if services.is_empty() {
            return Err(Pdf2TextError::InvalidConfig(
                "FallbackVisionService needs at least one service".into(),
            ));
        }
        Ok(Self { services })
    }
}

#[async_trait]
impl VisionService for FallbackVisionService {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn infer(&self, image: &PageImage, prompt: &str) -> Result<Recognition, OcrError> {
        let mut last_error = OcrError::EmptyResponse;

        for (i, service) in self.services.iter().enumerate() {
            match service.infer(image, prompt).await {
                Ok(recognition) if !recognition.text.trim().is_empty() => {
                    if i > 0 {
                        debug!("Vision fallback served by {}", service.name());
                    }
                    return Ok(recognition);
                }
                Ok(_) => {
                    warn!("{} returned empty text, trying next", service.name());
                    last_error = OcrError::EmptyResponse;
                }
                Err(OcrError::Quota(detail)) => {
                    warn!("{} rate limited, trying next", service.name());
                    last_error = OcrError::Quota(detail);
                }
                Err(e) => {
                    warn!("{} failed: {}, trying next", service.name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RasterFormat;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a scripted sequence of answers; repeats the last one.
    struct Scripted {
        answers: Mutex<VecDeque<Result<Recognition, OcrError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(answers: Vec<Result<Recognition, OcrError>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionService for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn infer(&self, _image: &PageImage, _prompt: &str) -> Result<Recognition, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.answers.lock().unwrap();
            if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().cloned().unwrap()
            }
        }
    }

    /// Echoes the image bytes back as text.
    struct Echo;

    #[async_trait]
    impl VisionService for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn infer(&self, image: &PageImage, _prompt: &str) -> Result<Recognition, OcrError> {
            let text = String::from_utf8_lossy(&image.bytes).into_owned();
            if text == "deny" {
                return Err(OcrError::Auth("401".into()));
            }
            if text == "bad" {
                return Err(OcrError::Transient("503".into()));
            }
            Ok(Recognition::text(text))
        }
    }

    fn image(tag: &str) -> PageImage {
        PageImage::new(tag.as_bytes().to_vec(), RasterFormat::Png)
    }

    fn client(service: Arc<dyn VisionService>) -> VisionOcrClient {
        VisionOcrClient::new(service)
            .with_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(100),
                quota_multiplier: 4,
            })
            .with_call_timeout(Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn empty_response_is_retried() {
        let service = Scripted::new(vec![
            Ok(Recognition::text("   ")),
            Ok(Recognition::text("Invoice 42")),
        ]);
        let out = client(service.clone())
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap();
        assert_eq!(out.text, "Invoice 42");
        assert_eq!(out.attempts, 2);
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn answer_that_cleans_to_nothing_is_retried() {
        let service = Scripted::new(vec![
            Ok(Recognition::text("```\n\n```")),
            Ok(Recognition::text("```text\nInvoice 42\n```")),
        ]);
        let out = client(service.clone())
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap();
        assert_eq!(out.text, "Invoice 42");
        assert_eq!(out.attempts, 2);
        // estimated on the cleaned text, not the fence
        assert_eq!(out.confidence, estimate_confidence("Invoice 42"));
    }

    #[tokio::test(start_paused = true)]
    async fn fence_only_answers_exhaust_as_empty() {
        let service = Scripted::new(vec![Ok(Recognition::text("```\n\n```"))]);
        let err = client(service.clone())
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap_err();
        assert_eq!(service.calls(), 3);
        assert_eq!(err.into_inner(), OcrError::EmptyResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let service = Scripted::new(vec![Err(OcrError::Transient("reset".into()))]);
        let err = client(service.clone())
            .extract_text(&image("p"), "prompt", "page 2")
            .await
            .unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert_eq!(service.calls(), 3);
        assert!(matches!(err, RetryError::Exhausted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_is_not_retried() {
        let service = Scripted::new(vec![Err(OcrError::Auth("bad key".into()))]);
        let err = client(service.clone())
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Fatal(OcrError::Auth(_))));
        assert_eq!(service.calls(), 1);
    }

    struct Slow;

    #[async_trait]
    impl VisionService for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn infer(&self, _image: &PageImage, _prompt: &str) -> Result<Recognition, OcrError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Recognition::text("late"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_counts_as_an_attempt() {
        let err = client(Arc::new(Slow))
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap_err();
        assert_eq!(err.into_inner(), OcrError::Timeout { secs: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn service_confidence_is_preferred() {
        let service = Scripted::new(vec![Ok(Recognition {
            text: "text".into(),
            confidence: Some(0.93),
        })]);
        let out = client(service)
            .extract_text(&image("p"), "prompt", "page 1")
            .await
            .unwrap();
        assert_eq!(out.confidence, 0.93);
    }

    #[tokio::test(start_paused = true)]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let images = vec![image("a"), image("bad"), image("c")];
        let results = client(Arc::new(Echo))
            .with_batch_size(2)
            .extract_text_batch(images, "prompt")
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().text, "a");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().text, "c");
    }

    #[tokio::test(start_paused = true)]
    async fn batch_aborts_on_auth() {
        let err = client(Arc::new(Echo))
            .extract_text_batch(vec![image("a"), image("deny")], "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, OcrError::Auth(_)));
    }

    #[test]
    fn confidence_heuristic() {
        assert_eq!(estimate_confidence(""), 0.0);
        // letters only
        assert_eq!(estimate_confidence("hello"), 0.6);
        // letters, digits, punctuation, newline, double space
        assert_eq!(estimate_confidence("Total:  42\nDue"), 0.8);
        let long = "word ".repeat(120);
        // > 500 chars, letters, double space absent
        assert_eq!(estimate_confidence(&long), 0.9);
        let maxed = format!("{}\n1.  x", "a".repeat(600));
        assert_eq!(estimate_confidence(&maxed), 1.0);
    }

    #[tokio::test]
    async fn fallback_moves_past_rate_limited_service() {
        let limited = Scripted::new(vec![Err(OcrError::Quota("429".into()))]);
        let backup = Scripted::new(vec![Ok(Recognition::text("from backup"))]);
        let chain = FallbackVisionService::new(vec![limited.clone(), backup.clone()]).unwrap();

        let out = chain.infer(&image("p"), "prompt").await.unwrap();
        assert_eq!(out.text, "from backup");
        assert_eq!(limited.calls(), 1);
    }

    #[tokio::test]
    async fn fallback_returns_last_error() {
        let chain = FallbackVisionService::new(vec![
            Scripted::new(vec![Err(OcrError::Transient("a".into()))]),
            Scripted::new(vec![Err(OcrError::Quota("b".into()))]),
        ])
        .unwrap();
        let err = chain.infer(&image("p"), "prompt").await.unwrap_err();
        assert_eq!(err, OcrError::Quota("b".into()));
    }

    #[test]
    fn fallback_requires_a_service() {
        assert!(FallbackVisionService::new(Vec::new()).is_err());
    }
}

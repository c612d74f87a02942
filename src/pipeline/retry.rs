//! Generic retry with exponential backoff.
//!
//! Every external call site (vision OCR, provider calls, fallback chains)
//! goes through [`with_retry`] instead of carrying its own loop. The
//! operation's error decides how it is retried via [`Retryable`]:
//!
//! | Class | Behaviour |
//! |-------|-----------|
//! | `Transient` | retried, delay `base * 2^attempt` |
//! | `Quota` | retried, delay multiplied by `quota_multiplier` |
//! | `Fatal` | returned immediately, no further attempts |
//!
//! With the default 1 s base and 3 attempts the wait sequence is 1 s → 2 s
//! (4 s → 8 s for quota errors). Retry bookkeeping lives on the stack of each
//! call, so one policy value can be shared by any number of concurrent
//! workers.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// How a failed attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Transient,
    Quota,
    Fatal,
}

/// Implemented by errors that can flow through [`with_retry`].
pub trait Retryable {
    fn retry_class(&self) -> RetryClass;
}

/// Attempt budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. `0` is treated as `1`.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Extra factor applied to the delay after a quota error.
    pub quota_multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            quota_multiplier: 4,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32, class: RetryClass) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor);
        match class {
            RetryClass::Quota => delay.saturating_mul(self.quota_multiplier.max(1)),
            _ => delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Why [`with_retry`] gave up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryError<E> {
    /// The operation reported a non-retryable error.
    #[error("{0}")]
    Fatal(E),

    /// Every attempt failed; `last` is the final error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the retry ended.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    pub fn inner(&self) -> &E {
        match self {
            RetryError::Fatal(e) => e,
            RetryError::Exhausted { last, .. } => last,
        }
    }

    /// Attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Fatal(_) => 1,
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Run `operation` until it succeeds, fails fatally, or exhausts `policy`.
///
/// `operation` receives the 0-based attempt number. `label` prefixes the
/// retry warnings (e.g. `"page 3"`).
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + fmt::Display,
{
    let attempts = policy.attempts();
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let class = e.retry_class();
                if class == RetryClass::Fatal {
                    warn!("{}: non-retryable failure — {}", label, e);
                    return Err(RetryError::Fatal(e));
                }
                if attempt + 1 >= attempts {
                    warn!("{}: attempt {}/{} failed — {}; giving up", label, attempt + 1, attempts, e);
                    return Err(RetryError::Exhausted { attempts, last: e });
                }

                let delay = policy.backoff(attempt, class);
                warn!(
                    "{}: attempt {}/{} failed — {}; retrying in {}ms",
                    label,
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

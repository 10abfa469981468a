//! Row classifier client
//!
//! Wraps a [`ClassifierBackend`] with the call policy every caller shares:
//! a bounded per-call timeout, an explicit retry policy, an optional
//! client-side rate ceiling, and cooperative cancellation.

use crate::models::{ClassificationRequest, ClassificationResult};
use crate::types::{ClassifierBackend, ClassifyError};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry policy for classification calls
///
/// Only transient failures ([`ClassifyError::is_transient`]) are retried,
/// with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first call; values below 1 are raised to 1
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, never retry
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Whether a failure on attempt number `attempt` (1-based) gets another try
    pub fn should_retry(&self, error: &ClassifyError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }
}

impl Default for RetryPolicy {
    /// One retry after 500ms
    fn default() -> Self {
        Self::new(2, Duration::from_millis(500))
    }
}

/// Classifier client shared by the batch orchestrator and the query service
pub struct ClassifierClient {
    backend: Arc<dyn ClassifierBackend>,
    policy: RetryPolicy,
    timeout: Duration,
    bulk_timeout: Duration,
    rate_limiter: Option<DefaultDirectRateLimiter>,
}

impl ClassifierClient {
    pub fn new(backend: Arc<dyn ClassifierBackend>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            timeout: DEFAULT_TIMEOUT,
            bulk_timeout: DEFAULT_TIMEOUT * 4,
            rate_limiter: None,
        }
    }

    /// Per-call time budget, enforced regardless of the backend's own timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Time budget for one bulk call
    pub fn with_bulk_timeout(mut self, timeout: Duration) -> Self {
        self.bulk_timeout = timeout;
        self
    }

    /// Cap outgoing calls at `per_second` (0 disables the cap)
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.rate_limiter =
            NonZeroU32::new(per_second).map(|n| RateLimiter::direct(Quota::per_second(n)));
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn supports_bulk(&self) -> bool {
        self.backend.supports_bulk()
    }

    /// Classify one request, retrying transient failures per the policy
    ///
    /// Returns [`ClassifyError::Cancelled`] as soon as `cancel` fires; no
    /// further attempts are scheduled after that.
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult, ClassifyError> {
        let timeout = self.timeout;
        self.with_retry(cancel, "classify", || async move {
            tokio::time::timeout(timeout, self.backend.classify(request))
                .await
                .unwrap_or(Err(ClassifyError::Timeout(timeout)))
        })
        .await
    }

    /// Classify many requests in one backend call, with the same retry policy
    pub async fn classify_bulk(
        &self,
        requests: &[ClassificationRequest],
        cancel: &CancellationToken,
    ) -> Result<Vec<ClassificationResult>, ClassifyError> {
        if !self.backend.supports_bulk() {
            return Err(ClassifyError::Unsupported(self.backend.name()));
        }

        let timeout = self.bulk_timeout;
        self.with_retry(cancel, "classify_bulk", || async move {
            tokio::time::timeout(timeout, self.backend.classify_bulk(requests))
                .await
                .unwrap_or(Err(ClassifyError::Timeout(timeout)))
        })
        .await
    }

    async fn with_retry<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, ClassifyError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClassifyError>>,
    {
        let mut attempt = 1;
        loop {
            if cancel.is_cancelled() {
                return Err(ClassifyError::Cancelled);
            }

            if let Some(limiter) = &self.rate_limiter {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ClassifyError::Cancelled),
                    _ = limiter.until_ready() => {}
                }
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ClassifyError::Cancelled),
                outcome = call() => outcome,
            };

            match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "Classification succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) if self.policy.should_retry(&error, attempt) => {
                    warn!(
                        operation,
                        backend = self.backend.name(),
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        error = %error,
                        "Transient classification failure, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ClassifyError::Cancelled),
                        _ = tokio::time::sleep(self.policy.backoff()) => {}
                    }
                    attempt += 1;
                }
                Err(error) => {
                    debug!(
                        operation,
                        backend = self.backend.name(),
                        attempt,
                        error = %error,
                        "Classification failed"
                    );
                    return Err(error);
                }
            }
        }
    }
}

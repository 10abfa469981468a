//! Core trait and error definitions for remote classification
//!
//! Every remote service sits behind [`ClassifierBackend`]. Backends own the
//! wire format of their service and must return the canonical
//! [`ClassificationResult`]; raw response shapes never leave the backend.

use crate::models::{ClassificationRequest, ClassificationResult};
use std::time::Duration;
use thiserror::Error;

/// Remote classifier backend
///
/// # Example
/// ```rust,ignore
/// struct FixedLabel;
///
/// #[async_trait::async_trait]
/// impl ClassifierBackend for FixedLabel {
///     fn name(&self) -> &'static str { "fixed" }
///
///     async fn classify(
///         &self,
///         request: &ClassificationRequest,
///     ) -> Result<ClassificationResult, ClassifyError> {
///         Ok(ClassificationResult::labelled(request.text(), "General Inquiry"))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Classify one item and return its top-ranked label
    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError>;

    /// Whether [`classify_bulk`](Self::classify_bulk) is implemented
    fn supports_bulk(&self) -> bool {
        false
    }

    /// Classify many items in one remote call
    ///
    /// Results must be index-aligned with `requests`.
    async fn classify_bulk(
        &self,
        _requests: &[ClassificationRequest],
    ) -> Result<Vec<ClassificationResult>, ClassifyError> {
        Err(ClassifyError::Unsupported(self.name()))
    }
}

/// Classification failure for one call
///
/// Messages never contain credentials: transport errors are stripped of
/// their URL before being stored here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    /// The call exceeded its time budget
    #[error("Classification timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, reset, DNS failure, ...
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("Classifier returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx response whose body could not be understood
    #[error("Malformed classifier response: {0}")]
    MalformedResponse(String),

    /// Request rejected before it was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend does not offer the requested operation
    #[error("Operation not supported by backend {0}")]
    Unsupported(&'static str),

    /// Caller aborted
    #[error("Classification cancelled")]
    Cancelled,
}

impl ClassifyError {
    /// Whether another attempt could succeed
    ///
    /// Timeouts, transport failures, HTTP 429 and 5xx qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifyError::Timeout(_) | ClassifyError::Network(_) => true,
            ClassifyError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClassifyError::Timeout(_))
    }

    /// Map a reqwest error without leaking the request URL
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ClassifyError::Timeout(timeout)
        } else if err.is_decode() {
            ClassifyError::MalformedResponse(err.without_url().to_string())
        } else {
            ClassifyError::Network(err.without_url().to_string())
        }
    }

    /// Build an HTTP error from a status and (truncated) body
    pub(crate) fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        const MAX_BODY_CHARS: usize = 200;
        let message: String = body.trim().chars().take(MAX_BODY_CHARS).collect();
        ClassifyError::Http {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                message
            },
        }
    }
}

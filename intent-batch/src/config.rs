//! Classifier construction from configuration
//!
//! Turns the `[classifier]` section of the TOML config into a ready
//! [`ClassifierClient`]. The zero-shot backend needs an API key, resolved
//! ENV → TOML.

use crate::error::{AppError, AppResult};
use crate::services::classifier_client::{ClassifierClient, RetryPolicy};
use crate::services::predict_api_client::PredictApiClient;
use crate::services::zero_shot_client::ZeroShotClient;
use crate::types::ClassifierBackend;
use intent_common::config::{resolve_api_key, BackendKind, TomlConfig, API_KEY_ENV};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// User-Agent sent with every classifier request
pub fn user_agent() -> String {
    format!("intent-batch/{}", env!("CARGO_PKG_VERSION"))
}

/// Build the configured backend
pub fn build_backend(config: &TomlConfig) -> AppResult<Arc<dyn ClassifierBackend>> {
    let classifier = &config.classifier;
    let timeout = Duration::from_secs(classifier.timeout_secs.max(1));
    let bulk_timeout = Duration::from_secs(classifier.bulk_timeout_secs.max(1));

    let backend: Arc<dyn ClassifierBackend> = match classifier.backend {
        BackendKind::PredictApi => Arc::new(
            PredictApiClient::new(&classifier.base_url, &user_agent(), timeout, bulk_timeout)
                .map_err(|e| AppError::Config(e.to_string()))?,
        ),
        BackendKind::ZeroShot => {
            let api_key = resolve_api_key(config).ok_or_else(|| {
                AppError::Config(format!(
                    "Zero-shot backend needs an API key. Set {} or classifier.api_key in config.toml",
                    API_KEY_ENV
                ))
            })?;
            Arc::new(
                ZeroShotClient::new(
                    &classifier.model_url,
                    api_key,
                    classifier.candidate_labels.clone(),
                    &user_agent(),
                    timeout,
                )
                .map_err(|e| AppError::Config(e.to_string()))?,
            )
        }
    };

    info!(backend = backend.name(), "Classifier backend configured");
    Ok(backend)
}

/// Build the shared classifier client: backend plus call policy
pub fn build_classifier(config: &TomlConfig) -> AppResult<ClassifierClient> {
    let classifier = &config.classifier;
    let policy = RetryPolicy::new(
        classifier.max_attempts,
        Duration::from_millis(classifier.backoff_ms),
    );

    let mut client = ClassifierClient::new(build_backend(config)?, policy)
        .with_timeout(Duration::from_secs(classifier.timeout_secs.max(1)))
        .with_bulk_timeout(Duration::from_secs(classifier.bulk_timeout_secs.max(1)));

    if let Some(per_second) = classifier.requests_per_second {
        client = client.with_rate_limit(per_second);
    }

    Ok(client)
}

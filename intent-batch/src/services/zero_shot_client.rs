//! Zero-shot classification backend
//!
//! Hosted inference endpoint for a zero-shot model (e.g. bart-large-mnli):
//! `POST {model_url}` with `{ "inputs": text, "parameters": { "candidate_labels": [...] } }`
//! and `Authorization: Bearer <key>`. The response ranks the candidate labels
//! (`{ "sequence", "labels": [...], "scores": [...] }`); the top label wins.
//!
//! The API key is only ever placed in the Authorization header.

use crate::models::{ClassificationRequest, ClassificationResult};
use crate::types::{ClassifierBackend, ClassifyError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [String],
}

/// Raw zero-shot response
#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    scores: Vec<f64>,
}

impl ZeroShotResponse {
    /// Top-ranked label, or N/A when the ranking is empty
    ///
    /// The service returns labels sorted by score; when scores are present
    /// the highest one is used so an unsorted response still picks correctly.
    fn into_result(self, input_text: &str) -> ClassificationResult {
        let top = if self.scores.len() == self.labels.len() && !self.scores.is_empty() {
            self.labels
                .into_iter()
                .zip(self.scores)
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(label, _)| label)
        } else {
            self.labels.into_iter().next()
        };

        match top {
            Some(label) => ClassificationResult::labelled(input_text, label),
            None => ClassificationResult::not_available(input_text),
        }
    }
}

/// Client for a hosted zero-shot classification model
pub struct ZeroShotClient {
    http_client: Client,
    model_url: String,
    api_key: String,
    candidate_labels: Vec<String>,
    timeout: Duration,
}

impl fmt::Debug for ZeroShotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZeroShotClient")
            .field("model_url", &self.model_url)
            .field("api_key", &"<redacted>")
            .field("candidate_labels", &self.candidate_labels)
            .finish()
    }
}

impl ZeroShotClient {
    pub fn new(
        model_url: impl Into<String>,
        api_key: String,
        candidate_labels: Vec<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        if candidate_labels.is_empty() {
            return Err(ClassifyError::InvalidInput(
                "at least one candidate label is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifyError::Network(e.without_url().to_string()))?;

        Ok(Self {
            http_client,
            model_url: model_url.into(),
            api_key,
            candidate_labels,
            timeout,
        })
    }

    pub fn candidate_labels(&self) -> &[String] {
        &self.candidate_labels
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for ZeroShotClient {
    fn name(&self) -> &'static str {
        "zero-shot"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        debug!(
            text_len = request.text().len(),
            labels = self.candidate_labels.len(),
            "Querying zero-shot model"
        );

        let body = ZeroShotRequest {
            inputs: request.text(),
            parameters: ZeroShotParameters {
                candidate_labels: &self.candidate_labels,
            },
        };

        let response = self
            .http_client
            .post(&self.model_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::from_status(status, &body));
        }

        let raw: ZeroShotResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.timeout))?;

        Ok(raw.into_result(request.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels() -> Vec<String> {
        vec!["Complaint".to_string(), "Refund Request".to_string()]
    }

    #[test]
    fn test_top_label_selected() {
        let raw: ZeroShotResponse = serde_json::from_value(json!({
            "sequence": "refund please",
            "labels": ["Refund Request", "Complaint"],
            "scores": [0.91, 0.09]
        }))
        .unwrap();
        assert_eq!(raw.into_result("refund please").predicted_intent(), "Refund Request");
    }

    #[test]
    fn test_unsorted_scores_pick_highest() {
        let raw: ZeroShotResponse = serde_json::from_value(json!({
            "labels": ["Complaint", "Refund Request"],
            "scores": [0.2, 0.8]
        }))
        .unwrap();
        assert_eq!(raw.into_result("x").predicted_intent(), "Refund Request");
    }

    #[test]
    fn test_empty_labels_is_not_available() {
        let raw: ZeroShotResponse = serde_json::from_value(json!({"labels": []})).unwrap();
        assert!(!raw.into_result("x").is_labelled());
    }

    #[test]
    fn test_request_body_shape() {
        let labels = labels();
        let body = ZeroShotRequest {
            inputs: "where is my order",
            parameters: ZeroShotParameters {
                candidate_labels: &labels,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["inputs"], "where is my order");
        assert_eq!(json["parameters"]["candidate_labels"][1], "Refund Request");
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = ZeroShotClient::new(
            "http://localhost/model",
            "hf_super_secret".to_string(),
            labels(),
            "test-agent",
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!format!("{:?}", client).contains("hf_super_secret"));
    }

    #[test]
    fn test_requires_candidate_labels() {
        let result = ZeroShotClient::new(
            "http://localhost/model",
            "key".to_string(),
            Vec::new(),
            "test-agent",
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(ClassifyError::InvalidInput(_))));
    }
}

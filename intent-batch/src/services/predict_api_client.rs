//! Predict API backend
//!
//! Dedicated classification backend with two endpoints:
//! - `GET {base}/predict?question=<text>` → `{ "input_text": ..., "prediction": ... }`
//! - `POST {base}/predict-csv` (multipart field `file`, CSV with a `text`
//!   column) → `{ "results": [ { "input_text": ..., "prediction": ... }, ... ] }`

use crate::models::{ClassificationRequest, ClassificationResult};
use crate::types::{ClassifierBackend, ClassifyError};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Raw `/predict` response, and one element of a `/predict-csv` response
#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    #[allow(dead_code)]
    input_text: Option<String>,
    #[serde(default)]
    prediction: Value,
}

/// Raw `/predict-csv` response
#[derive(Debug, Deserialize)]
struct PredictCsvResponse {
    results: Vec<PredictResponse>,
}

impl PredictResponse {
    /// Normalize into the canonical result for `input_text`
    fn into_result(self, input_text: &str) -> Result<ClassificationResult, ClassifyError> {
        match self.prediction {
            Value::String(label) => Ok(ClassificationResult::labelled(input_text, label)),
            Value::Number(n) => Ok(ClassificationResult::labelled(input_text, n.to_string())),
            Value::Null => Ok(ClassificationResult::not_available(input_text)),
            other => Err(ClassifyError::MalformedResponse(format!(
                "unexpected prediction value: {}",
                other
            ))),
        }
    }
}

/// Client for the `/predict` + `/predict-csv` backend
pub struct PredictApiClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
    bulk_timeout: Duration,
}

impl PredictApiClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
        bulk_timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .build()
            .map_err(|e| ClassifyError::Network(e.without_url().to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            bulk_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Serialize requests as a one-column CSV upload
    fn build_csv(requests: &[ClassificationRequest]) -> Result<Vec<u8>, ClassifyError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["text"])
            .map_err(|e| ClassifyError::InvalidInput(e.to_string()))?;
        for request in requests {
            writer
                .write_record([request.text()])
                .map_err(|e| ClassifyError::InvalidInput(e.to_string()))?;
        }
        writer
            .into_inner()
            .map_err(|e| ClassifyError::InvalidInput(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for PredictApiClient {
    fn name(&self) -> &'static str {
        "predict-api"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        debug!(text_len = request.text().len(), "Querying /predict");

        let response = self
            .http_client
            .get(self.endpoint("predict"))
            .query(&[("question", request.text())])
            .send()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::from_status(status, &body));
        }

        let raw: PredictResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.timeout))?;

        raw.into_result(request.text())
    }

    fn supports_bulk(&self) -> bool {
        true
    }

    async fn classify_bulk(
        &self,
        requests: &[ClassificationRequest],
    ) -> Result<Vec<ClassificationResult>, ClassifyError> {
        let csv_bytes = Self::build_csv(requests)?;
        debug!(
            rows = requests.len(),
            bytes = csv_bytes.len(),
            "Uploading batch to /predict-csv"
        );

        let part = Part::bytes(csv_bytes)
            .file_name("batch.csv")
            .mime_str("text/csv")
            .map_err(|e| ClassifyError::InvalidInput(e.without_url().to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(self.endpoint("predict-csv"))
            .multipart(form)
            .timeout(self.bulk_timeout)
            .send()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.bulk_timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::from_status(status, &body));
        }

        let raw: PredictCsvResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::from_transport(e, self.bulk_timeout))?;

        if raw.results.len() != requests.len() {
            return Err(ClassifyError::MalformedResponse(format!(
                "expected {} results, got {}",
                requests.len(),
                raw.results.len()
            )));
        }

        raw.results
            .into_iter()
            .zip(requests)
            .map(|(result, request)| result.into_result(request.text()))
            .collect()
    }
}

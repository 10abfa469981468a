//! In-process classifier backend with scripted answers

use intent_batch::models::{ClassificationRequest, ClassificationResult};
use intent_batch::types::{ClassifierBackend, ClassifyError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Label for texts without a scripted answer
pub const DEFAULT_LABEL: &str = "General Inquiry";

/// How the backend answers bulk calls
#[derive(Debug, Clone)]
pub enum BulkMode {
    /// Per-row only
    Unsupported,
    /// One label per request
    Labels,
    /// Every bulk call fails
    Fail(ClassifyError),
    /// One result fewer than requested
    Short,
}

pub struct ScriptedBackend {
    labels: HashMap<String, String>,
    failures: Mutex<HashMap<String, VecDeque<ClassifyError>>>,
    delay: Duration,
    bulk: BulkMode,
    calls: AtomicUsize,
    bulk_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            bulk: BulkMode::Unsupported,
            calls: AtomicUsize::new(0),
            bulk_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Answer `text` with `label`
    pub fn respond(mut self, text: &str, label: &str) -> Self {
        self.labels.insert(text.to_string(), label.to_string());
        self
    }

    /// Fail the first `times` per-row calls for `text` with `error`
    pub fn fail(self, text: &str, error: ClassifyError, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(text.to_string())
            .or_default()
            .extend(std::iter::repeat(error).take(times));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_bulk(mut self, bulk: BulkMode) -> Self {
        self.bulk = bulk;
        self
    }

    /// Per-row calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    /// Highest number of per-row calls running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Texts in the order their per-row calls started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// Calls received for `text`
    pub fn calls_for(&self, text: &str) -> usize {
        self.started().iter().filter(|t| *t == text).count()
    }

    fn label_for(&self, text: &str) -> String {
        self.labels
            .get(text)
            .cloned()
            .unwrap_or_else(|| DEFAULT_LABEL.to_string())
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> Result<ClassificationResult, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(request.text().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(request.text())
            .and_then(|queue| queue.pop_front());

        match failure {
            Some(error) => Err(error),
            None => Ok(ClassificationResult::labelled(
                request.text(),
                self.label_for(request.text()),
            )),
        }
    }

    fn supports_bulk(&self) -> bool {
        !matches!(self.bulk, BulkMode::Unsupported)
    }

    async fn classify_bulk(
        &self,
        requests: &[ClassificationRequest],
    ) -> Result<Vec<ClassificationResult>, ClassifyError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);

        let results: Vec<ClassificationResult> = requests
            .iter()
            .map(|r| ClassificationResult::labelled(r.text(), self.label_for(r.text())))
            .collect();

        match &self.bulk {
            BulkMode::Unsupported => Err(ClassifyError::Unsupported("scripted")),
            BulkMode::Labels => Ok(results),
            BulkMode::Fail(error) => Err(error.clone()),
            BulkMode::Short => Ok(results.into_iter().skip(1).collect()),
        }
    }
}

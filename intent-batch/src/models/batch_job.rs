//! Batch job state machine
//!
//! PENDING → RUNNING → COMPLETED, with FAILED (ingestion error) and
//! CANCELLED (user abort) as the other terminal states.

use super::classification::{ClassificationRequest, ClassificationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Batch job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    /// Created on upload submission, items not dispatched yet
    Pending,
    /// Items dispatched to the classifier
    Running,
    /// Every item resolved (labelled or N/A)
    Completed,
    /// Ingestion failed, nothing dispatched
    Failed,
    /// User aborted, partial results discarded
    Cancelled,
}

/// Why a row resolves to N/A without being dispatched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaceholderReason {
    /// The row's `text` field was empty
    EmptyText,
    /// The row could not be decoded
    UnreadableRow(String),
}

/// One ingested row, aligned with the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchItem {
    /// Row to send to the classifier
    Request(ClassificationRequest),
    /// Row kept only to preserve alignment; resolves to N/A
    Placeholder {
        input_text: String,
        reason: PlaceholderReason,
    },
}

impl BatchItem {
    /// Text shown next to the result for this row
    pub fn input_text(&self) -> &str {
        match self {
            BatchItem::Request(request) => request.text(),
            BatchItem::Placeholder { input_text, .. } => input_text,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, BatchItem::Placeholder { .. })
    }
}

/// Invalid batch job transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatchJobError {
    #[error("Cannot {action} a job in state {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: BatchStatus,
    },

    #[error("Result count {results} does not match item count {items}")]
    ResultCountMismatch { items: usize, results: usize },
}

/// A batch of rows classified together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    job_id: Uuid,
    status: BatchStatus,
    items: Vec<BatchItem>,
    results: Vec<ClassificationResult>,
    failure: Option<String>,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    /// Create a pending job with no items yet
    pub fn new() -> Self {
        Self {
            job_id: Uuid::new_v4(),
            status: BatchStatus::Pending,
            items: Vec::new(),
            results: Vec::new(),
            failure: None,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Create a pending job holding `items`
    pub fn with_items(items: Vec<BatchItem>) -> Self {
        let mut job = Self::new();
        job.items = items;
        job
    }

    /// Attach ingested items (PENDING only)
    pub fn attach_items(&mut self, items: Vec<BatchItem>) -> Result<(), BatchJobError> {
        self.require(BatchStatus::Pending, "attach items to")?;
        self.items = items;
        Ok(())
    }

    /// PENDING → RUNNING
    pub fn start(&mut self) -> Result<(), BatchJobError> {
        self.require(BatchStatus::Pending, "start")?;
        self.status = BatchStatus::Running;
        Ok(())
    }

    /// RUNNING → COMPLETED
    ///
    /// `results` must be index-aligned with the items.
    pub fn complete(&mut self, results: Vec<ClassificationResult>) -> Result<(), BatchJobError> {
        self.require(BatchStatus::Running, "complete")?;
        if results.len() != self.items.len() {
            return Err(BatchJobError::ResultCountMismatch {
                items: self.items.len(),
                results: results.len(),
            });
        }
        self.results = results;
        self.finish(BatchStatus::Completed);
        Ok(())
    }

    /// PENDING → FAILED (ingestion error)
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), BatchJobError> {
        self.require(BatchStatus::Pending, "fail")?;
        self.failure = Some(message.into());
        self.finish(BatchStatus::Failed);
        Ok(())
    }

    /// RUNNING → CANCELLED; any partial results are dropped
    pub fn cancel(&mut self) -> Result<(), BatchJobError> {
        self.require(BatchStatus::Running, "cancel")?;
        self.results.clear();
        self.finish(BatchStatus::Cancelled);
        Ok(())
    }

    fn require(&self, expected: BatchStatus, action: &'static str) -> Result<(), BatchJobError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BatchJobError::InvalidTransition {
                action,
                state: self.status,
            })
        }
    }

    fn finish(&mut self, status: BatchStatus) {
        self.status = status;
        self.ended_at = Some(Utc::now());
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn results(&self) -> &[ClassificationResult] {
        &self.results
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn placeholder_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_placeholder()).count()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }

    /// Hand the results over (COMPLETED jobs only)
    pub fn into_results(self) -> Option<Vec<ClassificationResult>> {
        match self.status {
            BatchStatus::Completed => Some(self.results),
            _ => None,
        }
    }
}

impl Default for BatchJob {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<BatchItem> {
        vec![
            BatchItem::Request(ClassificationRequest::new("refund please").unwrap()),
            BatchItem::Placeholder {
                input_text: String::new(),
                reason: PlaceholderReason::EmptyText,
            },
        ]
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = BatchJob::with_items(items());
        assert_eq!(job.status(), BatchStatus::Pending);
        assert_eq!(job.placeholder_count(), 1);

        job.start().unwrap();
        assert_eq!(job.status(), BatchStatus::Running);
        assert!(!job.is_terminal());

        job.complete(vec![
            ClassificationResult::labelled("refund please", "Refund Request"),
            ClassificationResult::not_available(""),
        ])
        .unwrap();
        assert_eq!(job.status(), BatchStatus::Completed);
        assert!(job.ended_at().is_some());
        assert_eq!(job.into_results().unwrap().len(), 2);
    }

    #[test]
    fn test_complete_rejects_misaligned_results() {
        let mut job = BatchJob::with_items(items());
        job.start().unwrap();

        let err = job
            .complete(vec![ClassificationResult::not_available("x")])
            .unwrap_err();
        assert_eq!(err, BatchJobError::ResultCountMismatch { items: 2, results: 1 });
        assert_eq!(job.status(), BatchStatus::Running);
    }

    #[test]
    fn test_fail_only_from_pending() {
        let mut job = BatchJob::new();
        job.fail("unparseable file").unwrap();
        assert_eq!(job.status(), BatchStatus::Failed);
        assert_eq!(job.failure(), Some("unparseable file"));

        let mut running = BatchJob::with_items(items());
        running.start().unwrap();
        assert!(running.fail("late").is_err());
    }

    #[test]
    fn test_cancel_discards_results() {
        let mut job = BatchJob::with_items(items());
        job.start().unwrap();
        job.cancel().unwrap();
        assert_eq!(job.status(), BatchStatus::Cancelled);
        assert!(job.results().is_empty());
        assert!(job.into_results().is_none());
    }

    #[test]
    fn test_attach_items_after_start_rejected() {
        let mut job = BatchJob::new();
        job.attach_items(items()).unwrap();
        job.start().unwrap();
        assert!(job.attach_items(Vec::new()).is_err());
    }
}

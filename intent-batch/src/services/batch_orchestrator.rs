//! Batch orchestrator
//!
//! Drives a [`BatchJob`] from PENDING to a terminal state:
//!
//! 1. Placeholder rows resolve to N/A immediately, without dispatch.
//! 2. When the backend supports it, all dispatchable rows go out in one bulk
//!    call. A failed or misaligned bulk call falls back to step 3.
//! 3. Rows are dispatched one per call, at most `concurrency` in flight,
//!    started in submission order. A row that still fails after the client's
//!    retries resolves to N/A; it never fails the batch.
//!
//! Each resolved row is written to its own slot by index, so the result
//! order always matches the input order regardless of completion order.
//! Cancellation drops in-flight calls and leaves the job CANCELLED with no
//! results.

use crate::models::{BatchItem, BatchJob, BatchJobError, ClassificationRequest, ClassificationResult};
use crate::services::classifier_client::ClassifierClient;
use crate::types::ClassifyError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use intent_common::events::{BatchEvent, EventBus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default number of classification calls in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Outcome of the dispatch phase
enum Dispatch {
    Resolved(Vec<Option<ClassificationResult>>),
    Cancelled { completed: usize },
}

/// Runs batch jobs against a shared classifier client
#[derive(Clone)]
pub struct BatchOrchestrator {
    client: Arc<ClassifierClient>,
    concurrency: usize,
    event_bus: EventBus,
}

impl BatchOrchestrator {
    /// `concurrency` below 1 is raised to 1
    pub fn new(client: Arc<ClassifierClient>, concurrency: usize, event_bus: EventBus) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
            event_bus,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `job` to completion or cancellation
    ///
    /// Returns the job in COMPLETED (results aligned with items) or CANCELLED
    /// state. Fails only if `job` is not PENDING.
    pub async fn run(
        &self,
        mut job: BatchJob,
        cancel: &CancellationToken,
    ) -> Result<BatchJob, BatchJobError> {
        job.start()?;

        let job_id = job.job_id();
        let total_items = job.items().len();
        let placeholders = job.placeholder_count();

        info!(
            job_id = %job_id,
            total_items,
            placeholders,
            backend = self.client.backend_name(),
            concurrency = self.concurrency,
            "Batch started"
        );
        self.event_bus.emit_lossy(BatchEvent::BatchStarted {
            job_id,
            total_items,
            placeholders,
            timestamp: Utc::now(),
        });

        match self.dispatch(job_id, job.items(), cancel).await {
            Dispatch::Resolved(slots) => {
                let results: Vec<ClassificationResult> = slots
                    .into_iter()
                    .zip(job.items())
                    .map(|(slot, item)| {
                        slot.unwrap_or_else(|| ClassificationResult::not_available(item.input_text()))
                    })
                    .collect();
                let labelled = results.iter().filter(|r| r.is_labelled()).count();

                job.complete(results)?;

                info!(
                    job_id = %job_id,
                    total_items,
                    labelled,
                    not_available = total_items - labelled,
                    "Batch completed"
                );
                self.event_bus.emit_lossy(BatchEvent::BatchCompleted {
                    job_id,
                    total_items,
                    labelled,
                    not_available: total_items - labelled,
                    timestamp: Utc::now(),
                });
            }
            Dispatch::Cancelled { completed } => {
                job.cancel()?;

                info!(job_id = %job_id, completed, total_items, "Batch cancelled");
                self.event_bus.emit_lossy(BatchEvent::BatchCancelled {
                    job_id,
                    completed,
                    total_items,
                    timestamp: Utc::now(),
                });
            }
        }

        Ok(job)
    }

    async fn dispatch(
        &self,
        job_id: Uuid,
        items: &[BatchItem],
        cancel: &CancellationToken,
    ) -> Dispatch {
        let total_items = items.len();
        let mut slots: Vec<Option<ClassificationResult>> = Vec::with_capacity(total_items);
        let mut pending: Vec<(usize, ClassificationRequest)> = Vec::new();

        for (index, item) in items.iter().enumerate() {
            match item {
                BatchItem::Request(request) => {
                    slots.push(None);
                    pending.push((index, request.clone()));
                }
                BatchItem::Placeholder { input_text, reason } => {
                    debug!(job_id = %job_id, index, reason = ?reason, "Row resolved to N/A without dispatch");
                    slots.push(Some(ClassificationResult::not_available(input_text.as_str())));
                }
            }
        }

        let mut completed = total_items - pending.len();

        if pending.is_empty() {
            return Dispatch::Resolved(slots);
        }

        if self.client.supports_bulk() {
            match self.dispatch_bulk(job_id, &pending, cancel).await {
                Ok(results) => {
                    for ((index, _), result) in pending.iter().zip(results) {
                        let labelled = result.is_labelled();
                        slots[*index] = Some(result);
                        completed += 1;
                        self.item_resolved(job_id, *index, labelled, completed, total_items);
                    }
                    return Dispatch::Resolved(slots);
                }
                Err(ClassifyError::Cancelled) => return Dispatch::Cancelled { completed },
                Err(error) => {
                    warn!(
                        job_id = %job_id,
                        rows = pending.len(),
                        error = %error,
                        "Bulk classification failed, falling back to per-row dispatch"
                    );
                }
            }
        }

        let client = &self.client;
        let mut in_flight = stream::iter(pending)
            .map(|(index, request)| async move {
                let outcome = client.classify(&request, cancel).await;
                (index, request, outcome)
            })
            .buffer_unordered(self.concurrency);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Dispatch::Cancelled { completed },
                next = in_flight.next() => next,
            };

            let Some((index, request, outcome)) = next else {
                break;
            };

            let result = match outcome {
                Ok(result) => result,
                Err(ClassifyError::Cancelled) => return Dispatch::Cancelled { completed },
                Err(error) => {
                    warn!(
                        job_id = %job_id,
                        index,
                        error = %error,
                        "Row classification failed, storing N/A"
                    );
                    ClassificationResult::not_available(request.text())
                }
            };

            let labelled = result.is_labelled();
            slots[index] = Some(result);
            completed += 1;
            self.item_resolved(job_id, index, labelled, completed, total_items);
        }

        Dispatch::Resolved(slots)
    }

    /// One bulk call for every dispatchable row
    async fn dispatch_bulk(
        &self,
        job_id: Uuid,
        pending: &[(usize, ClassificationRequest)],
        cancel: &CancellationToken,
    ) -> Result<Vec<ClassificationResult>, ClassifyError> {
        let requests: Vec<ClassificationRequest> =
            pending.iter().map(|(_, request)| request.clone()).collect();

        debug!(job_id = %job_id, rows = requests.len(), "Dispatching bulk classification");
        let results = self.client.classify_bulk(&requests, cancel).await?;

        if results.len() != requests.len() {
            return Err(ClassifyError::MalformedResponse(format!(
                "bulk call returned {} results for {} rows",
                results.len(),
                requests.len()
            )));
        }
        Ok(results)
    }

    fn item_resolved(
        &self,
        job_id: Uuid,
        index: usize,
        labelled: bool,
        completed: usize,
        total_items: usize,
    ) {
        self.event_bus.emit_lossy(BatchEvent::ItemResolved {
            job_id,
            index,
            labelled,
            completed,
            total_items,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchStatus, PlaceholderReason};
    use crate::services::classifier_client::RetryPolicy;
    use crate::types::ClassifierBackend;

    /// Labels every text with its length
    struct LengthLabel;

    #[async_trait::async_trait]
    impl ClassifierBackend for LengthLabel {
        fn name(&self) -> &'static str {
            "length"
        }

        async fn classify(
            &self,
            request: &ClassificationRequest,
        ) -> Result<ClassificationResult, ClassifyError> {
            Ok(ClassificationResult::labelled(
                request.text(),
                format!("len-{}", request.text().len()),
            ))
        }
    }

    fn orchestrator(event_bus: EventBus) -> BatchOrchestrator {
        let client = ClassifierClient::new(Arc::new(LengthLabel), RetryPolicy::no_retry());
        BatchOrchestrator::new(Arc::new(client), 2, event_bus)
    }

    #[tokio::test]
    async fn test_placeholders_keep_alignment() {
        let items = vec![
            BatchItem::Request(ClassificationRequest::new("abc").unwrap()),
            BatchItem::Placeholder {
                input_text: String::new(),
                reason: PlaceholderReason::EmptyText,
            },
            BatchItem::Request(ClassificationRequest::new("abcde").unwrap()),
        ];

        let job = orchestrator(EventBus::default())
            .run(BatchJob::with_items(items), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), BatchStatus::Completed);
        let labels: Vec<&str> = job.results().iter().map(|r| r.predicted_intent()).collect();
        assert_eq!(labels, vec!["len-3", "N/A", "len-5"]);
    }

    #[tokio::test]
    async fn test_all_placeholder_batch_completes_without_dispatch() {
        let items = vec![BatchItem::Placeholder {
            input_text: "   ".to_string(),
            reason: PlaceholderReason::EmptyText,
        }];

        let job = orchestrator(EventBus::default())
            .run(BatchJob::with_items(items), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(job.status(), BatchStatus::Completed);
        assert!(!job.results()[0].is_labelled());
    }

    #[tokio::test]
    async fn test_events_emitted_in_lifecycle_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let items = vec![BatchItem::Request(ClassificationRequest::new("hi").unwrap())];

        orchestrator(bus)
            .run(BatchJob::with_items(items), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(rx.recv().await.unwrap(), BatchEvent::BatchStarted { total_items: 1, .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            BatchEvent::ItemResolved { index: 0, labelled: true, completed: 1, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            BatchEvent::BatchCompleted { labelled: 1, not_available: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_running_job_rejected() {
        let mut job = BatchJob::new();
        job.start().unwrap();

        let err = orchestrator(EventBus::default())
            .run(job, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchJobError::InvalidTransition { .. }));
    }
}

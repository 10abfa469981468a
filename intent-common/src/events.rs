//! Batch lifecycle events
//!
//! The orchestrator emits these while a batch runs; front ends subscribe to
//! render progress and the final outcome. Emission never blocks and never
//! fails the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Batch lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BatchEvent {
    /// Items dispatched to the classifier
    BatchStarted {
        job_id: Uuid,
        total_items: usize,
        /// Items that resolve without dispatch (empty or unreadable rows)
        placeholders: usize,
        timestamp: DateTime<Utc>,
    },

    /// One item resolved (labelled or N/A)
    ItemResolved {
        job_id: Uuid,
        index: usize,
        /// `false` when the item fell back to N/A
        labelled: bool,
        completed: usize,
        total_items: usize,
    },

    /// All items resolved and results published
    BatchCompleted {
        job_id: Uuid,
        total_items: usize,
        labelled: usize,
        not_available: usize,
        timestamp: DateTime<Utc>,
    },

    /// Ingestion failed, nothing was dispatched
    BatchFailed {
        job_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// User aborted, partial results discarded
    BatchCancelled {
        job_id: Uuid,
        completed: usize,
        total_items: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast channel for [`BatchEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BatchEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: BatchEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

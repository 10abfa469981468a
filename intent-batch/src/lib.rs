//! intent-batch library interface
//!
//! Customer-intent classification client: dataset upload and batch
//! classification, single queries, results with export, and a session gate
//! in front of the protected views.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::error::{AppError, AppResult};

use crate::models::ClassificationResult;
use crate::services::batch_orchestrator::{BatchOrchestrator, DEFAULT_CONCURRENCY};
use crate::services::classifier_client::ClassifierClient;
use crate::services::file_ingestor::FileIngestor;
use crate::services::result_store::ResultStore;
use crate::services::session_gate::SessionGate;
use intent_common::config::TomlConfig;
use intent_common::events::EventBus;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Application state shared by every operation
///
/// Passed explicitly; nothing in the crate reaches for global state.
#[derive(Clone)]
pub struct AppState {
    /// Shared classifier client (timeout, retry, rate limit)
    pub classifier: Arc<ClassifierClient>,
    pub orchestrator: BatchOrchestrator,
    pub ingestor: FileIngestor,
    /// Results of the last completed batch
    pub store: ResultStore,
    pub session: Arc<RwLock<SessionGate>>,
    /// Batch lifecycle events
    pub event_bus: EventBus,
    /// Last answered single query
    pub last_query: Arc<RwLock<Option<ClassificationResult>>>,
    /// Cancellation tokens for running batches
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
}

impl AppState {
    pub fn new(
        classifier: ClassifierClient,
        session: SessionGate,
        ingestor: FileIngestor,
        concurrency: usize,
        event_bus: EventBus,
    ) -> Self {
        let classifier = Arc::new(classifier);
        Self {
            orchestrator: BatchOrchestrator::new(classifier.clone(), concurrency, event_bus.clone()),
            classifier,
            ingestor,
            store: ResultStore::new(),
            session: Arc::new(RwLock::new(session)),
            event_bus,
            last_query: Arc::new(RwLock::new(None)),
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Build the state from configuration and the resolved root folder
    pub fn from_config(config: &TomlConfig, root_folder: &Path) -> AppResult<Self> {
        let classifier = config::build_classifier(config)?;
        let session = SessionGate::in_root_folder(root_folder)?;
        let concurrency = match config.classifier.concurrency {
            0 => DEFAULT_CONCURRENCY,
            n => n,
        };

        Ok(Self::new(
            classifier,
            session,
            FileIngestor::new(config.upload.max_bytes),
            concurrency,
            EventBus::default(),
        ))
    }

    /// Cancel every running batch
    pub async fn cancel_all(&self) -> usize {
        let tokens = self.cancellation_tokens.read().await;
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }
}

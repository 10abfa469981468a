//! Result store
//!
//! Holds the results of the last completed batch for the results view.
//! Contents are replaced as a whole: readers take a snapshot and always see
//! either the previous complete set or the new one.

use crate::models::ClassificationResult;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Number of results carrying one label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentCount {
    pub intent: String,
    pub count: usize,
}

#[derive(Debug)]
struct StoreState {
    results: Arc<[ClassificationResult]>,
    generation: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            results: Arc::from(Vec::new()),
            generation: 0,
        }
    }
}

/// Shared handle to the latest batch results
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    state: Arc<RwLock<StoreState>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `results`
    ///
    /// Storing contents identical to the current ones changes nothing, not
    /// even the generation.
    pub async fn set_results(&self, results: Vec<ClassificationResult>) {
        let mut state = self.state.write().await;
        if *state.results == results[..] {
            debug!(generation = state.generation, "Result set unchanged");
            return;
        }
        state.results = results.into();
        state.generation += 1;
        debug!(
            generation = state.generation,
            count = state.results.len(),
            "Result set replaced"
        );
    }

    /// Remove all results
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        if state.results.is_empty() {
            return;
        }
        state.results = Arc::from(Vec::new());
        state.generation += 1;
        debug!(generation = state.generation, "Result set cleared");
    }

    /// Current results; unaffected by later replacements
    pub async fn snapshot(&self) -> Arc<[ClassificationResult]> {
        self.state.read().await.results.clone()
    }

    /// Incremented on every change of contents
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.results.is_empty()
    }

    /// Per-label counts, in order of first appearance
    pub async fn distribution(&self) -> Vec<IntentCount> {
        distribution(&self.snapshot().await)
    }
}

/// Count results per predicted intent, in order of first appearance
pub fn distribution(results: &[ClassificationResult]) -> Vec<IntentCount> {
    let mut counts: Vec<IntentCount> = Vec::new();
    for result in results {
        match counts
            .iter_mut()
            .find(|c| c.intent == result.predicted_intent())
        {
            Some(entry) => entry.count += 1,
            None => counts.push(IntentCount {
                intent: result.predicted_intent().to_string(),
                count: 1,
            }),
        }
    }
    counts
}

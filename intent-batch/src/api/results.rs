//! Results view: table, distribution, CSV download

use crate::error::AppResult;
use crate::models::{ClassificationResult, View};
use crate::services::csv_export;
use crate::services::result_store::IntentCount;
use crate::AppState;
use std::path::Path;
use std::sync::Arc;

/// Results of the last completed batch
pub async fn results_snapshot(state: &AppState) -> AppResult<Arc<[ClassificationResult]>> {
    state.session.read().await.check(View::Results)?;
    Ok(state.store.snapshot().await)
}

/// Per-intent counts of the last completed batch
pub async fn intent_distribution(state: &AppState) -> AppResult<Vec<IntentCount>> {
    state.session.read().await.check(View::Results)?;
    Ok(state.store.distribution().await)
}

/// Write the current results as CSV to `path`; returns the row count
pub async fn export_results(state: &AppState, path: &Path) -> AppResult<usize> {
    let results = results_snapshot(state).await?;
    csv_export::export_to_path(&results, path).await?;
    Ok(results.len())
}

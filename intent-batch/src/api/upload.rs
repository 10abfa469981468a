//! Dataset upload: ingest, classify, publish

use crate::error::{AppError, AppResult};
use crate::models::{BatchJob, BatchStatus, View};
use crate::services::file_ingestor::UploadFile;
use crate::AppState;
use chrono::Utc;
use intent_common::events::BatchEvent;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Upload `file` and classify every row
///
/// On success the completed job is returned and its results have replaced
/// the result store contents in one step. Ingestion errors fail the job
/// before anything is dispatched. A cancelled batch returns
/// [`AppError::Cancelled`] and leaves the store untouched.
///
/// `cancel` aborts this batch; [`cancel_batch`] and
/// [`AppState::cancel_all`] reach it as well.
pub async fn upload_dataset(
    state: &AppState,
    file: &UploadFile,
    cancel: CancellationToken,
) -> AppResult<BatchJob> {
    state.session.read().await.check(View::DatasetUpload)?;

    let mut job = BatchJob::new();
    let job_id = job.job_id();
    info!(job_id = %job_id, file = %file.file_name(), "Dataset upload started");

    let items = match state.ingestor.ingest(file).await {
        Ok(items) => items,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Dataset ingestion failed");
            job.fail(e.to_string())?;
            state.event_bus.emit_lossy(BatchEvent::BatchFailed {
                job_id,
                message: e.to_string(),
                timestamp: Utc::now(),
            });
            return Err(AppError::Ingest(e));
        }
    };
    job.attach_items(items)?;

    state
        .cancellation_tokens
        .write()
        .await
        .insert(job_id, cancel.clone());

    let outcome = state.orchestrator.run(job, &cancel).await;

    state.cancellation_tokens.write().await.remove(&job_id);

    let job = outcome?;
    match job.status() {
        BatchStatus::Completed => {
            state.store.set_results(job.results().to_vec()).await;
            Ok(job)
        }
        _ => Err(AppError::Cancelled),
    }
}

/// Cancel the running batch `job_id`; `false` when no such batch runs
pub async fn cancel_batch(state: &AppState, job_id: Uuid) -> bool {
    match state.cancellation_tokens.read().await.get(&job_id) {
        Some(token) => {
            token.cancel();
            true
        }
        None => false,
    }
}

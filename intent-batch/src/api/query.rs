//! Single interactive query

use crate::error::AppResult;
use crate::models::{ClassificationRequest, ClassificationResult, View};
use crate::AppState;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Classify one query typed by the user
///
/// Empty or whitespace-only text returns `Ok(None)` without dispatching a
/// call or touching any state. A failed call is returned as an error; the
/// previous answer is kept.
pub async fn submit_query(
    state: &AppState,
    text: &str,
    cancel: &CancellationToken,
) -> AppResult<Option<ClassificationResult>> {
    state.session.read().await.check(View::SingleQuery)?;

    let Some(request) = ClassificationRequest::new(text) else {
        debug!("Empty query ignored");
        return Ok(None);
    };

    let result = state.classifier.classify(&request, cancel).await?;
    info!(intent = %result.predicted_intent(), "Query classified");

    *state.last_query.write().await = Some(result.clone());
    Ok(Some(result))
}

/// Last answered query, if any
pub async fn last_query(state: &AppState) -> Option<ClassificationResult> {
    state.last_query.read().await.clone()
}

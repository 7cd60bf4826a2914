//! Task protocol integration endpoints.
//!
//! Single completions fail loudly; batches always answer 200 with a
//! per-item result list so one bad task never voids the rest.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chain::{ChainReconciler, TaskCompletion, TaskResult};
use crate::ledger::ActivityLedger;
use crate::scoring::ReputationScore;
use crate::store::ActivityRecord;

use super::error_response;

/// API state for task endpoints
#[derive(Clone)]
pub struct TaskApiState {
    pub ledger: Arc<ActivityLedger>,
    pub reconciler: Arc<ChainReconciler>,
}

#[derive(Debug, Deserialize)]
pub struct TaskBatchRequest {
    pub tasks: Vec<TaskCompletion>,
}

#[derive(Debug, Serialize)]
pub struct TaskCompletionResponse {
    pub activity: ActivityRecord,
    pub score: ReputationScore,
}

#[derive(Debug, Serialize)]
pub struct TaskBatchResponse {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<TaskResult>,
}

/// POST /complete - Record a single task completion
pub async fn complete_task(
    State(state): State<TaskApiState>,
    Json(payload): Json<TaskCompletion>,
) -> Result<(StatusCode, Json<TaskCompletionResponse>), (StatusCode, String)> {
    let (activity, score) = state
        .ledger
        .record_task_completion(&payload.task_id, &payload.actor, payload.score_weight)
        .await
        .map_err(error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(TaskCompletionResponse { activity, score }),
    ))
}

/// POST /batch - Record a batch of task completions
pub async fn complete_task_batch(
    State(state): State<TaskApiState>,
    Json(payload): Json<TaskBatchRequest>,
) -> Json<TaskBatchResponse> {
    let results = state.reconciler.process_task_batch(payload.tasks).await;
    let processed = results.iter().filter(|r| r.status == "processed").count();
    Json(TaskBatchResponse {
        total: results.len(),
        processed,
        failed: results.len() - processed,
        results,
    })
}

pub fn create_router(state: TaskApiState) -> Router {
    Router::new()
        .route("/complete", post(complete_task))
        .route("/batch", post(complete_task_batch))
        .with_state(state)
}

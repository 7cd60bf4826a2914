//! Verification request workflow endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::store::{ActorRecord, RequestFilter, RequestRecord, RequestStatus, RequestType};
use crate::workflow::{RequestSubmission, VerificationWorkflow};

use super::{caller_wallet, error_response};

/// API state for verification endpoints
#[derive(Clone)]
pub struct VerificationApiState {
    pub workflow: Arc<VerificationWorkflow>,
}

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub actor: Option<String>,
    pub limit: Option<i64>,
}

/// Submission body; the requesting actor comes from the wallet header.
#[derive(Debug, Deserialize)]
pub struct SubmitRequestBody {
    pub request_id: String,
    pub request_type: RequestType,
    #[serde(default)]
    pub proof_refs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequestBody {
    pub decision: RequestStatus,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub request: RequestRecord,
    pub actor: ActorRecord,
}

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub total: usize,
    pub requests: Vec<RequestRecord>,
}

/// POST /request - File a new verification request for the caller
pub async fn submit_request(
    State(state): State<VerificationApiState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<RequestRecord>), (StatusCode, String)> {
    let actor = caller_wallet(&headers)?;
    let submission = RequestSubmission {
        actor,
        request_id: payload.request_id,
        request_type: payload.request_type,
        proof_refs: payload.proof_refs,
    };
    let record = state
        .workflow
        .submit(submission)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /requests - List verification requests
pub async fn list_requests(
    State(state): State<VerificationApiState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<RequestListResponse>, (StatusCode, String)> {
    let filter = RequestFilter {
        status: query.status,
        request_type: query.request_type,
        actor: query.actor,
        limit: query.limit,
    };
    let requests = state.workflow.list(&filter).await.map_err(error_response)?;
    Ok(Json(RequestListResponse {
        total: requests.len(),
        requests,
    }))
}

/// GET /{request_id} - Fetch a single request
pub async fn get_request(
    State(state): State<VerificationApiState>,
    Path(request_id): Path<String>,
) -> Result<Json<RequestRecord>, (StatusCode, String)> {
    let record = state
        .workflow
        .get(&request_id)
        .await
        .map_err(error_response)?;
    Ok(Json(record))
}

/// POST /{request_id}/review - Approve or reject a pending request as the caller
pub async fn review_request(
    State(state): State<VerificationApiState>,
    Path(request_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<ReviewRequestBody>,
) -> Result<Json<ReviewResponse>, (StatusCode, String)> {
    let reviewer = caller_wallet(&headers)?;
    let (request, actor) = state
        .workflow
        .review(
            &request_id,
            payload.decision,
            &reviewer,
            payload.comments.as_deref(),
        )
        .await
        .map_err(error_response)?;
    Ok(Json(ReviewResponse { request, actor }))
}

pub fn create_router(state: VerificationApiState) -> Router {
    Router::new()
        .route("/request", post(submit_request))
        .route("/requests", get(list_requests))
        .route("/{request_id}", get(get_request))
        .route("/{request_id}/review", post(review_request))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::WALLET_HEADER;
    use crate::scoring::ReputationScore;
    use crate::store::{Store, VerificationTier};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let store = Arc::new(Store::in_memory());
        let now = Utc::now();
        store
            .insert_actor(ActorRecord {
                did: "did:example:alice".to_string(),
                wallet_address: "0xalice".to_string(),
                username: None,
                score: ReputationScore::default(),
                score_updated_at: None,
                tier: VerificationTier::Unverified,
                social_accounts: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        let workflow = Arc::new(VerificationWorkflow::new(store));
        create_router(VerificationApiState { workflow })
    }

    fn submission(wallet: Option<&str>, request_id: &str) -> Request<Body> {
        let body = serde_json::json!({
            "request_id": request_id,
            "request_type": "skill",
            "proof_refs": ["ipfs://proof"],
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/request")
            .header("content-type", "application/json");
        if let Some(wallet) = wallet {
            builder = builder.header(WALLET_HEADER, wallet);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn submission_without_wallet_header_is_unauthorized() {
        let router = test_router().await;
        let response = router.oneshot(submission(None, "req-1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn resubmitting_the_same_request_id_conflicts() {
        let router = test_router().await;
        let response = router
            .clone()
            .oneshot(submission(Some("0xalice"), "req-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = router
            .oneshot(submission(Some("0xalice"), "req-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reviewer_comes_from_the_header() {
        let router = test_router().await;
        router
            .clone()
            .oneshot(submission(Some("0xalice"), "req-1"))
            .await
            .unwrap();

        let body = serde_json::json!({ "decision": "approved" });
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/req-1/review")
                    .header("content-type", "application/json")
                    .header(WALLET_HEADER, "0xadmin")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let reviewed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reviewed["request"]["reviewer"], "0xadmin");
        assert_eq!(reviewed["actor"]["tier"], "basic");
    }
}

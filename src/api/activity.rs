//! Activity proof endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ledger::{ActivityLedger, ActivitySubmission};
use crate::scoring::ReputationScore;
use crate::store::{ActivityFilter, ActivityRecord, ProofState};

use super::{caller_wallet, error_response};

/// API state for activity endpoints
#[derive(Clone)]
pub struct ActivityApiState {
    pub ledger: Arc<ActivityLedger>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityListQuery {
    pub state: Option<ProofState>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Submission body; the submitter's identity comes from the wallet header.
#[derive(Debug, Deserialize)]
pub struct SubmitActivityBody {
    pub proof_id: String,
    pub activity_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub source: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub score_impact: u32,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct VerifiedProofResponse {
    pub activity: ActivityRecord,
    pub score: ReputationScore,
}

#[derive(Debug, Serialize)]
pub struct ActivityListResponse {
    pub total: usize,
    pub activities: Vec<ActivityRecord>,
}

/// POST / - Submit a new activity proof on behalf of the caller
pub async fn submit_activity(
    State(state): State<ActivityApiState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitActivityBody>,
) -> Result<(StatusCode, Json<ActivityRecord>), (StatusCode, String)> {
    let actor = caller_wallet(&headers)?;
    let submission = ActivitySubmission {
        actor,
        proof_id: payload.proof_id,
        activity_type: payload.activity_type,
        title: payload.title,
        description: payload.description,
        source: payload.source,
        timestamp: payload.timestamp,
        score_impact: payload.score_impact,
        metadata: payload.metadata,
    };
    let record = state
        .ledger
        .submit(submission)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /{identifier} - List an actor's activities
pub async fn list_activities(
    State(state): State<ActivityApiState>,
    Path(identifier): Path<String>,
    Query(query): Query<ActivityListQuery>,
) -> Result<Json<ActivityListResponse>, (StatusCode, String)> {
    let filter = ActivityFilter {
        state: query.state,
        limit: query.limit,
        offset: query.offset,
    };
    let activities = state
        .ledger
        .list(&identifier, &filter)
        .await
        .map_err(error_response)?;
    Ok(Json(ActivityListResponse {
        total: activities.len(),
        activities,
    }))
}

/// POST /{proof_id}/verify - Verify a pending proof as the calling verifier
pub async fn verify_activity(
    State(state): State<ActivityApiState>,
    Path(proof_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<VerifiedProofResponse>, (StatusCode, String)> {
    let verifier = caller_wallet(&headers)?;
    let (activity, score) = state
        .ledger
        .verify(&proof_id, &verifier)
        .await
        .map_err(error_response)?;
    Ok(Json(VerifiedProofResponse { activity, score }))
}

/// POST /{proof_id}/reject - Reject a pending proof as the calling verifier
pub async fn reject_activity(
    State(state): State<ActivityApiState>,
    Path(proof_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ActivityRecord>, (StatusCode, String)> {
    let verifier = caller_wallet(&headers)?;
    let record = state
        .ledger
        .reject(&proof_id, &verifier)
        .await
        .map_err(error_response)?;
    Ok(Json(record))
}

pub fn create_router(state: ActivityApiState) -> Router {
    Router::new()
        .route("/", post(submit_activity))
        .route("/{identifier}", get(list_activities))
        .route("/{proof_id}/verify", post(verify_activity))
        .route("/{proof_id}/reject", post(reject_activity))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::WALLET_HEADER;
    use crate::chain::ChainBridge;
    use crate::store::{ActorRecord, Store, VerificationTier};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
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
        let ledger = Arc::new(ActivityLedger::new(store, Arc::new(ChainBridge::idle())));
        create_router(ActivityApiState { ledger })
    }

    fn submit_request(wallet: Option<&str>) -> Request<Body> {
        let body = serde_json::json!({
            "proof_id": "p1",
            "activity_type": "github_commit",
            "title": "Commit",
            "source": "GitHub",
            "score_impact": 10,
        });
        let mut builder = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json");
        if let Some(wallet) = wallet {
            builder = builder.header(WALLET_HEADER, wallet);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn submission_without_wallet_header_is_unauthorized() {
        let router = test_router().await;
        let response = router.oneshot(submit_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submission_is_attributed_to_the_header_wallet() {
        let router = test_router().await;
        let response = router
            .oneshot(submit_request(Some("0xalice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let record: ActivityRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(record.wallet_address, "0xalice");
    }

    #[tokio::test]
    async fn verification_takes_the_verifier_from_the_header() {
        let router = test_router().await;
        router
            .clone()
            .oneshot(submit_request(Some("0xalice")))
            .await
            .unwrap();

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/p1/verify")
                    .header(WALLET_HEADER, "0xverifier")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let verified: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(verified["activity"]["verifier"], "0xverifier");
    }
}

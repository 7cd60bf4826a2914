//! Reputation score endpoints.
//!
//! Score reads go through the reconciler, so responses carry whether the
//! number came from the contract or the cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::attestation::{create_score_proof, ScoreProofMeta};
use crate::chain::{ChainReconciler, ScoreSource};
use crate::scoring::{ReputationScore, ScoreWeights, ENGINE_VERSION};
use crate::store::{ActivityFilter, ProofState, ServiceStats, Store, VerificationTier};

use super::error_response;

/// API state for reputation endpoints
#[derive(Clone)]
pub struct ReputationApiState {
    pub store: Arc<Store>,
    pub reconciler: Arc<ChainReconciler>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub wallet_address: String,
    pub did: String,
    pub tier: VerificationTier,
    pub score: ReputationScore,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: ScoreSource,
}

#[derive(Debug, Serialize)]
pub struct ActivityStats {
    pub total: usize,
    pub pending: usize,
    pub verified: usize,
    pub rejected: usize,
    pub verified_points: u64,
}

#[derive(Debug, Serialize)]
pub struct BreakdownResponse {
    pub wallet_address: String,
    pub tier: VerificationTier,
    pub score: ReputationScore,
    pub engine_version: &'static str,
    pub recent_activity: ActivityStats,
}

#[derive(Debug, Serialize)]
pub struct ScoreProofResponse {
    #[serde(flatten)]
    pub proof: ScoreProofMeta,
    pub score: ReputationScore,
    pub source: ScoreSource,
}

/// GET /{identifier} - Read an actor's reputation score
pub async fn get_score(
    State(state): State<ReputationApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<ScoreResponse>, (StatusCode, String)> {
    let (actor, resolved) = state
        .reconciler
        .read_score(&identifier)
        .await
        .map_err(error_response)?;
    Ok(Json(ScoreResponse {
        wallet_address: actor.wallet_address,
        did: actor.did,
        tier: actor.tier,
        score: resolved.score,
        last_updated: resolved.last_updated,
        source: resolved.source,
    }))
}

/// GET /{identifier}/breakdown - Cached score plus recent activity counts
pub async fn get_breakdown(
    State(state): State<ReputationApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<BreakdownResponse>, (StatusCode, String)> {
    let actor = state
        .store
        .resolve_actor(&identifier)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            error_response(crate::error::CoreError::not_found("actor", &identifier))
        })?;

    let recent = state
        .store
        .list_activities(&actor.wallet_address, &ActivityFilter::default())
        .await
        .map_err(error_response)?;

    let pending = recent
        .iter()
        .filter(|a| a.state == ProofState::Pending)
        .count();
    let verified = recent
        .iter()
        .filter(|a| a.state == ProofState::Verified)
        .count();
    let rejected = recent
        .iter()
        .filter(|a| a.state == ProofState::Rejected)
        .count();
    let verified_points = recent
        .iter()
        .filter(|a| a.state == ProofState::Verified)
        .map(|a| a.score_impact as u64)
        .sum();

    Ok(Json(BreakdownResponse {
        wallet_address: actor.wallet_address,
        tier: actor.tier,
        score: actor.score,
        engine_version: ENGINE_VERSION,
        recent_activity: ActivityStats {
            total: recent.len(),
            pending,
            verified,
            rejected,
            verified_points,
        },
    }))
}

/// POST /{identifier}/proof - Produce a signed-content score proof
pub async fn create_proof(
    State(state): State<ReputationApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<ScoreProofResponse>, (StatusCode, String)> {
    let (actor, resolved) = state
        .reconciler
        .read_score(&identifier)
        .await
        .map_err(error_response)?;

    let proof = create_score_proof(
        &actor.wallet_address,
        Some(&actor.did),
        &resolved.score,
        resolved.last_updated,
        &ScoreWeights::default(),
    )
    .map_err(error_response)?;

    Ok(Json(ScoreProofResponse {
        proof,
        score: resolved.score,
        source: resolved.source,
    }))
}

/// GET /stats - Service-wide aggregate counters
pub async fn get_stats(
    State(state): State<ReputationApiState>,
) -> Result<Json<ServiceStats>, (StatusCode, String)> {
    let stats = state.store.service_stats().await.map_err(error_response)?;
    Ok(Json(stats))
}

pub fn create_router(state: ReputationApiState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/{identifier}", get(get_score))
        .route("/{identifier}/breakdown", get(get_breakdown))
        .route("/{identifier}/proof", post(create_proof))
        .with_state(state)
}

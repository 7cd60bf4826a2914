//! Actor registration and lookup endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::CoreError;
use crate::scoring::ReputationScore;
use crate::store::{ActorRecord, SocialAccounts, Store, VerificationTier};

use super::error_response;

/// API state for actor endpoints
#[derive(Clone)]
pub struct ActorApiState {
    pub store: Arc<Store>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterActorRequest {
    pub did: String,
    pub wallet_address: String,
    pub username: Option<String>,
    pub social_accounts: Option<SocialAccounts>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

/// POST /register - Register a new actor
pub async fn register_actor(
    State(state): State<ActorApiState>,
    Json(payload): Json<RegisterActorRequest>,
) -> Result<(StatusCode, Json<ActorRecord>), (StatusCode, String)> {
    if !payload.did.starts_with("did:") {
        return Err(error_response(CoreError::InvalidArgument(
            "did must start with \"did:\"".to_string(),
        )));
    }
    if payload.wallet_address.trim().is_empty() {
        return Err(error_response(CoreError::InvalidArgument(
            "wallet_address must not be empty".to_string(),
        )));
    }

    let now = Utc::now();
    let record = ActorRecord {
        did: payload.did,
        wallet_address: payload.wallet_address.to_lowercase(),
        username: payload.username,
        score: ReputationScore::default(),
        score_updated_at: None,
        tier: VerificationTier::Unverified,
        social_accounts: payload.social_accounts,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .insert_actor(record.clone())
        .await
        .map_err(error_response)?;

    info!(wallet = %record.wallet_address, did = %record.did, "Actor registered");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /{identifier} - Look up an actor by wallet address or DID
pub async fn get_actor(
    State(state): State<ActorApiState>,
    Path(identifier): Path<String>,
) -> Result<Json<ActorRecord>, (StatusCode, String)> {
    let actor = state
        .store
        .resolve_actor(&identifier)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(CoreError::not_found("actor", &identifier)))?;
    Ok(Json(actor))
}

/// PUT /{identifier}/username - Change an actor's display name
pub async fn update_username(
    State(state): State<ActorApiState>,
    Path(identifier): Path<String>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<Json<ActorRecord>, (StatusCode, String)> {
    if payload.username.trim().is_empty() {
        return Err(error_response(CoreError::InvalidArgument(
            "username must not be empty".to_string(),
        )));
    }

    let actor = state
        .store
        .resolve_actor(&identifier)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(CoreError::not_found("actor", &identifier)))?;

    let updated = state
        .store
        .update_actor_username(&actor.wallet_address, payload.username.trim())
        .await
        .map_err(error_response)?;
    Ok(Json(updated))
}

pub fn create_router(state: ActorApiState) -> Router {
    Router::new()
        .route("/register", post(register_actor))
        .route("/{identifier}", get(get_actor))
        .route("/{identifier}/username", put(update_username))
        .with_state(state)
}

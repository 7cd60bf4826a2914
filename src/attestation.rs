//! Score attestation: hash-bound, independently recomputable snapshots.
//!
//! A proof binds `{address, did, score, weights, engine_version}` into a
//! canonical JSON payload, hashes it with SHA-256, and derives a
//! deterministic content-address string from the hash. A real IPFS
//! integration would pin the payload and record the returned CID; the
//! derived pseudo-CID keeps the interface stable until then.
//!
//! Proofs are generated only on request, never automatically on score
//! changes, so a stale proof is expected; consumers distinguish freshness
//! via the embedded `last_updated` timestamp and `engine_version`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};
use crate::scoring::{ReputationScore, ScoreWeights, ENGINE_VERSION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreProofMeta {
    pub proof_hash: String,
    pub content_address: String,
    pub engine_version: String,
}

/// Canonical payload. Field order is fixed by this struct definition;
/// changing it changes every hash, which is an engine-version bump.
#[derive(Serialize)]
struct ProofPayload<'a> {
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    did: Option<&'a str>,
    score: ScoreSnapshot<'a>,
    weights: &'a ScoreWeights,
    engine_version: &'a str,
}

#[derive(Serialize)]
struct ScoreSnapshot<'a> {
    #[serde(flatten)]
    score: &'a ReputationScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_updated: Option<i64>,
}

/// Build a deterministic attestation for the given score snapshot.
/// Identical inputs always produce an identical hash; changing any single
/// field changes it.
pub fn create_score_proof(
    address: &str,
    did: Option<&str>,
    score: &ReputationScore,
    last_updated: Option<DateTime<Utc>>,
    weights: &ScoreWeights,
) -> CoreResult<ScoreProofMeta> {
    let payload = ProofPayload {
        address: address.to_lowercase(),
        did,
        score: ScoreSnapshot {
            score,
            last_updated: last_updated.map(|t| t.timestamp()),
        },
        weights,
        engine_version: ENGINE_VERSION,
    };

    let json = serde_json::to_vec(&payload)
        .map_err(|e| CoreError::InvalidArgument(format!("unserializable proof payload: {}", e)))?;

    let digest = hex::encode(Sha256::digest(&json));

    Ok(ScoreProofMeta {
        proof_hash: format!("0x{}", digest),
        content_address: format!("ipfs://score-{}", &digest[..32]),
        engine_version: ENGINE_VERSION.to_string(),
    })
}

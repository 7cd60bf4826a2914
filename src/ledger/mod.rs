//! Activity ledger: proof submission, verification, and score recomputation.
//!
//! Every proof enters as `pending` and moves exactly once to `verified` or
//! `rejected`. Verification recomputes the actor's cached score before the
//! call returns, then hands the on-chain side to the bridge without waiting
//! on it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::chain::{ActivityProofSubmission, ChainBridge, ChainJob};
use crate::error::{CoreError, CoreResult};
use crate::scoring::{compute_score, ActivityKind, ReputationScore, MAX_BUCKET_SCORE};
use crate::store::{ActivityFilter, ActivityRecord, ProofState, Store};

/// Verifier identity stamped on task completions from the task protocol.
const TASK_PROTOCOL_VERIFIER: &str = "krnl_protocol";

/// A new activity proof as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivitySubmission {
    /// Wallet address or DID.
    pub actor: String,
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

pub struct ActivityLedger {
    store: Arc<Store>,
    bridge: Arc<ChainBridge>,
}

impl ActivityLedger {
    pub fn new(store: Arc<Store>, bridge: Arc<ChainBridge>) -> Self {
        Self { store, bridge }
    }

    /// Record a new proof in `pending` state and queue its on-chain
    /// submission.
    pub async fn submit(&self, submission: ActivitySubmission) -> CoreResult<ActivityRecord> {
        if submission.proof_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "proof_id must not be empty".to_string(),
            ));
        }
        if submission.score_impact > MAX_BUCKET_SCORE {
            return Err(CoreError::InvalidArgument(format!(
                "score_impact {} exceeds maximum {}",
                submission.score_impact, MAX_BUCKET_SCORE
            )));
        }
        if ActivityKind::parse(&submission.activity_type).is_none() {
            debug!(activity_type = %submission.activity_type,
                   "Unknown activity type, proof will not affect the score");
        }

        let actor = self
            .store
            .resolve_actor(&submission.actor)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", &submission.actor))?;

        let record = ActivityRecord {
            proof_id: submission.proof_id,
            wallet_address: actor.wallet_address.clone(),
            activity_type: submission.activity_type,
            title: submission.title,
            description: submission.description,
            source: submission.source,
            timestamp: submission.timestamp.unwrap_or_else(Utc::now),
            score_impact: submission.score_impact,
            state: ProofState::Pending,
            verifier: None,
            tx_hash: None,
            metadata: submission.metadata,
        };
        self.store.insert_activity(record.clone()).await?;

        info!(proof_id = %record.proof_id, wallet = %record.wallet_address,
              activity_type = %record.activity_type, "Activity proof submitted");

        self.bridge
            .enqueue(ChainJob::SubmitProof(ActivityProofSubmission {
                address: record.wallet_address.clone(),
                proof_id: record.proof_id.clone(),
                activity_type: record.activity_type.clone(),
                score_impact: record.score_impact,
            }));

        Ok(record)
    }

    /// Verify a pending proof. The cached score is recomputed before this
    /// returns; the on-chain verification runs behind the bridge.
    pub async fn verify(
        &self,
        proof_id: &str,
        verifier: &str,
    ) -> CoreResult<(ActivityRecord, ReputationScore)> {
        let record = self.store.verify_activity(proof_id, verifier).await?;
        let score = self.recompute(&record.wallet_address).await?;

        info!(proof_id = %proof_id, wallet = %record.wallet_address,
              verifier = %verifier, total = score.total, "Activity proof verified");

        if let Some(index) = self
            .store
            .activity_index(&record.wallet_address, proof_id)
            .await?
        {
            self.bridge.enqueue(ChainJob::VerifyActivity {
                address: record.wallet_address.clone(),
                proof_index: index,
            });
        }

        Ok((record, score))
    }

    /// Reject a pending proof. Rejection is terminal and never touches the
    /// score or the chain.
    pub async fn reject(&self, proof_id: &str, verifier: &str) -> CoreResult<ActivityRecord> {
        let record = self.store.reject_activity(proof_id, verifier).await?;
        info!(proof_id = %proof_id, wallet = %record.wallet_address,
              verifier = %verifier, "Activity proof rejected");
        Ok(record)
    }

    pub async fn list(
        &self,
        identifier: &str,
        filter: &ActivityFilter,
    ) -> CoreResult<Vec<ActivityRecord>> {
        let actor = self
            .store
            .resolve_actor(identifier)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", identifier))?;
        self.store
            .list_activities(&actor.wallet_address, filter)
            .await
    }

    /// Record a completed protocol task as an already-verified activity.
    /// The task id keys the proof, so replays surface as conflicts.
    pub async fn record_task_completion(
        &self,
        task_id: &str,
        actor: &str,
        score_weight: u32,
    ) -> CoreResult<(ActivityRecord, ReputationScore)> {
        if task_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "task_id must not be empty".to_string(),
            ));
        }
        if score_weight > MAX_BUCKET_SCORE {
            return Err(CoreError::InvalidArgument(format!(
                "score_weight {} exceeds maximum {}",
                score_weight, MAX_BUCKET_SCORE
            )));
        }

        let resolved = self
            .store
            .resolve_actor(actor)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", actor))?;

        let record = ActivityRecord {
            proof_id: format!("krnl_{}", task_id),
            wallet_address: resolved.wallet_address.clone(),
            activity_type: ActivityKind::KrnlTaskCompleted.as_str().to_string(),
            title: format!("Task {} completed", task_id),
            description: None,
            source: "KRNL".to_string(),
            timestamp: Utc::now(),
            score_impact: score_weight,
            state: ProofState::Verified,
            verifier: Some(TASK_PROTOCOL_VERIFIER.to_string()),
            tx_hash: None,
            metadata: None,
        };
        self.store.insert_activity(record.clone()).await?;
        let score = self.recompute(&record.wallet_address).await?;

        info!(task_id = %task_id, wallet = %record.wallet_address,
              score_weight, total = score.total, "Task completion recorded");

        self.bridge.enqueue(ChainJob::RecordTaskCompletion {
            task_id: task_id.to_string(),
        });

        Ok((record, score))
    }

    /// Recompute the cached score from all verified activities and persist
    /// it on the actor.
    pub async fn recompute(&self, wallet: &str) -> CoreResult<ReputationScore> {
        let verified = self.store.list_verified_activities(wallet).await?;
        let score = compute_score(
            verified
                .iter()
                .map(|a| (a.activity_type.as_str(), a.score_impact)),
        );
        self.store
            .update_actor_score(wallet, score, Utc::now())
            .await?;
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ActorRecord, SocialAccounts, VerificationTier};

    fn test_actor(wallet: &str, did: &str) -> ActorRecord {
        let now = Utc::now();
        ActorRecord {
            did: did.to_string(),
            wallet_address: wallet.to_string(),
            username: None,
            score: ReputationScore::default(),
            score_updated_at: None,
            tier: VerificationTier::Unverified,
            social_accounts: None::<SocialAccounts>,
            created_at: now,
            updated_at: now,
        }
    }

    async fn ledger_with_actor() -> ActivityLedger {
        let store = Arc::new(Store::in_memory());
        store
            .insert_actor(test_actor("0xaaa", "did:example:alice"))
            .await
            .unwrap();
        ActivityLedger::new(store, Arc::new(ChainBridge::idle()))
    }

    fn submission(proof_id: &str, activity_type: &str, impact: u32) -> ActivitySubmission {
        ActivitySubmission {
            actor: "0xAAA".to_string(),
            proof_id: proof_id.to_string(),
            activity_type: activity_type.to_string(),
            title: "test".to_string(),
            description: None,
            source: "github".to_string(),
            timestamp: None,
            score_impact: impact,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn submit_then_verify_updates_score() {
        let ledger = ledger_with_actor().await;
        ledger
            .submit(submission("p1", "github_commit", 40))
            .await
            .unwrap();

        let (record, score) = ledger.verify("p1", "reviewer").await.unwrap();
        assert_eq!(record.state, ProofState::Verified);
        assert_eq!(score.contribution, 40);
        assert_eq!(score.total, 14); // 40 * 0.35
    }

    #[tokio::test]
    async fn verify_is_at_most_once() {
        let ledger = ledger_with_actor().await;
        ledger
            .submit(submission("p1", "github_commit", 10))
            .await
            .unwrap();
        ledger.verify("p1", "reviewer").await.unwrap();

        let err = ledger.verify("p1", "reviewer").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        let err = ledger.reject("p1", "reviewer").await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn duplicate_proof_id_conflicts() {
        let ledger = ledger_with_actor().await;
        ledger
            .submit(submission("p1", "github_commit", 10))
            .await
            .unwrap();
        let err = ledger
            .submit(submission("p1", "github_pr", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn oversized_impact_is_rejected() {
        let ledger = ledger_with_actor().await;
        let err = ledger
            .submit(submission("p1", "github_commit", 101))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejection_leaves_score_untouched() {
        let ledger = ledger_with_actor().await;
        ledger
            .submit(submission("p1", "endorsement", 30))
            .await
            .unwrap();
        let record = ledger.reject("p1", "reviewer").await.unwrap();
        assert_eq!(record.state, ProofState::Rejected);

        let score = ledger.recompute("0xaaa").await.unwrap();
        assert_eq!(score.total, 0);
    }

    #[tokio::test]
    async fn task_completion_is_pre_verified_and_replay_safe() {
        let ledger = ledger_with_actor().await;
        let (record, score) = ledger
            .record_task_completion("t-1", "did:example:alice", 50)
            .await
            .unwrap();
        assert_eq!(record.state, ProofState::Verified);
        assert_eq!(record.proof_id, "krnl_t-1");
        assert_eq!(score.contribution, 50);

        let err = ledger
            .record_task_completion("t-1", "did:example:alice", 50)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }
}

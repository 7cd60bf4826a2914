//! Verification request workflow and trust-tier promotion.
//!
//! Actors file requests backed by proof references; a reviewer approves or
//! rejects each request exactly once. Approval may promote the actor's tier:
//! any first approval lifts `unverified` to `basic`, and an identity
//! approval lifts `basic` to `verified`. Tiers only ever move up.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::store::{
    ActorRecord, RequestFilter, RequestRecord, RequestStatus, RequestType, Store, VerificationTier,
};

/// A new verification request as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSubmission {
    /// Wallet address or DID.
    pub actor: String,
    /// Client-chosen identifier; resubmitting the same id conflicts.
    pub request_id: String,
    pub request_type: RequestType,
    #[serde(default)]
    pub proof_refs: Vec<String>,
}

/// Tier an approval of `request_type` moves the actor to, if any.
pub fn next_tier(current: VerificationTier, request_type: RequestType) -> Option<VerificationTier> {
    match current {
        VerificationTier::Unverified => Some(VerificationTier::Basic),
        VerificationTier::Basic if request_type == RequestType::Identity => {
            Some(VerificationTier::Verified)
        }
        _ => None,
    }
}

pub struct VerificationWorkflow {
    store: Arc<Store>,
}

impl VerificationWorkflow {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn submit(&self, submission: RequestSubmission) -> CoreResult<RequestRecord> {
        if submission.request_id.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "request_id must not be empty".to_string(),
            ));
        }

        let actor = self
            .store
            .resolve_actor(&submission.actor)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", &submission.actor))?;

        let record = RequestRecord {
            request_id: submission.request_id,
            wallet_address: actor.wallet_address,
            request_type: submission.request_type,
            status: RequestStatus::Pending,
            proof_refs: submission.proof_refs,
            submitted_at: Utc::now(),
            reviewed_at: None,
            reviewer: None,
            comments: None,
        };
        self.store.insert_request(record.clone()).await?;

        info!(request_id = %record.request_id, wallet = %record.wallet_address,
              request_type = %record.request_type.as_str(), "Verification request submitted");
        Ok(record)
    }

    pub async fn get(&self, request_id: &str) -> CoreResult<RequestRecord> {
        self.store
            .get_request(request_id)
            .await?
            .ok_or_else(|| CoreError::not_found("request", request_id))
    }

    pub async fn list(&self, filter: &RequestFilter) -> CoreResult<Vec<RequestRecord>> {
        self.store.list_requests(filter).await
    }

    /// Decide a pending request. Approval may promote the actor's tier; the
    /// updated actor is returned alongside the reviewed request.
    pub async fn review(
        &self,
        request_id: &str,
        decision: RequestStatus,
        reviewer: &str,
        comments: Option<&str>,
    ) -> CoreResult<(RequestRecord, ActorRecord)> {
        if decision == RequestStatus::Pending {
            return Err(CoreError::InvalidArgument(
                "decision must be approved or rejected".to_string(),
            ));
        }

        let record = self
            .store
            .review_request(request_id, decision, reviewer, comments)
            .await?;

        let actor = self
            .store
            .find_actor_by_wallet(&record.wallet_address)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", &record.wallet_address))?;

        let actor = if decision == RequestStatus::Approved {
            match next_tier(actor.tier, record.request_type) {
                Some(tier) => {
                    let promoted = self
                        .store
                        .promote_actor_tier(&record.wallet_address, tier)
                        .await?;
                    info!(request_id = %request_id, wallet = %record.wallet_address,
                          tier = %promoted.tier.as_str(), "Actor tier promoted");
                    promoted
                }
                None => actor,
            }
        } else {
            actor
        };

        info!(request_id = %request_id, decision = %decision.as_str(),
              reviewer = %reviewer, "Verification request reviewed");
        Ok((record, actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ReputationScore;

    fn test_actor(wallet: &str, did: &str, tier: VerificationTier) -> ActorRecord {
        let now = Utc::now();
        ActorRecord {
            did: did.to_string(),
            wallet_address: wallet.to_string(),
            username: None,
            score: ReputationScore::default(),
            score_updated_at: None,
            tier,
            social_accounts: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn workflow_with(tier: VerificationTier) -> VerificationWorkflow {
        let store = Arc::new(Store::in_memory());
        store
            .insert_actor(test_actor("0xaaa", "did:example:alice", tier))
            .await
            .unwrap();
        VerificationWorkflow::new(store)
    }

    fn request(request_type: RequestType) -> RequestSubmission {
        RequestSubmission {
            actor: "0xaaa".to_string(),
            request_id: format!("req_{}", request_type.as_str()),
            request_type,
            proof_refs: vec!["ipfs://proof-1".to_string()],
        }
    }

    #[test]
    fn promotion_table() {
        use RequestType::*;
        use VerificationTier::*;

        assert_eq!(next_tier(Unverified, Skill), Some(Basic));
        assert_eq!(next_tier(Unverified, Identity), Some(Basic));
        assert_eq!(next_tier(Basic, Identity), Some(Verified));
        assert_eq!(next_tier(Basic, Skill), None);
        assert_eq!(next_tier(Verified, Identity), None);
        assert_eq!(next_tier(Premium, Identity), None);
    }

    #[tokio::test]
    async fn first_approval_promotes_to_basic() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        let record = workflow.submit(request(RequestType::Skill)).await.unwrap();

        let (reviewed, actor) = workflow
            .review(&record.request_id, RequestStatus::Approved, "admin", None)
            .await
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Approved);
        assert_eq!(actor.tier, VerificationTier::Basic);
    }

    #[tokio::test]
    async fn identity_approval_reaches_verified() {
        let workflow = workflow_with(VerificationTier::Basic).await;
        let record = workflow
            .submit(request(RequestType::Identity))
            .await
            .unwrap();

        let (_, actor) = workflow
            .review(&record.request_id, RequestStatus::Approved, "admin", None)
            .await
            .unwrap();
        assert_eq!(actor.tier, VerificationTier::Verified);
    }

    #[tokio::test]
    async fn non_identity_approval_never_leaves_basic() {
        let workflow = workflow_with(VerificationTier::Basic).await;
        let record = workflow.submit(request(RequestType::Project)).await.unwrap();

        let (_, actor) = workflow
            .review(&record.request_id, RequestStatus::Approved, "admin", None)
            .await
            .unwrap();
        assert_eq!(actor.tier, VerificationTier::Basic);
    }

    #[tokio::test]
    async fn rejection_keeps_the_tier() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        let record = workflow.submit(request(RequestType::Skill)).await.unwrap();

        let (reviewed, actor) = workflow
            .review(
                &record.request_id,
                RequestStatus::Rejected,
                "admin",
                Some("insufficient proof"),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.status, RequestStatus::Rejected);
        assert_eq!(reviewed.comments.as_deref(), Some("insufficient proof"));
        assert_eq!(actor.tier, VerificationTier::Unverified);
    }

    #[tokio::test]
    async fn review_is_at_most_once() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        let record = workflow.submit(request(RequestType::Skill)).await.unwrap();

        workflow
            .review(&record.request_id, RequestStatus::Approved, "admin", None)
            .await
            .unwrap();
        let err = workflow
            .review(&record.request_id, RequestStatus::Rejected, "admin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[tokio::test]
    async fn duplicate_request_id_conflicts() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        workflow.submit(request(RequestType::Skill)).await.unwrap();

        let err = workflow
            .submit(request(RequestType::Skill))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        // A different id from the same actor still goes through.
        workflow
            .submit(request(RequestType::Identity))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn empty_request_id_is_rejected() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        let err = workflow
            .submit(RequestSubmission {
                request_id: "  ".to_string(),
                ..request(RequestType::Skill)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn proof_refs_may_be_empty() {
        let workflow = workflow_with(VerificationTier::Unverified).await;
        let record = workflow
            .submit(RequestSubmission {
                proof_refs: Vec::new(),
                ..request(RequestType::Skill)
            })
            .await
            .unwrap();
        assert!(record.proof_refs.is_empty());
    }
}

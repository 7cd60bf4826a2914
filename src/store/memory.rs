//! In-memory store backend.
//!
//! Used when PostgreSQL is disabled or unreachable (dev mode) and by the
//! test suite. State transitions are compare-and-set under a single write
//! lock, giving the same at-most-once semantics as the SQL backend.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{CoreError, CoreResult};
use crate::scoring::ReputationScore;

use super::records::{
    ActivityFilter, ActivityRecord, ActorRecord, ProofState, RequestFilter, RequestRecord,
    RequestStatus, ServiceStats, VerificationTier,
};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by normalized wallet address.
    actors: HashMap<String, ActorRecord>,
    /// DID -> wallet address secondary index.
    did_index: HashMap<String, String>,
    /// Keyed by proof id (globally unique).
    activities: HashMap<String, ActivityRecord>,
    /// Keyed by request id.
    requests: HashMap<String, RequestRecord>,
}

impl MemoryStore {
    // Actors

    pub async fn insert_actor(&self, record: ActorRecord) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.actors.contains_key(&record.wallet_address)
            || inner.did_index.contains_key(&record.did)
        {
            return Err(CoreError::conflict("actor", &record.wallet_address));
        }
        inner
            .did_index
            .insert(record.did.clone(), record.wallet_address.clone());
        inner.actors.insert(record.wallet_address.clone(), record);
        Ok(())
    }

    pub async fn find_actor_by_wallet(&self, wallet: &str) -> CoreResult<Option<ActorRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.actors.get(wallet).cloned())
    }

    pub async fn find_actor_by_did(&self, did: &str) -> CoreResult<Option<ActorRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .did_index
            .get(did)
            .and_then(|wallet| inner.actors.get(wallet))
            .cloned())
    }

    pub async fn update_actor_score(
        &self,
        wallet: &str,
        score: ReputationScore,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        let actor = inner
            .actors
            .get_mut(wallet)
            .ok_or_else(|| CoreError::not_found("actor", wallet))?;
        actor.score = score;
        actor.score_updated_at = Some(at);
        actor.updated_at = at;
        Ok(())
    }

    pub async fn update_actor_username(
        &self,
        wallet: &str,
        username: &str,
    ) -> CoreResult<ActorRecord> {
        let mut inner = self.inner.write().await;
        let actor = inner
            .actors
            .get_mut(wallet)
            .ok_or_else(|| CoreError::not_found("actor", wallet))?;
        actor.username = Some(username.to_string());
        actor.updated_at = Utc::now();
        Ok(actor.clone())
    }

    /// Monotonic tier update: applied only when `next` outranks the current
    /// tier, otherwise the record is returned unchanged.
    pub async fn promote_actor_tier(
        &self,
        wallet: &str,
        next: VerificationTier,
    ) -> CoreResult<ActorRecord> {
        let mut inner = self.inner.write().await;
        let actor = inner
            .actors
            .get_mut(wallet)
            .ok_or_else(|| CoreError::not_found("actor", wallet))?;
        if next.rank() > actor.tier.rank() {
            actor.tier = next;
            actor.updated_at = Utc::now();
        }
        Ok(actor.clone())
    }

    // Activities

    pub async fn insert_activity(&self, record: ActivityRecord) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.activities.contains_key(&record.proof_id) {
            return Err(CoreError::conflict("proof", &record.proof_id));
        }
        inner.activities.insert(record.proof_id.clone(), record);
        Ok(())
    }

    pub async fn get_activity(&self, proof_id: &str) -> CoreResult<Option<ActivityRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.activities.get(proof_id).cloned())
    }

    pub async fn list_activities(
        &self,
        wallet: &str,
        filter: &ActivityFilter,
    ) -> CoreResult<Vec<ActivityRecord>> {
        let inner = self.inner.read().await;
        let mut items: Vec<ActivityRecord> = inner
            .activities
            .values()
            .filter(|a| a.wallet_address == wallet)
            .filter(|a| filter.state.map_or(true, |s| a.state == s))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.proof_id.cmp(&b.proof_id))
        });
        let offset = filter.offset() as usize;
        let limit = filter.limit() as usize;
        Ok(items.into_iter().skip(offset).take(limit).collect())
    }

    pub async fn list_verified_activities(&self, wallet: &str) -> CoreResult<Vec<ActivityRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .activities
            .values()
            .filter(|a| a.wallet_address == wallet && a.state == ProofState::Verified)
            .cloned()
            .collect())
    }

    /// Position of a proof within the owner's activities in ascending
    /// timestamp order (the index used by the on-chain verify call).
    pub async fn activity_index(&self, wallet: &str, proof_id: &str) -> CoreResult<Option<u64>> {
        let inner = self.inner.read().await;
        let mut items: Vec<&ActivityRecord> = inner
            .activities
            .values()
            .filter(|a| a.wallet_address == wallet)
            .collect();
        items.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.proof_id.cmp(&b.proof_id))
        });
        Ok(items
            .iter()
            .position(|a| a.proof_id == proof_id)
            .map(|i| i as u64))
    }

    pub async fn verify_activity(
        &self,
        proof_id: &str,
        verifier: &str,
    ) -> CoreResult<ActivityRecord> {
        self.transition_activity(proof_id, ProofState::Verified, verifier)
            .await
    }

    pub async fn reject_activity(
        &self,
        proof_id: &str,
        verifier: &str,
    ) -> CoreResult<ActivityRecord> {
        self.transition_activity(proof_id, ProofState::Rejected, verifier)
            .await
    }

    async fn transition_activity(
        &self,
        proof_id: &str,
        to: ProofState,
        verifier: &str,
    ) -> CoreResult<ActivityRecord> {
        let mut inner = self.inner.write().await;
        let activity = inner
            .activities
            .get_mut(proof_id)
            .ok_or_else(|| CoreError::not_found("proof", proof_id))?;
        if activity.state != ProofState::Pending {
            return Err(CoreError::InvalidState(format!(
                "proof {} is already {}",
                proof_id,
                activity.state.as_str()
            )));
        }
        activity.state = to;
        activity.verifier = Some(verifier.to_string());
        Ok(activity.clone())
    }

    // Verification requests

    pub async fn insert_request(&self, record: RequestRecord) -> CoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.requests.contains_key(&record.request_id) {
            return Err(CoreError::conflict("request", &record.request_id));
        }
        inner.requests.insert(record.request_id.clone(), record);
        Ok(())
    }

    pub async fn get_request(&self, request_id: &str) -> CoreResult<Option<RequestRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.requests.get(request_id).cloned())
    }

    /// `filter.actor` must already be a resolved wallet address.
    pub async fn list_requests(&self, filter: &RequestFilter) -> CoreResult<Vec<RequestRecord>> {
        let inner = self.inner.read().await;
        let mut items: Vec<RequestRecord> = inner
            .requests
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .filter(|r| filter.request_type.map_or(true, |t| r.request_type == t))
            .filter(|r| {
                filter
                    .actor
                    .as_deref()
                    .map_or(true, |w| r.wallet_address == w)
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        items.truncate(filter.limit() as usize);
        Ok(items)
    }

    pub async fn review_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        reviewer: &str,
        comments: Option<&str>,
    ) -> CoreResult<RequestRecord> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(request_id)
            .ok_or_else(|| CoreError::not_found("request", request_id))?;
        if request.status != RequestStatus::Pending {
            return Err(CoreError::InvalidState(format!(
                "request {} is already {}",
                request_id,
                request.status.as_str()
            )));
        }
        request.status = status;
        request.reviewed_at = Some(Utc::now());
        request.reviewer = Some(reviewer.to_string());
        request.comments = comments.map(|c| c.to_string());
        Ok(request.clone())
    }

    // Aggregates

    pub async fn service_stats(&self) -> CoreResult<ServiceStats> {
        let inner = self.inner.read().await;
        let verified_actors = inner
            .actors
            .values()
            .filter(|a| a.tier.rank() >= VerificationTier::Verified.rank())
            .count() as u64;
        let completed_tasks = inner
            .activities
            .values()
            .filter(|a| a.activity_type == "krnl_task_completed")
            .count() as u64;
        let verified_points = inner
            .activities
            .values()
            .filter(|a| a.state == ProofState::Verified)
            .map(|a| a.score_impact as u64)
            .sum();
        Ok(ServiceStats {
            actors: inner.actors.len() as u64,
            verified_actors,
            completed_tasks,
            verified_points,
        })
    }
}

//! Persistence layer for actors, activity proofs, and verification requests.
//!
//! `Store` fronts two interchangeable backends: PostgreSQL when a database
//! URL is configured and reachable, and an in-memory map otherwise. Startup
//! degrades to the in-memory backend with a warning rather than failing, so
//! the service stays usable in development without a database.

mod memory;
mod postgres;
pub mod records;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::error::CoreResult;
use crate::scoring::ReputationScore;
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use records::{
    ActivityFilter, ActivityRecord, ActorRecord, ProofState, RequestFilter, RequestRecord,
    RequestStatus, RequestType, ServiceStats, SocialAccounts, VerificationTier,
};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// PostgreSQL connection URL. `None` selects the in-memory backend.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 10,
        }
    }
}

pub struct Store {
    pg: Option<PgStore>,
    memory: MemoryStore,
}

impl Store {
    /// Connect per `config`, falling back to the in-memory backend if the
    /// database is unconfigured or unreachable.
    pub async fn connect(config: &StoreConfig) -> Self {
        if let Some(url) = &config.database_url {
            match PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await
            {
                Ok(pool) => {
                    let pg = PgStore::new(pool);
                    match pg.init_schema().await {
                        Ok(()) => {
                            info!("Store connected to PostgreSQL");
                            return Self {
                                pg: Some(pg),
                                memory: MemoryStore::default(),
                            };
                        }
                        Err(e) => {
                            warn!("Schema init failed, falling back to in-memory store: {}", e)
                        }
                    }
                }
                Err(e) => warn!(
                    "PostgreSQL unavailable, falling back to in-memory store: {}",
                    e
                ),
            }
        } else {
            info!("No database URL configured, using in-memory store");
        }
        Self {
            pg: None,
            memory: MemoryStore::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            pg: None,
            memory: MemoryStore::default(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.pg.is_some()
    }

    /// Look up an actor by wallet address first, then by DID. Wallet
    /// addresses are matched case-insensitively; DIDs are exact.
    pub async fn resolve_actor(&self, identifier: &str) -> CoreResult<Option<ActorRecord>> {
        let wallet = identifier.to_lowercase();
        if let Some(actor) = self.find_actor_by_wallet(&wallet).await? {
            return Ok(Some(actor));
        }
        self.find_actor_by_did(identifier).await
    }

    // Actors

    pub async fn insert_actor(&self, record: ActorRecord) -> CoreResult<()> {
        match &self.pg {
            Some(pg) => pg.insert_actor(record).await,
            None => self.memory.insert_actor(record).await,
        }
    }

    pub async fn find_actor_by_wallet(&self, wallet: &str) -> CoreResult<Option<ActorRecord>> {
        match &self.pg {
            Some(pg) => pg.find_actor_by_wallet(wallet).await,
            None => self.memory.find_actor_by_wallet(wallet).await,
        }
    }

    pub async fn find_actor_by_did(&self, did: &str) -> CoreResult<Option<ActorRecord>> {
        match &self.pg {
            Some(pg) => pg.find_actor_by_did(did).await,
            None => self.memory.find_actor_by_did(did).await,
        }
    }

    pub async fn update_actor_score(
        &self,
        wallet: &str,
        score: ReputationScore,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        match &self.pg {
            Some(pg) => pg.update_actor_score(wallet, score, at).await,
            None => self.memory.update_actor_score(wallet, score, at).await,
        }
    }

    pub async fn update_actor_username(
        &self,
        wallet: &str,
        username: &str,
    ) -> CoreResult<ActorRecord> {
        match &self.pg {
            Some(pg) => pg.update_actor_username(wallet, username).await,
            None => self.memory.update_actor_username(wallet, username).await,
        }
    }

    pub async fn promote_actor_tier(
        &self,
        wallet: &str,
        next: VerificationTier,
    ) -> CoreResult<ActorRecord> {
        match &self.pg {
            Some(pg) => pg.promote_actor_tier(wallet, next).await,
            None => self.memory.promote_actor_tier(wallet, next).await,
        }
    }

    // Activities

    pub async fn insert_activity(&self, record: ActivityRecord) -> CoreResult<()> {
        match &self.pg {
            Some(pg) => pg.insert_activity(record).await,
            None => self.memory.insert_activity(record).await,
        }
    }

    pub async fn get_activity(&self, proof_id: &str) -> CoreResult<Option<ActivityRecord>> {
        match &self.pg {
            Some(pg) => pg.get_activity(proof_id).await,
            None => self.memory.get_activity(proof_id).await,
        }
    }

    pub async fn list_activities(
        &self,
        wallet: &str,
        filter: &ActivityFilter,
    ) -> CoreResult<Vec<ActivityRecord>> {
        match &self.pg {
            Some(pg) => pg.list_activities(wallet, filter).await,
            None => self.memory.list_activities(wallet, filter).await,
        }
    }

    pub async fn list_verified_activities(&self, wallet: &str) -> CoreResult<Vec<ActivityRecord>> {
        match &self.pg {
            Some(pg) => pg.list_verified_activities(wallet).await,
            None => self.memory.list_verified_activities(wallet).await,
        }
    }

    /// Zero-based position of a proof within the actor's activity history,
    /// ordered by submission time. This is the index the chain contract
    /// addresses activities by.
    pub async fn activity_index(&self, wallet: &str, proof_id: &str) -> CoreResult<Option<u64>> {
        match &self.pg {
            Some(pg) => pg.activity_index(wallet, proof_id).await,
            None => self.memory.activity_index(wallet, proof_id).await,
        }
    }

    pub async fn verify_activity(
        &self,
        proof_id: &str,
        verifier: &str,
    ) -> CoreResult<ActivityRecord> {
        match &self.pg {
            Some(pg) => pg.verify_activity(proof_id, verifier).await,
            None => self.memory.verify_activity(proof_id, verifier).await,
        }
    }

    pub async fn reject_activity(
        &self,
        proof_id: &str,
        verifier: &str,
    ) -> CoreResult<ActivityRecord> {
        match &self.pg {
            Some(pg) => pg.reject_activity(proof_id, verifier).await,
            None => self.memory.reject_activity(proof_id, verifier).await,
        }
    }

    // Verification requests

    pub async fn insert_request(&self, record: RequestRecord) -> CoreResult<()> {
        match &self.pg {
            Some(pg) => pg.insert_request(record).await,
            None => self.memory.insert_request(record).await,
        }
    }

    pub async fn get_request(&self, request_id: &str) -> CoreResult<Option<RequestRecord>> {
        match &self.pg {
            Some(pg) => pg.get_request(request_id).await,
            None => self.memory.get_request(request_id).await,
        }
    }

    /// List requests; an `actor` filter may be a wallet address or DID and
    /// is resolved here. An unknown actor yields an empty list.
    pub async fn list_requests(&self, filter: &RequestFilter) -> CoreResult<Vec<RequestRecord>> {
        let mut filter = filter.clone();
        if let Some(identifier) = filter.actor.take() {
            match self.resolve_actor(&identifier).await? {
                Some(actor) => filter.actor = Some(actor.wallet_address),
                None => return Ok(Vec::new()),
            }
        }
        match &self.pg {
            Some(pg) => pg.list_requests(&filter).await,
            None => self.memory.list_requests(&filter).await,
        }
    }

    pub async fn review_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        reviewer: &str,
        comments: Option<&str>,
    ) -> CoreResult<RequestRecord> {
        match &self.pg {
            Some(pg) => {
                pg.review_request(request_id, status, reviewer, comments)
                    .await
            }
            None => {
                self.memory
                    .review_request(request_id, status, reviewer, comments)
                    .await
            }
        }
    }

    // Aggregates

    pub async fn service_stats(&self) -> CoreResult<ServiceStats> {
        match &self.pg {
            Some(pg) => pg.service_stats().await,
            None => self.memory.service_stats().await,
        }
    }
}

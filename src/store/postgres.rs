//! PostgreSQL store backend using sqlx.
//!
//! State transitions are expressed as conditional UPDATEs on the current
//! state (`... WHERE state = 'pending'`), so concurrent transition attempts
//! on the same record resolve to exactly one winner at the database.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::scoring::ReputationScore;

use super::records::{
    ActivityFilter, ActivityRecord, ActorRecord, ProofState, RequestFilter, RequestRecord,
    RequestStatus, RequestType, ServiceStats, SocialAccounts, VerificationTier,
};

pub struct PgStore {
    pool: PgPool,
}

fn store_err(e: sqlx::Error) -> CoreError {
    CoreError::Unavailable(format!("store error: {}", e))
}

fn insert_err(e: sqlx::Error, kind: &str, id: &str) -> CoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return CoreError::conflict(kind, id);
        }
    }
    store_err(e)
}

fn actor_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<ActorRecord> {
    let tier_str: String = row.get("tier");
    let tier = VerificationTier::parse(&tier_str)
        .ok_or_else(|| CoreError::Unavailable(format!("corrupt tier value: {}", tier_str)))?;
    let social_json: Option<serde_json::Value> = row.get("social_accounts");
    let social_accounts: Option<SocialAccounts> =
        social_json.and_then(|v| serde_json::from_value(v).ok());
    Ok(ActorRecord {
        did: row.get("did"),
        wallet_address: row.get("wallet_address"),
        username: row.get("username"),
        score: ReputationScore {
            total: row.get::<i32, _>("total").max(0) as u32,
            identity: row.get::<i32, _>("identity").max(0) as u32,
            contribution: row.get::<i32, _>("contribution").max(0) as u32,
            trust: row.get::<i32, _>("trust").max(0) as u32,
            social: row.get::<i32, _>("social").max(0) as u32,
            engagement: row.get::<i32, _>("engagement").max(0) as u32,
        },
        score_updated_at: row.get("score_updated_at"),
        tier,
        social_accounts,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn activity_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<ActivityRecord> {
    let state_str: String = row.get("state");
    let state = ProofState::parse(&state_str)
        .ok_or_else(|| CoreError::Unavailable(format!("corrupt proof state: {}", state_str)))?;
    Ok(ActivityRecord {
        proof_id: row.get("proof_id"),
        wallet_address: row.get("wallet_address"),
        activity_type: row.get("activity_type"),
        title: row.get("title"),
        description: row.get("description"),
        source: row.get("source"),
        timestamp: row.get("timestamp"),
        score_impact: row.get::<i32, _>("score_impact").max(0) as u32,
        state,
        verifier: row.get("verifier"),
        tx_hash: row.get("tx_hash"),
        metadata: row.get("metadata"),
    })
}

fn request_from_row(row: &sqlx::postgres::PgRow) -> CoreResult<RequestRecord> {
    let status_str: String = row.get("status");
    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| CoreError::Unavailable(format!("corrupt request status: {}", status_str)))?;
    let type_str: String = row.get("request_type");
    let request_type = RequestType::parse(&type_str)
        .ok_or_else(|| CoreError::Unavailable(format!("corrupt request type: {}", type_str)))?;
    Ok(RequestRecord {
        request_id: row.get("request_id"),
        wallet_address: row.get("wallet_address"),
        request_type,
        status,
        proof_refs: row.get("proof_refs"),
        submitted_at: row.get("submitted_at"),
        reviewed_at: row.get("reviewed_at"),
        reviewer: row.get("reviewer"),
        comments: row.get("comments"),
    })
}

const ACTOR_COLUMNS: &str = "did, wallet_address, username, total, identity, contribution, \
     trust, social, engagement, score_updated_at, tier, social_accounts, created_at, updated_at";

const ACTIVITY_COLUMNS: &str = "proof_id, wallet_address, activity_type, title, description, \
     source, timestamp, score_impact, state, verifier, tx_hash, metadata";

const REQUEST_COLUMNS: &str = "request_id, wallet_address, request_type, status, proof_refs, \
     submitted_at, reviewed_at, reviewer, comments";

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> CoreResult<()> {
        info!("Initializing reputation store schema...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS actors (
                wallet_address VARCHAR(255) PRIMARY KEY,
                did VARCHAR(255) NOT NULL UNIQUE,
                username VARCHAR(255),
                total INTEGER NOT NULL DEFAULT 0,
                identity INTEGER NOT NULL DEFAULT 0,
                contribution INTEGER NOT NULL DEFAULT 0,
                trust INTEGER NOT NULL DEFAULT 0,
                social INTEGER NOT NULL DEFAULT 0,
                engagement INTEGER NOT NULL DEFAULT 0,
                score_updated_at TIMESTAMP WITH TIME ZONE,
                tier VARCHAR(20) NOT NULL DEFAULT 'unverified',
                social_accounts JSONB,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS activities (
                proof_id VARCHAR(255) PRIMARY KEY,
                wallet_address VARCHAR(255) NOT NULL REFERENCES actors(wallet_address),
                activity_type VARCHAR(64) NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                source TEXT NOT NULL,
                timestamp TIMESTAMP WITH TIME ZONE NOT NULL,
                score_impact INTEGER NOT NULL DEFAULT 0,
                state VARCHAR(20) NOT NULL DEFAULT 'pending',
                verifier VARCHAR(255),
                tx_hash VARCHAR(255),
                metadata JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verification_requests (
                request_id VARCHAR(255) PRIMARY KEY,
                wallet_address VARCHAR(255) NOT NULL REFERENCES actors(wallet_address),
                request_type VARCHAR(32) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                proof_refs TEXT[] NOT NULL DEFAULT '{}',
                submitted_at TIMESTAMP WITH TIME ZONE NOT NULL,
                reviewed_at TIMESTAMP WITH TIME ZONE,
                reviewer VARCHAR(255),
                comments TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_activities_actor_ts \
             ON activities(wallet_address, timestamp DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_requests_status \
             ON verification_requests(status, submitted_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        info!("Reputation store schema initialized");
        Ok(())
    }

    // Actors

    pub async fn insert_actor(&self, record: ActorRecord) -> CoreResult<()> {
        let social_json = record
            .social_accounts
            .as_ref()
            .and_then(|s| serde_json::to_value(s).ok());
        sqlx::query(
            r#"
            INSERT INTO actors
                (wallet_address, did, username, total, identity, contribution,
                 trust, social, engagement, score_updated_at, tier, social_accounts,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&record.wallet_address)
        .bind(&record.did)
        .bind(&record.username)
        .bind(record.score.total as i32)
        .bind(record.score.identity as i32)
        .bind(record.score.contribution as i32)
        .bind(record.score.trust as i32)
        .bind(record.score.social as i32)
        .bind(record.score.engagement as i32)
        .bind(record.score_updated_at)
        .bind(record.tier.as_str())
        .bind(social_json)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err(e, "actor", &record.wallet_address))?;

        debug!(wallet = %record.wallet_address, "Actor inserted");
        Ok(())
    }

    pub async fn find_actor_by_wallet(&self, wallet: &str) -> CoreResult<Option<ActorRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM actors WHERE wallet_address = $1",
            ACTOR_COLUMNS
        ))
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(actor_from_row).transpose()
    }

    pub async fn find_actor_by_did(&self, did: &str) -> CoreResult<Option<ActorRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM actors WHERE did = $1",
            ACTOR_COLUMNS
        ))
        .bind(did)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(actor_from_row).transpose()
    }

    pub async fn update_actor_score(
        &self,
        wallet: &str,
        score: ReputationScore,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE actors
            SET total = $2, identity = $3, contribution = $4, trust = $5,
                social = $6, engagement = $7, score_updated_at = $8, updated_at = $8
            WHERE wallet_address = $1
            "#,
        )
        .bind(wallet)
        .bind(score.total as i32)
        .bind(score.identity as i32)
        .bind(score.contribution as i32)
        .bind(score.trust as i32)
        .bind(score.social as i32)
        .bind(score.engagement as i32)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("actor", wallet));
        }
        Ok(())
    }

    pub async fn update_actor_username(
        &self,
        wallet: &str,
        username: &str,
    ) -> CoreResult<ActorRecord> {
        let row = sqlx::query(&format!(
            "UPDATE actors SET username = $2, updated_at = NOW() \
             WHERE wallet_address = $1 RETURNING {}",
            ACTOR_COLUMNS
        ))
        .bind(wallet)
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        match row {
            Some(row) => actor_from_row(&row),
            None => Err(CoreError::not_found("actor", wallet)),
        }
    }

    /// Monotonic tier promotion: the UPDATE only matches while the current
    /// tier ranks strictly below `next`, so a concurrent higher promotion
    /// is never clobbered.
    pub async fn promote_actor_tier(
        &self,
        wallet: &str,
        next: VerificationTier,
    ) -> CoreResult<ActorRecord> {
        let lower: Vec<String> = next.lower_tiers().iter().map(|s| s.to_string()).collect();
        sqlx::query(
            "UPDATE actors SET tier = $2, updated_at = NOW() \
             WHERE wallet_address = $1 AND tier = ANY($3)",
        )
        .bind(wallet)
        .bind(next.as_str())
        .bind(&lower)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        self.find_actor_by_wallet(wallet)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", wallet))
    }

    // Activities

    pub async fn insert_activity(&self, record: ActivityRecord) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO activities
                (proof_id, wallet_address, activity_type, title, description,
                 source, timestamp, score_impact, state, verifier, tx_hash, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(&record.proof_id)
        .bind(&record.wallet_address)
        .bind(&record.activity_type)
        .bind(&record.title)
        .bind(&record.description)
        .bind(&record.source)
        .bind(record.timestamp)
        .bind(record.score_impact as i32)
        .bind(record.state.as_str())
        .bind(&record.verifier)
        .bind(&record.tx_hash)
        .bind(&record.metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err(e, "proof", &record.proof_id))?;

        debug!(proof_id = %record.proof_id, "Activity inserted");
        Ok(())
    }

    pub async fn get_activity(&self, proof_id: &str) -> CoreResult<Option<ActivityRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM activities WHERE proof_id = $1",
            ACTIVITY_COLUMNS
        ))
        .bind(proof_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(activity_from_row).transpose()
    }

    pub async fn list_activities(
        &self,
        wallet: &str,
        filter: &ActivityFilter,
    ) -> CoreResult<Vec<ActivityRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM activities \
             WHERE wallet_address = $1 AND ($2::text IS NULL OR state = $2) \
             ORDER BY timestamp DESC, proof_id ASC LIMIT $3 OFFSET $4",
            ACTIVITY_COLUMNS
        ))
        .bind(wallet)
        .bind(filter.state.map(|s| s.as_str().to_string()))
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(activity_from_row).collect()
    }

    pub async fn list_verified_activities(&self, wallet: &str) -> CoreResult<Vec<ActivityRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM activities WHERE wallet_address = $1 AND state = 'verified'",
            ACTIVITY_COLUMNS
        ))
        .bind(wallet)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(activity_from_row).collect()
    }

    pub async fn activity_index(&self, wallet: &str, proof_id: &str) -> CoreResult<Option<u64>> {
        let row = sqlx::query(
            r#"
            SELECT idx FROM (
                SELECT proof_id, (ROW_NUMBER() OVER (ORDER BY timestamp ASC, proof_id ASC) - 1) AS idx
                FROM activities WHERE wallet_address = $1
            ) ordered WHERE proof_id = $2
            "#,
        )
        .bind(wallet)
        .bind(proof_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(row.map(|r| r.get::<i64, _>("idx").max(0) as u64))
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
        let row = sqlx::query(&format!(
            "UPDATE activities SET state = $2, verifier = $3 \
             WHERE proof_id = $1 AND state = 'pending' RETURNING {}",
            ACTIVITY_COLUMNS
        ))
        .bind(proof_id)
        .bind(to.as_str())
        .bind(verifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        if let Some(row) = row {
            return activity_from_row(&row);
        }

        // Lost the compare-and-set: distinguish a terminal record from a
        // missing one for the caller.
        match self.get_activity(proof_id).await? {
            Some(existing) => Err(CoreError::InvalidState(format!(
                "proof {} is already {}",
                proof_id,
                existing.state.as_str()
            ))),
            None => Err(CoreError::not_found("proof", proof_id)),
        }
    }

    // Verification requests

    pub async fn insert_request(&self, record: RequestRecord) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_requests
                (request_id, wallet_address, request_type, status, proof_refs,
                 submitted_at, reviewed_at, reviewer, comments)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&record.request_id)
        .bind(&record.wallet_address)
        .bind(record.request_type.as_str())
        .bind(record.status.as_str())
        .bind(&record.proof_refs)
        .bind(record.submitted_at)
        .bind(record.reviewed_at)
        .bind(&record.reviewer)
        .bind(&record.comments)
        .execute(&self.pool)
        .await
        .map_err(|e| insert_err(e, "request", &record.request_id))?;

        debug!(request_id = %record.request_id, "Verification request inserted");
        Ok(())
    }

    pub async fn get_request(&self, request_id: &str) -> CoreResult<Option<RequestRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM verification_requests WHERE request_id = $1",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(request_from_row).transpose()
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> CoreResult<Vec<RequestRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM verification_requests \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::text IS NULL OR request_type = $2) \
               AND ($3::text IS NULL OR wallet_address = $3) \
             ORDER BY submitted_at DESC LIMIT $4",
            REQUEST_COLUMNS
        ))
        .bind(filter.status.map(|s| s.as_str().to_string()))
        .bind(filter.request_type.map(|t| t.as_str().to_string()))
        .bind(filter.actor.clone())
        .bind(filter.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(request_from_row).collect()
    }

    pub async fn review_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        reviewer: &str,
        comments: Option<&str>,
    ) -> CoreResult<RequestRecord> {
        let row = sqlx::query(&format!(
            "UPDATE verification_requests \
             SET status = $2, reviewed_at = NOW(), reviewer = $3, comments = $4 \
             WHERE request_id = $1 AND status = 'pending' RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(request_id)
        .bind(status.as_str())
        .bind(reviewer)
        .bind(comments)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        if let Some(row) = row {
            return request_from_row(&row);
        }

        match self.get_request(request_id).await? {
            Some(existing) => Err(CoreError::InvalidState(format!(
                "request {} is already {}",
                request_id,
                existing.status.as_str()
            ))),
            None => Err(CoreError::not_found("request", request_id)),
        }
    }

    // Aggregates

    pub async fn service_stats(&self) -> CoreResult<ServiceStats> {
        let actors: i64 = sqlx::query("SELECT COUNT(*) AS n FROM actors")
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?
            .get("n");

        let verified_actors: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM actors WHERE tier IN ('verified', 'premium')")
                .fetch_one(&self.pool)
                .await
                .map_err(store_err)?
                .get("n");

        let completed_tasks: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM activities WHERE activity_type = 'krnl_task_completed'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .get("n");

        let verified_points: i64 = sqlx::query(
            "SELECT COALESCE(SUM(score_impact), 0) AS n FROM activities WHERE state = 'verified'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?
        .get("n");

        Ok(ServiceStats {
            actors: actors.max(0) as u64,
            verified_actors: verified_actors.max(0) as u64,
            completed_tasks: completed_tasks.max(0) as u64,
            verified_points: verified_points.max(0) as u64,
        })
    }
}

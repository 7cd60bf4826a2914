//! Record types persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ReputationScore;

/// Coarse trust level. Promotion is monotonic and request-type-gated; there
/// is no demotion path through the verification workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationTier {
    Unverified,
    Basic,
    Verified,
    Premium,
}

impl VerificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationTier::Unverified => "unverified",
            VerificationTier::Basic => "basic",
            VerificationTier::Verified => "verified",
            VerificationTier::Premium => "premium",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unverified" => Some(VerificationTier::Unverified),
            "basic" => Some(VerificationTier::Basic),
            "verified" => Some(VerificationTier::Verified),
            "premium" => Some(VerificationTier::Premium),
            _ => None,
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            VerificationTier::Unverified => 0,
            VerificationTier::Basic => 1,
            VerificationTier::Verified => 2,
            VerificationTier::Premium => 3,
        }
    }

    /// Tiers strictly below `self`, used as the compare-and-set predicate
    /// for monotonic promotion.
    pub fn lower_tiers(&self) -> Vec<&'static str> {
        [
            VerificationTier::Unverified,
            VerificationTier::Basic,
            VerificationTier::Verified,
            VerificationTier::Premium,
        ]
        .iter()
        .filter(|t| t.rank() < self.rank())
        .map(|t| t.as_str())
        .collect()
    }
}

/// Verification state of an activity proof. `Pending` is the only state a
/// transition may start from; `Verified` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofState {
    Pending,
    Verified,
    Rejected,
}

impl ProofState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofState::Pending => "pending",
            ProofState::Verified => "verified",
            ProofState::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ProofState::Pending),
            "verified" => Some(ProofState::Verified),
            "rejected" => Some(ProofState::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Identity,
    Skill,
    Project,
    KrnlContract,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Identity => "identity",
            RequestType::Skill => "skill",
            RequestType::Project => "project",
            RequestType::KrnlContract => "krnl_contract",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "identity" => Some(RequestType::Identity),
            "skill" => Some(RequestType::Skill),
            "project" => Some(RequestType::Project),
            "krnl_contract" => Some(RequestType::KrnlContract),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialAccounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

/// A wallet-identified developer or organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRecord {
    pub did: String,
    /// Lowercase-normalized, unique.
    pub wallet_address: String,
    pub username: Option<String>,
    /// Off-chain cached score; the on-chain value wins on read when present.
    pub score: ReputationScore,
    pub score_updated_at: Option<DateTime<Utc>>,
    pub tier: VerificationTier,
    pub social_accounts: Option<SocialAccounts>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A claimed, independently checkable unit of work or credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Caller-supplied, globally unique.
    pub proof_id: String,
    /// Owning actor, by normalized wallet address.
    pub wallet_address: String,
    /// Stored as a plain string so unknown kinds survive submission.
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub source: String,
    pub timestamp: DateTime<Utc>,
    /// Contribution in [0, 100].
    pub score_impact: u32,
    pub state: ProofState,
    pub verifier: Option<String>,
    pub tx_hash: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// A request to upgrade an actor's trust tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: String,
    pub wallet_address: String,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub proof_refs: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewer: Option<String>,
    pub comments: Option<String>,
}

/// Pagination + state filter for activity listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityFilter {
    pub state: Option<ProofState>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ActivityFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 500)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Filter for verification-request listings.
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    /// Wallet address or DID.
    pub actor: Option<String>,
    pub limit: Option<i64>,
}

impl RequestFilter {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 500)
    }
}

/// Aggregate counters surfaced by the stats endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ServiceStats {
    pub actors: u64,
    pub verified_actors: u64,
    pub completed_tasks: u64,
    pub verified_points: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(VerificationTier::Basic.rank() > VerificationTier::Unverified.rank());
        assert!(VerificationTier::Premium.rank() > VerificationTier::Verified.rank());
        assert_eq!(
            VerificationTier::Verified.lower_tiers(),
            vec!["unverified", "basic"]
        );
    }

    #[test]
    fn test_enum_round_trips() {
        for tier in ["unverified", "basic", "verified", "premium"] {
            assert_eq!(VerificationTier::parse(tier).map(|t| t.as_str()), Some(tier));
        }
        for state in ["pending", "verified", "rejected"] {
            assert_eq!(ProofState::parse(state).map(|s| s.as_str()), Some(state));
        }
        for ty in ["identity", "skill", "project", "krnl_contract"] {
            assert_eq!(RequestType::parse(ty).map(|t| t.as_str()), Some(ty));
        }
        assert_eq!(VerificationTier::parse("platinum"), None);
    }
}

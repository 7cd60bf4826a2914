//! Score computation: type→bucket partitioning, clamping, weighted total.

use serde::{Deserialize, Serialize};

/// Version string baked into every score attestation. Bump whenever the
/// bucket map or [`ScoreWeights`] change so issued proofs stay auditable.
pub const ENGINE_VERSION: &str = "score-engine/1.0.0";

/// Per-bucket ceiling. A bucket fed by many small proofs saturates here.
pub const MAX_BUCKET_SCORE: u32 = 100;

/// Semantic bucket an activity kind contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    Identity,
    Contribution,
    Trust,
    Social,
    Engagement,
}

/// Known activity kinds. Activity records store the kind as a plain string
/// so unknown/new kinds can be submitted without breaking scoring; anything
/// [`ActivityKind::parse`] does not recognize simply contributes to no
/// bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    GithubCommit,
    GithubPr,
    GithubIssue,
    KrnlTaskCompleted,
    KrnlTaskCreated,
    DaoVote,
    DaoProposal,
    Transaction,
    Certification,
    CourseCompletion,
    Endorsement,
    Verification,
    BountyCompleted,
    Audit,
    EventAttendance,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::GithubCommit => "github_commit",
            ActivityKind::GithubPr => "github_pr",
            ActivityKind::GithubIssue => "github_issue",
            ActivityKind::KrnlTaskCompleted => "krnl_task_completed",
            ActivityKind::KrnlTaskCreated => "krnl_task_created",
            ActivityKind::DaoVote => "dao_vote",
            ActivityKind::DaoProposal => "dao_proposal",
            ActivityKind::Transaction => "transaction",
            ActivityKind::Certification => "certification",
            ActivityKind::CourseCompletion => "course_completion",
            ActivityKind::Endorsement => "endorsement",
            ActivityKind::Verification => "verification",
            ActivityKind::BountyCompleted => "bounty_completed",
            ActivityKind::Audit => "audit",
            ActivityKind::EventAttendance => "event_attendance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "github_commit" => Some(ActivityKind::GithubCommit),
            "github_pr" => Some(ActivityKind::GithubPr),
            "github_issue" => Some(ActivityKind::GithubIssue),
            "krnl_task_completed" => Some(ActivityKind::KrnlTaskCompleted),
            "krnl_task_created" => Some(ActivityKind::KrnlTaskCreated),
            "dao_vote" => Some(ActivityKind::DaoVote),
            "dao_proposal" => Some(ActivityKind::DaoProposal),
            "transaction" => Some(ActivityKind::Transaction),
            "certification" => Some(ActivityKind::Certification),
            "course_completion" => Some(ActivityKind::CourseCompletion),
            "endorsement" => Some(ActivityKind::Endorsement),
            "verification" => Some(ActivityKind::Verification),
            "bounty_completed" => Some(ActivityKind::BountyCompleted),
            "audit" => Some(ActivityKind::Audit),
            "event_attendance" => Some(ActivityKind::EventAttendance),
            _ => None,
        }
    }

    /// Authoritative type→bucket map. `github_issue` counts as contribution
    /// only; `krnl_task_created` and `transaction` are recorded but carry no
    /// score weight.
    pub fn bucket(&self) -> Option<ScoreBucket> {
        match self {
            ActivityKind::Verification | ActivityKind::Certification => {
                Some(ScoreBucket::Identity)
            }
            ActivityKind::GithubCommit
            | ActivityKind::GithubPr
            | ActivityKind::GithubIssue
            | ActivityKind::KrnlTaskCompleted
            | ActivityKind::BountyCompleted => Some(ScoreBucket::Contribution),
            ActivityKind::Endorsement | ActivityKind::DaoVote | ActivityKind::Audit => {
                Some(ScoreBucket::Trust)
            }
            ActivityKind::DaoProposal => Some(ScoreBucket::Social),
            ActivityKind::CourseCompletion | ActivityKind::EventAttendance => {
                Some(ScoreBucket::Engagement)
            }
            ActivityKind::KrnlTaskCreated | ActivityKind::Transaction => None,
        }
    }
}

/// Fixed bucket weights, summing to 1.0. Serialized into attestation
/// payloads so independent verifiers can recompute the total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub identity: f64,
    pub contribution: f64,
    pub trust: f64,
    pub social: f64,
    pub engagement: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            identity: 0.25,
            contribution: 0.35,
            trust: 0.20,
            social: 0.10,
            engagement: 0.10,
        }
    }
}

impl ScoreWeights {
    pub fn total_of(&self, s: &ReputationScore) -> u32 {
        (s.identity as f64 * self.identity
            + s.contribution as f64 * self.contribution
            + s.trust as f64 * self.trust
            + s.social as f64 * self.social
            + s.engagement as f64 * self.engagement)
            .round() as u32
    }
}

/// Five sub-scores, each clamped to [0, 100], plus the derived total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReputationScore {
    pub total: u32,
    pub identity: u32,
    pub contribution: u32,
    pub trust: u32,
    pub social: u32,
    pub engagement: u32,
}

/// Map a set of verified proofs to a reputation score.
///
/// Pure and order-independent: re-running with the same verified set always
/// yields the same score. Input items are `(activity_kind, score_impact)`;
/// unknown kinds and kinds without a bucket are silently ignored.
pub fn compute_score<'a, I>(verified: I) -> ReputationScore
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let mut identity: u64 = 0;
    let mut contribution: u64 = 0;
    let mut trust: u64 = 0;
    let mut social: u64 = 0;
    let mut engagement: u64 = 0;

    for (kind, impact) in verified {
        let Some(kind) = ActivityKind::parse(kind) else {
            continue;
        };
        match kind.bucket() {
            Some(ScoreBucket::Identity) => identity += impact as u64,
            Some(ScoreBucket::Contribution) => contribution += impact as u64,
            Some(ScoreBucket::Trust) => trust += impact as u64,
            Some(ScoreBucket::Social) => social += impact as u64,
            Some(ScoreBucket::Engagement) => engagement += impact as u64,
            None => {}
        }
    }

    let clamp = |sum: u64| sum.min(MAX_BUCKET_SCORE as u64) as u32;

    let mut score = ReputationScore {
        total: 0,
        identity: clamp(identity),
        contribution: clamp(contribution),
        trust: clamp(trust),
        social: clamp(social),
        engagement: clamp(engagement),
    };
    score.total = ScoreWeights::default().total_of(&score);
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proofs(items: &[(&'static str, u32)]) -> Vec<(&'static str, u32)> {
        items.to_vec()
    }

    #[test]
    fn test_empty_set_is_zero() {
        let score = compute_score(proofs(&[]));
        assert_eq!(score, ReputationScore::default());
    }

    #[test]
    fn test_weighted_total() {
        // identity=90, contribution=80, trust=75, social=70, engagement=65
        let score = compute_score(proofs(&[
            ("verification", 90),
            ("github_commit", 80),
            ("dao_vote", 75),
            ("dao_proposal", 70),
            ("course_completion", 65),
        ]));
        assert_eq!(score.identity, 90);
        assert_eq!(score.contribution, 80);
        assert_eq!(score.trust, 75);
        assert_eq!(score.social, 70);
        assert_eq!(score.engagement, 65);
        // round(22.5 + 28 + 15 + 7 + 6.5) = 79
        assert_eq!(score.total, 79);
    }

    #[test]
    fn test_bucket_saturates_at_ceiling() {
        let many: Vec<(&str, u32)> = (0..50).map(|_| ("github_commit", 10)).collect();
        let score = compute_score(many);
        assert_eq!(score.contribution, 100);
    }

    #[test]
    fn test_deterministic_and_order_independent() {
        let forward = proofs(&[("verification", 25), ("github_pr", 40), ("endorsement", 10)]);
        let mut reversed = forward.clone();
        reversed.reverse();
        assert_eq!(compute_score(forward.clone()), compute_score(forward));
        assert_eq!(
            compute_score(proofs(&[("verification", 25), ("github_pr", 40), ("endorsement", 10)])),
            compute_score(reversed)
        );
    }

    #[test]
    fn test_unknown_kind_is_ignored() {
        let score = compute_score(proofs(&[("solana_airdrop", 90), ("github_commit", 30)]));
        assert_eq!(score.contribution, 30);
        assert_eq!(score.identity, 0);
    }

    #[test]
    fn test_unweighted_kinds_carry_no_score() {
        let score = compute_score(proofs(&[("transaction", 50), ("krnl_task_created", 50)]));
        assert_eq!(score, ReputationScore::default());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = ScoreWeights::default();
        let sum = w.identity + w.contribution + w.trust + w.social + w.engagement;
        assert!((sum - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ActivityKind::GithubCommit,
            ActivityKind::KrnlTaskCompleted,
            ActivityKind::EventAttendance,
        ] {
            assert_eq!(ActivityKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ActivityKind::parse("not_a_kind"), None);
    }
}

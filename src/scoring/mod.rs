//! Reputation Scoring Engine
//!
//! Pure, deterministic mapping from a set of verified activity proofs to a
//! five-dimension reputation score plus weighted total.
//!
//! ## Score Model
//!
//! - Each verified proof contributes its impact to exactly one semantic
//!   bucket (identity, contribution, trust, social, engagement)
//! - Bucket sums saturate at 100 (ceiling, not normalization)
//! - `total = round(identity*0.25 + contribution*0.35 + trust*0.20 +
//!   social*0.10 + engagement*0.10)`
//! - Weights are versioned via [`ENGINE_VERSION`]; a re-weighting ships a
//!   new version string rather than rewriting history
//! - Pending and rejected proofs never contribute, and there is no
//!   unverify operation, so recomputation is monotonic per proof set

mod engine;

pub use engine::{
    compute_score, ActivityKind, ReputationScore, ScoreBucket, ScoreWeights, ENGINE_VERSION,
    MAX_BUCKET_SCORE,
};

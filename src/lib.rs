//! Repledger
//!
//! Reputation ledger service for wallet-identified developers: activity
//! proofs move through a pending/verified/rejected lifecycle, verified
//! proofs feed a weighted five-bucket score, and the cached score is
//! reconciled against an on-chain reputation contract.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Core error taxonomy
//! ├── scoring/       - Pure score computation
//! │   └── engine.rs     - Activity kinds, buckets, weights
//! ├── attestation.rs - Deterministic score proofs (hash + content address)
//! ├── store/         - Persistence (PostgreSQL with in-memory fallback)
//! │   ├── records.rs    - Actor, activity, request records
//! │   ├── memory.rs     - In-memory backend
//! │   └── postgres.rs   - sqlx backend
//! ├── ledger/        - Activity proof lifecycle + score recomputation
//! ├── workflow/      - Verification requests + tier promotion
//! ├── chain/         - On-chain integration
//! │   ├── client.rs     - Gateway HTTP client
//! │   ├── bridge.rs     - Fire-and-forget job queue
//! │   └── reconciler.rs - Score reconciliation + task batches
//! └── api/           - HTTP API endpoints
//!     ├── actors.rs       - Registration & lookup
//!     ├── activity.rs     - Proof submission & review
//!     ├── reputation.rs   - Scores, breakdowns, score proofs
//!     ├── verification.rs - Request workflow
//!     └── tasks.rs        - Task protocol completions
//! ```

pub mod api;
pub mod attestation;
pub mod chain;
pub mod config;
pub mod error;
pub mod ledger;
pub mod scoring;
pub mod store;
pub mod workflow;

// Re-export main types for convenience
pub use attestation::{create_score_proof, ScoreProofMeta};
pub use chain::{
    reconcile, ChainBridge, ChainConfig, ChainGatewayClient, ChainJob, ChainReconciler,
    OnChainScore, Reconciliation, ResolvedScore, ScoreSource, TaskCompletion, TaskResult,
};
pub use config::ServiceConfig;
pub use error::{CoreError, CoreResult};
pub use ledger::{ActivityLedger, ActivitySubmission};
pub use scoring::{
    compute_score, ActivityKind, ReputationScore, ScoreBucket, ScoreWeights, ENGINE_VERSION,
    MAX_BUCKET_SCORE,
};
pub use store::{
    ActivityFilter, ActivityRecord, ActorRecord, ProofState, RequestFilter, RequestRecord,
    RequestStatus, RequestType, ServiceStats, SocialAccounts, Store, StoreConfig,
    VerificationTier,
};
pub use workflow::{next_tier, RequestSubmission, VerificationWorkflow};

// Re-export API types
pub use api::{
    create_activity_router, create_actor_router, create_reputation_router, create_task_router,
    create_verification_router, ActivityApiState, ActorApiState, ReputationApiState,
    TaskApiState, VerificationApiState,
};

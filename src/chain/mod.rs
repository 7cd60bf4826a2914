//! On-chain integration: gateway client, fire-and-forget bridge, and
//! score reconciliation.

pub mod bridge;
pub mod client;
pub mod reconciler;

pub use bridge::{ChainBridge, ChainJob};
pub use client::{
    ActivityProofSubmission, ChainConfig, ChainGatewayClient, ChainReceipt, OnChainScore,
};
pub use reconciler::{
    reconcile, ChainReconciler, Reconciliation, ResolvedScore, ScoreSource, TaskCompletion,
    TaskResult,
};

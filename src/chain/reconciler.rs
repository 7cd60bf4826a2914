//! Reconciliation between on-chain and cached reputation scores.
//!
//! Reads prefer the contract when the gateway answers, and fall back to the
//! cached score silently otherwise. When both sides are visible, field-level
//! mismatches are detected and logged so drift is observable without ever
//! failing the read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::ledger::ActivityLedger;
use crate::scoring::ReputationScore;
use crate::store::{ActorRecord, Store};

use super::client::{ChainGatewayClient, OnChainScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    OnChain,
    Cached,
}

/// A score read together with where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedScore {
    pub score: ReputationScore,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: ScoreSource,
}

/// Outcome of comparing an on-chain score against the cached one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Match,
    Mismatch { fields: Vec<&'static str> },
}

/// Field-by-field comparison of contract state against the cache.
pub fn reconcile(on_chain: &OnChainScore, cached: &ReputationScore) -> Reconciliation {
    let mut fields = Vec::new();
    if on_chain.total != cached.total {
        fields.push("total");
    }
    if on_chain.identity != cached.identity {
        fields.push("identity");
    }
    if on_chain.contribution != cached.contribution {
        fields.push("contribution");
    }
    if on_chain.trust != cached.trust {
        fields.push("trust");
    }
    if on_chain.social != cached.social {
        fields.push("social");
    }
    if on_chain.engagement != cached.engagement {
        fields.push("engagement");
    }
    if fields.is_empty() {
        Reconciliation::Match
    } else {
        Reconciliation::Mismatch { fields }
    }
}

fn on_chain_to_score(on_chain: &OnChainScore) -> ReputationScore {
    ReputationScore {
        total: on_chain.total,
        identity: on_chain.identity,
        contribution: on_chain.contribution,
        trust: on_chain.trust,
        social: on_chain.social,
        engagement: on_chain.engagement,
    }
}

/// One task completion reported by the task protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskCompletion {
    pub task_id: String,
    /// Wallet address or DID of the actor credited with the task.
    pub actor: String,
    pub score_weight: u32,
}

/// Per-item outcome of a batch submission.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub task_id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ChainReconciler {
    store: Arc<Store>,
    client: Arc<ChainGatewayClient>,
    ledger: Arc<ActivityLedger>,
}

impl ChainReconciler {
    pub fn new(
        store: Arc<Store>,
        client: Arc<ChainGatewayClient>,
        ledger: Arc<ActivityLedger>,
    ) -> Self {
        Self {
            store,
            client,
            ledger,
        }
    }

    /// Resolve an actor and read their score, preferring the contract.
    pub async fn read_score(&self, identifier: &str) -> CoreResult<(ActorRecord, ResolvedScore)> {
        let actor = self
            .store
            .resolve_actor(identifier)
            .await?
            .ok_or_else(|| CoreError::not_found("actor", identifier))?;

        if self.client.is_configured() {
            match self.client.get_reputation_score(&actor.wallet_address).await {
                Ok(Some(on_chain)) => {
                    match reconcile(&on_chain, &actor.score) {
                        Reconciliation::Match => {
                            debug!(wallet = %actor.wallet_address, "On-chain score matches cache")
                        }
                        Reconciliation::Mismatch { fields } => {
                            info!(wallet = %actor.wallet_address, ?fields,
                                  "On-chain score differs from cache")
                        }
                    }
                    let resolved = ResolvedScore {
                        score: on_chain_to_score(&on_chain),
                        last_updated: on_chain
                            .last_updated
                            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
                        source: ScoreSource::OnChain,
                    };
                    return Ok((actor, resolved));
                }
                Ok(None) => {
                    debug!(wallet = %actor.wallet_address, "No on-chain score, serving cache")
                }
                Err(e) => {
                    warn!(wallet = %actor.wallet_address, "Chain read failed, serving cache: {}", e)
                }
            }
        }

        let resolved = ResolvedScore {
            score: actor.score,
            last_updated: actor.score_updated_at,
            source: ScoreSource::Cached,
        };
        Ok((actor, resolved))
    }

    /// Apply a batch of task completions. Each item succeeds or fails on its
    /// own; a failing item never aborts the rest of the batch.
    pub async fn process_task_batch(&self, tasks: Vec<TaskCompletion>) -> Vec<TaskResult> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            let task_id = task.task_id.clone();
            match self
                .ledger
                .record_task_completion(&task.task_id, &task.actor, task.score_weight)
                .await
            {
                Ok(_) => results.push(TaskResult {
                    task_id,
                    status: "processed",
                    error: None,
                }),
                Err(e) => {
                    warn!(task_id = %task_id, "Task completion failed: {}", e);
                    results.push(TaskResult {
                        task_id,
                        status: "error",
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_chain(total: u32, identity: u32) -> OnChainScore {
        OnChainScore {
            address: "0xabc".to_string(),
            total,
            identity,
            contribution: 0,
            trust: 0,
            social: 0,
            engagement: 0,
            last_updated: None,
        }
    }

    #[test]
    fn identical_scores_reconcile_as_match() {
        let cached = ReputationScore {
            total: 10,
            identity: 40,
            ..Default::default()
        };
        assert_eq!(reconcile(&on_chain(10, 40), &cached), Reconciliation::Match);
    }

    #[test]
    fn mismatch_names_the_diverging_fields() {
        let cached = ReputationScore {
            total: 10,
            identity: 40,
            ..Default::default()
        };
        match reconcile(&on_chain(12, 40), &cached) {
            Reconciliation::Mismatch { fields } => assert_eq!(fields, vec!["total"]),
            other => panic!("expected mismatch, got {:?}", other),
        }
    }
}

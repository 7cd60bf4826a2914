//! HTTP client for the chain gateway.
//!
//! The gateway fronts the reputation contract: score reads, activity proof
//! submissions, on-chain verification, and task-completion recording. The
//! client can run unconfigured (no gateway URL), in which case every call
//! reports the gateway as unavailable and callers degrade to cached data.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub gateway_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub enabled: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://127.0.0.1:8545".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 100,
            enabled: false,
        }
    }
}

/// Reputation score as stored by the on-chain contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnChainScore {
    pub address: String,
    pub total: u32,
    pub identity: u32,
    pub contribution: u32,
    pub trust: u32,
    pub social: u32,
    pub engagement: u32,
    /// Unix timestamp of the contract's last score update, if any.
    pub last_updated: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReceipt {
    pub success: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityProofSubmission {
    pub address: String,
    pub proof_id: String,
    pub activity_type: String,
    pub score_impact: u32,
}

#[derive(Debug, Clone, Serialize)]
struct VerifyActivityBody<'a> {
    address: &'a str,
    activity_index: u64,
}

#[derive(Debug, Clone, Serialize)]
struct TaskCompletionBody<'a> {
    task_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct ChainGatewayClient {
    config: ChainConfig,
    http_client: Option<Client>,
}

impl ChainGatewayClient {
    pub fn new(config: ChainConfig) -> CoreResult<Self> {
        if !config.enabled || config.gateway_url.is_empty() {
            info!("Chain gateway disabled, on-chain operations will be skipped");
            return Ok(Self {
                config,
                http_client: None,
            });
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("repledger/1.0")
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                if !config.api_key.is_empty() {
                    if let Ok(val) = reqwest::header::HeaderValue::from_str(&config.api_key) {
                        headers.insert("X-Api-Key", val);
                    }
                }
                headers
            })
            .build()
            .map_err(|e| CoreError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        info!(gateway = %config.gateway_url, "Chain gateway client initialized");
        Ok(Self {
            config,
            http_client: Some(http_client),
        })
    }

    pub fn disabled() -> Self {
        Self {
            config: ChainConfig::default(),
            http_client: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.http_client.is_some()
    }

    fn client(&self) -> CoreResult<&Client> {
        self.http_client
            .as_ref()
            .ok_or_else(|| CoreError::Unavailable("chain gateway is not configured".to_string()))
    }

    /// Read an actor's score from the contract. `None` means the contract
    /// has no entry for this address.
    pub async fn get_reputation_score(&self, address: &str) -> CoreResult<Option<OnChainScore>> {
        let client = self.client()?;
        let url = format!("{}/reputation/{}", self.config.gateway_url, address);

        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::Unavailable(format!("chain gateway unreachable: {}", e)))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CoreError::Unavailable(format!(
                "chain gateway returned status {}",
                resp.status()
            )));
        }

        let score: OnChainScore = resp
            .json()
            .await
            .map_err(|e| CoreError::Unavailable(format!("invalid score response: {}", e)))?;
        debug!(address = %address, total = score.total, "Fetched on-chain score");
        Ok(Some(score))
    }

    pub async fn submit_activity_proof(
        &self,
        submission: &ActivityProofSubmission,
    ) -> CoreResult<ChainReceipt> {
        let url = format!("{}/reputation/activity", self.config.gateway_url);

        info!(proof_id = %submission.proof_id, address = %submission.address,
              "Submitting activity proof to chain");

        let resp = self.retry_post(&url, submission).await?;
        let receipt: ChainReceipt = resp
            .json()
            .await
            .map_err(|e| CoreError::Unavailable(format!("invalid receipt response: {}", e)))?;

        if receipt.success {
            info!(proof_id = %submission.proof_id, tx = ?receipt.tx_hash, "Activity proof accepted");
        } else {
            warn!(proof_id = %submission.proof_id, error = ?receipt.error, "Activity proof rejected");
        }
        Ok(receipt)
    }

    /// Mark an activity verified on-chain. The contract addresses activities
    /// by their zero-based index in the actor's history.
    pub async fn verify_activity(&self, address: &str, index: u64) -> CoreResult<ChainReceipt> {
        let url = format!("{}/reputation/activity/verify", self.config.gateway_url);

        let body = VerifyActivityBody {
            address,
            activity_index: index,
        };
        let resp = self.retry_post(&url, &body).await?;
        let receipt: ChainReceipt = resp
            .json()
            .await
            .map_err(|e| CoreError::Unavailable(format!("invalid receipt response: {}", e)))?;

        if receipt.success {
            info!(address = %address, index, tx = ?receipt.tx_hash, "Activity verified on chain");
        } else {
            warn!(address = %address, index, error = ?receipt.error, "On-chain verification failed");
        }
        Ok(receipt)
    }

    pub async fn record_task_completion(&self, task_id: &str) -> CoreResult<ChainReceipt> {
        let url = format!("{}/tasks/complete", self.config.gateway_url);

        let body = TaskCompletionBody { task_id };
        let resp = self.retry_post(&url, &body).await?;
        let receipt: ChainReceipt = resp
            .json()
            .await
            .map_err(|e| CoreError::Unavailable(format!("invalid receipt response: {}", e)))?;

        if receipt.success {
            info!(task_id = %task_id, tx = ?receipt.tx_hash, "Task completion recorded on chain");
        } else {
            warn!(task_id = %task_id, error = ?receipt.error, "Task completion recording failed");
        }
        Ok(receipt)
    }

    async fn retry_post<T: Serialize>(&self, url: &str, body: &T) -> CoreResult<reqwest::Response> {
        let client = self.client()?;
        let mut attempts = 0;
        let max_retries = self.config.max_retries.max(1);
        let delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            attempts += 1;

            match client.post(url).json(body).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) if attempts < max_retries => {
                    debug!(
                        "Gateway request failed with status {}, retrying ({}/{})",
                        resp.status(),
                        attempts,
                        max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(resp) => {
                    return Err(CoreError::Unavailable(format!(
                        "gateway request failed after {} attempts with status {}",
                        max_retries,
                        resp.status()
                    )));
                }
                Err(e) if attempts < max_retries => {
                    debug!(
                        "Gateway request error: {}, retrying ({}/{})",
                        e, attempts, max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(CoreError::Unavailable(format!(
                        "gateway request failed after {} attempts: {}",
                        max_retries, e
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_disabled() {
        let config = ChainConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn disabled_client_reports_unconfigured() {
        let client = ChainGatewayClient::disabled();
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn disabled_client_fails_fast() {
        let client = ChainGatewayClient::disabled();
        let err = client.get_reputation_score("0xabc").await.unwrap_err();
        assert!(matches!(err, CoreError::Unavailable(_)));
    }
}

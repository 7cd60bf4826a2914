//! Fire-and-forget bridge between the ledger and the chain gateway.
//!
//! Ledger operations never wait on the chain: they enqueue a job and return.
//! A single worker task drains the queue and talks to the gateway; failures
//! are logged and dropped so a dead gateway never blocks request handling.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::{ActivityProofSubmission, ChainGatewayClient};

#[derive(Debug, Clone)]
pub enum ChainJob {
    SubmitProof(ActivityProofSubmission),
    VerifyActivity { address: String, proof_index: u64 },
    RecordTaskCompletion { task_id: String },
}

impl ChainJob {
    fn kind(&self) -> &'static str {
        match self {
            ChainJob::SubmitProof(_) => "submit_proof",
            ChainJob::VerifyActivity { .. } => "verify_activity",
            ChainJob::RecordTaskCompletion { .. } => "record_task_completion",
        }
    }
}

pub struct ChainBridge {
    sender: Option<mpsc::Sender<ChainJob>>,
}

impl ChainBridge {
    /// Spawn the worker task. When the client is unconfigured no worker is
    /// started and every enqueue becomes a no-op.
    pub fn start(client: ChainGatewayClient, queue_depth: usize) -> Self {
        if !client.is_configured() {
            info!("Chain bridge idle: gateway is not configured");
            return Self { sender: None };
        }

        let (sender, mut receiver) = mpsc::channel::<ChainJob>(queue_depth.max(1));
        tokio::spawn(async move {
            info!("Chain bridge worker started");
            while let Some(job) = receiver.recv().await {
                let job_id = Uuid::new_v4();
                let kind = job.kind();
                debug!(job_id = %job_id, kind, "Processing chain job");

                let result = match job {
                    ChainJob::SubmitProof(submission) => {
                        client.submit_activity_proof(&submission).await.map(|_| ())
                    }
                    ChainJob::VerifyActivity {
                        address,
                        proof_index,
                    } => client.verify_activity(&address, proof_index).await.map(|_| ()),
                    ChainJob::RecordTaskCompletion { task_id } => {
                        client.record_task_completion(&task_id).await.map(|_| ())
                    }
                };

                if let Err(e) = result {
                    warn!(job_id = %job_id, kind, "Chain job failed: {}", e);
                }
            }
            info!("Chain bridge worker stopped");
        });

        Self { sender: Some(sender) }
    }

    pub fn idle() -> Self {
        Self { sender: None }
    }

    pub fn is_active(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue a job without waiting. A full queue drops the job with a
    /// warning; the cached score remains the source of truth either way.
    pub fn enqueue(&self, job: ChainJob) {
        let Some(sender) = &self.sender else {
            debug!(kind = job.kind(), "Chain bridge idle, dropping job");
            return;
        };

        if let Err(e) = sender.try_send(job) {
            match e {
                mpsc::error::TrySendError::Full(job) => {
                    warn!(kind = job.kind(), "Chain job queue full, dropping job")
                }
                mpsc::error::TrySendError::Closed(job) => {
                    warn!(kind = job.kind(), "Chain bridge worker gone, dropping job")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_bridge_accepts_jobs_silently() {
        let bridge = ChainBridge::idle();
        assert!(!bridge.is_active());
        bridge.enqueue(ChainJob::RecordTaskCompletion {
            task_id: "task-1".to_string(),
        });
    }

    #[tokio::test]
    async fn unconfigured_client_yields_idle_bridge() {
        let bridge = ChainBridge::start(ChainGatewayClient::disabled(), 16);
        assert!(!bridge.is_active());
    }
}

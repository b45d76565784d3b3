//! Optimization JetStream processor
//!
//! Wraps the batch optimizer with JetStream for:
//! - Automatic backpressure
//! - Persistence across restarts
//! - Real-time status updates over NATS
//!
//! ## Streams
//! - `ENTREGA_OPTIMIZE_JOBS` - Batch optimization jobs

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use async_nats::jetstream::{self, Context as JsContext};
use async_nats::Client;
use futures::StreamExt;
use parking_lot::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::optimizer::BatchOptimizer;
use crate::types::{
    JobStatusUpdate, OptimizeBatchRequest, OptimizeJobStatus, OptimizeSubmitResponse,
    QueuedOptimizeJob,
};

// Stream and consumer names
const STREAM_NAME: &str = "ENTREGA_OPTIMIZE_JOBS";
const CONSUMER_NAME: &str = "optimize_workers";
const JOB_SUBJECT: &str = "entrega.jobs.optimize";
const STATUS_PREFIX: &str = "entrega.job.status";

// Delivery attempts per job before JetStream gives up on it
const MAX_DELIVER: i64 = 3;

// How many recent jobs keep a pollable status
const STATUS_HISTORY_LIMIT: usize = 1_000;

/// Last known status per job, bounded so a long-running worker does not
/// accumulate history forever. Oldest jobs fall off once the cap is hit.
struct StatusRegistry {
    entries: HashMap<Uuid, OptimizeJobStatus>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl StatusRegistry {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn insert(&mut self, job_id: Uuid, status: OptimizeJobStatus) {
        if self.entries.insert(job_id, status).is_none() {
            self.order.push_back(job_id);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    fn get(&self, job_id: &Uuid) -> Option<OptimizeJobStatus> {
        self.entries.get(job_id).cloned()
    }
}

/// Optimization job processor with JetStream integration
pub struct OptimizeProcessor {
    client: Client,
    js: JsContext,
    optimizer: BatchOptimizer,
    statuses: RwLock<StatusRegistry>,
}

impl OptimizeProcessor {
    /// Create a new processor, initializing the JetStream stream
    pub async fn new(client: Client, optimizer: BatchOptimizer) -> Result<Self> {
        let js = jetstream::new(client.clone());

        let stream_config = jetstream::stream::Config {
            name: STREAM_NAME.to_string(),
            subjects: vec![JOB_SUBJECT.to_string()],
            max_messages: 1_000,
            max_bytes: 10 * 1024 * 1024, // 10 MB
            retention: jetstream::stream::RetentionPolicy::WorkQueue,
            ..Default::default()
        };
        js.get_or_create_stream(stream_config).await?;
        info!("JetStream optimize stream '{}' ready", STREAM_NAME);

        Ok(Self {
            client,
            js,
            optimizer,
            statuses: RwLock::new(StatusRegistry::new(STATUS_HISTORY_LIMIT)),
        })
    }

    /// Validate, claim the batch, and enqueue an optimization job.
    ///
    /// The batch is claimed here, before the job enters the queue, so a
    /// second submission for the same batch fails fast with
    /// `ALREADY_OPTIMIZING` instead of queueing a duplicate.
    pub async fn submit_job(
        &self,
        request: OptimizeBatchRequest,
    ) -> Result<OptimizeSubmitResponse, crate::errors::OptimizeError> {
        self.optimizer
            .submit(request.batch_id, request.user_id, request.force)
            .await?;

        let job = QueuedOptimizeJob::new(request);
        let job_id = job.id;
        let batch_id = job.request.batch_id;

        // The batch is claimed by now; if the job cannot be enqueued the
        // batch must not stay in `optimizing` with nothing behind it
        if let Err(e) = self.enqueue(&job).await {
            warn!("Failed to enqueue optimize job {}: {:#}", job_id, e);
            self.optimizer.abandon(batch_id).await;
            return Err(crate::errors::OptimizeError::Internal(e));
        }

        info!("Optimize job {} submitted for batch {}", job_id, batch_id);

        // Best-effort: the job is already queued, a missed status update
        // is not worth failing the submit over
        if let Err(e) = self
            .publish_status(job_id, OptimizeJobStatus::Queued { position: 1 })
            .await
        {
            warn!("Failed to publish queued status for job {}: {:#}", job_id, e);
        }

        Ok(OptimizeSubmitResponse {
            job_id,
            batch_id,
            message: "Batch optimization job submitted".to_string(),
        })
    }

    async fn enqueue(&self, job: &QueuedOptimizeJob) -> Result<()> {
        let payload = serde_json::to_vec(job)?;
        self.js.publish(JOB_SUBJECT, payload.into()).await?.await?;
        Ok(())
    }

    /// Last known status of a job, if it passed through this worker
    pub fn job_status(&self, job_id: Uuid) -> Option<OptimizeJobStatus> {
        self.statuses.read().get(&job_id)
    }

    /// Publish a job status update and remember it for polling
    pub async fn publish_status(&self, job_id: Uuid, status: OptimizeJobStatus) -> Result<()> {
        self.statuses.write().insert(job_id, status.clone());

        let update = JobStatusUpdate::new(job_id, status);
        let subject = format!("{}.{}", STATUS_PREFIX, job_id);
        let payload = serde_json::to_vec(&update)?;

        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }

    /// Start processing optimization jobs from the queue
    pub async fn start_processing(self: Arc<Self>) -> Result<()> {
        let stream = self.js.get_stream(STREAM_NAME).await?;

        // Redelivery covers a worker crash or a message lost before ack;
        // terminal outcomes ack explicitly in process_job
        let consumer_config = jetstream::consumer::pull::Config {
            durable_name: Some(CONSUMER_NAME.to_string()),
            ack_policy: jetstream::consumer::AckPolicy::Explicit,
            max_deliver: MAX_DELIVER,
            ..Default::default()
        };

        let consumer = stream
            .get_or_create_consumer(CONSUMER_NAME, consumer_config)
            .await?;
        info!("JetStream optimize consumer '{}' ready", CONSUMER_NAME);

        let mut messages = consumer.messages().await?;

        while let Some(msg) = messages.next().await {
            match msg {
                Ok(msg) => {
                    let processor = Arc::clone(&self);

                    // Sequential: one solve at a time keeps the solver's
                    // wall-clock budget meaningful
                    if let Err(e) = processor.process_job(msg).await {
                        error!("Failed to process optimize job: {}", e);
                    }
                }
                Err(e) => {
                    error!("Error receiving optimize message: {}", e);
                }
            }
        }

        Ok(())
    }

    /// Process a single optimization job
    async fn process_job(&self, msg: jetstream::Message) -> Result<()> {
        let job: QueuedOptimizeJob = serde_json::from_slice(&msg.payload)?;
        let job_id = job.id;
        let batch_id = job.request.batch_id;

        info!("Processing optimize job {} for batch {}", job_id, batch_id);

        // Status publishes are best-effort throughout: a NATS hiccup must
        // not stop the run or leave the batch in `optimizing`
        if let Err(e) = self
            .publish_status(
                job_id,
                OptimizeJobStatus::Processing {
                    message: format!("Optimizing batch {}...", batch_id),
                },
            )
            .await
        {
            warn!("Failed to publish processing status for job {}: {:#}", job_id, e);
        }

        match self.optimizer.run(batch_id, job.request.user_id).await {
            Ok(summary) => {
                if let Err(e) = self
                    .publish_status(job_id, OptimizeJobStatus::Succeeded { result: summary })
                    .await
                {
                    warn!("Failed to publish succeeded status for job {}: {:#}", job_id, e);
                }

                if let Err(e) = msg.ack().await {
                    error!("Failed to ack optimize job {}: {:?}", job_id, e);
                }

                info!("Optimize job {} completed for batch {}", job_id, batch_id);
            }
            Err(e) => {
                warn!("Optimize job {} failed: {}", job_id, e);

                if let Err(publish_err) = self
                    .publish_status(
                        job_id,
                        OptimizeJobStatus::Failed {
                            code: e.code().to_string(),
                            error: e.to_string(),
                        },
                    )
                    .await
                {
                    warn!(
                        "Failed to publish failed status for job {}: {:#}",
                        job_id, publish_err
                    );
                }

                // The batch already left `optimizing`; ack so the job is
                // not redelivered against a failed batch
                if let Err(e) = msg.ack().await {
                    error!("Failed to ack failed optimize job {}: {:?}", job_id, e);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_name() {
        assert_eq!(STREAM_NAME, "ENTREGA_OPTIMIZE_JOBS");
    }

    #[test]
    fn test_subject_names() {
        assert_eq!(JOB_SUBJECT, "entrega.jobs.optimize");
        assert!(STATUS_PREFIX.starts_with("entrega.job.status"));
    }

    #[test]
    fn test_jobs_are_redelivered_after_a_crash() {
        assert_eq!(MAX_DELIVER, 3);
    }

    #[test]
    fn test_status_registry_evicts_oldest_when_full() {
        let mut registry = StatusRegistry::new(2);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let third = Uuid::new_v4();

        registry.insert(first, OptimizeJobStatus::Queued { position: 1 });
        registry.insert(second, OptimizeJobStatus::Queued { position: 2 });
        registry.insert(third, OptimizeJobStatus::Queued { position: 3 });

        assert!(registry.get(&first).is_none());
        assert!(registry.get(&second).is_some());
        assert!(registry.get(&third).is_some());
    }

    #[test]
    fn test_status_registry_updates_do_not_evict() {
        let mut registry = StatusRegistry::new(2);
        let job = Uuid::new_v4();
        let other = Uuid::new_v4();

        registry.insert(job, OptimizeJobStatus::Queued { position: 1 });
        registry.insert(
            job,
            OptimizeJobStatus::Processing { message: "working".to_string() },
        );
        registry.insert(other, OptimizeJobStatus::Queued { position: 1 });

        assert!(matches!(
            registry.get(&job),
            Some(OptimizeJobStatus::Processing { .. })
        ));
        assert!(registry.get(&other).is_some());
    }
}

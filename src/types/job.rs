//! Job queue types for async optimization processing
//!
//! These types support the JetStream-based job queue that runs batch
//! optimizations off the request path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::route::OptimizationSummary;

/// Request to optimize a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeBatchRequest {
    pub batch_id: Uuid,
    pub user_id: Uuid,
    /// Re-optimize a batch that is already `ready`, overwriting its routes
    #[serde(default)]
    pub force: bool,
}

/// Response when an optimization job is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeSubmitResponse {
    pub job_id: Uuid,
    pub batch_id: Uuid,
    pub message: String,
}

/// Request to poll a job's status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusRequest {
    pub job_id: Uuid,
}

/// Status of an optimization job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OptimizeJobStatus {
    /// Job is waiting in queue
    #[serde(rename_all = "camelCase")]
    Queued { position: u32 },
    /// Job is being processed
    #[serde(rename_all = "camelCase")]
    Processing { message: String },
    /// Job completed and routes were persisted
    #[serde(rename_all = "camelCase")]
    Succeeded { result: OptimizationSummary },
    /// Job failed; the batch was marked `failed`
    #[serde(rename_all = "camelCase")]
    Failed { code: String, error: String },
}

impl OptimizeJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OptimizeJobStatus::Succeeded { .. } | OptimizeJobStatus::Failed { .. })
    }
}

/// A status update message published to the job status subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusUpdate {
    pub job_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: OptimizeJobStatus,
}

impl JobStatusUpdate {
    pub fn new(job_id: Uuid, status: OptimizeJobStatus) -> Self {
        Self {
            job_id,
            timestamp: Utc::now(),
            status,
        }
    }
}

/// An optimization job stored in the JetStream queue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedOptimizeJob {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub request: OptimizeBatchRequest,
}

impl QueuedOptimizeJob {
    pub fn new(request: OptimizeBatchRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            request,
        }
    }
}

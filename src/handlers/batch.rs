//! Batch optimization handlers
//!
//! Request/reply surface for submitting optimization jobs and polling
//! their status. The heavy lifting happens in the JetStream processor;
//! these handlers only validate, enqueue, and answer.

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::optimize_processor::OptimizeProcessor;
use crate::types::{
    ErrorResponse, JobStatusRequest, OptimizeBatchRequest, OptimizeJobStatus, Request,
    SuccessResponse,
};

/// Handle batch.optimize requests
pub async fn handle_optimize(
    client: Client,
    mut subscriber: Subscriber,
    processor: Arc<OptimizeProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<OptimizeBatchRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse batch optimize request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match processor.submit_job(request.payload).await {
            Ok(response) => {
                info!(
                    "Optimize job {} accepted for batch {}",
                    response.job_id, response.batch_id
                );
                let success = SuccessResponse::new(request.id, response);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            Err(e) => {
                error!("Failed to submit optimize job: {}", e);
                let error = ErrorResponse::new(request.id, e.code(), e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

/// Handle job.status poll requests
pub async fn handle_job_status(
    client: Client,
    mut subscriber: Subscriber,
    processor: Arc<OptimizeProcessor>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref r) => r.clone(),
            None => continue,
        };

        let request: Request<JobStatusRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse job status request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
                continue;
            }
        };

        match processor.job_status(request.payload.job_id) {
            Some(status) => {
                let success: SuccessResponse<OptimizeJobStatus> =
                    SuccessResponse::new(request.id, status);
                let _ = client.publish(reply, serde_json::to_vec(&success)?.into()).await;
            }
            None => {
                let error = ErrorResponse::new(
                    request.id,
                    "JOB_NOT_FOUND",
                    format!("no job with id {}", request.payload.job_id),
                );
                let _ = client.publish(reply, serde_json::to_vec(&error)?.into()).await;
            }
        }
    }

    Ok(())
}

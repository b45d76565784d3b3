//! NATS message handlers

pub mod batch;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use sqlx::PgPool;
use tokio::select;
use tracing::{error, info};

use crate::config::Config;
use crate::services::matrix::build_provider_chain;
use crate::services::optimize_processor::OptimizeProcessor;
use crate::services::optimizer::BatchOptimizer;

/// Start all message handlers
pub async fn start_handlers(client: Client, pool: PgPool, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    // Matrix provider chain: OSRM, then Google if a key is set, then the
    // geometric estimate
    let providers = Arc::new(build_provider_chain(config));

    let optimizer = BatchOptimizer::new(pool, Arc::clone(&providers), config.solver_budget);
    let processor = Arc::new(OptimizeProcessor::new(client.clone(), optimizer).await?);

    // Subscribe to all subjects
    let ping_sub = client.subscribe("entrega.ping").await?;
    let optimize_sub = client.subscribe("entrega.batch.optimize").await?;
    let job_status_sub = client.subscribe("entrega.job.status.get").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let client_optimize = client.clone();
    let client_job_status = client.clone();

    let processor_optimize = Arc::clone(&processor);
    let processor_job_status = Arc::clone(&processor);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let optimize_handle = tokio::spawn(async move {
        batch::handle_optimize(client_optimize, optimize_sub, processor_optimize).await
    });

    let job_status_handle = tokio::spawn(async move {
        batch::handle_job_status(client_job_status, job_status_sub, processor_job_status).await
    });

    // Start the JetStream job consumer
    let consumer_handle = tokio::spawn(async move {
        processor.start_processing().await
    });

    info!("All handlers started");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = optimize_handle => {
            error!("Batch optimize handler finished: {:?}", result);
        }
        result = job_status_handle => {
            error!("Job status handler finished: {:?}", result);
        }
        result = consumer_handle => {
            error!("Optimize job consumer finished: {:?}", result);
        }
    }

    Ok(())
}

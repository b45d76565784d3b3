//! Delivery batch queries

use anyhow::Result;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::errors::OptimizeError;
use crate::types::batch::{Batch, BatchStatus};
use crate::types::delivery::Delivery;

/// Get a batch by id
pub async fn get_batch(pool: &PgPool, batch_id: Uuid) -> Result<Option<Batch>> {
    let batch = sqlx::query_as::<_, Batch>(
        r#"
        SELECT
            id, user_id, name, delivery_date, depot_address,
            depot_lat, depot_lng, status::text,
            total_stops, total_distance_km, estimated_duration_minutes,
            optimized_at, created_at, updated_at
        FROM delivery_batches
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .fetch_optional(pool)
    .await?;

    Ok(batch)
}

/// Atomically claim a batch for optimization.
///
/// The guarded UPDATE only succeeds when the batch is in a claimable
/// state (draft or failed always, ready only with `force`), so exactly
/// one of two concurrent callers wins. The loser gets an error that
/// names the state it observed.
pub async fn claim_for_optimization(
    pool: &PgPool,
    batch_id: Uuid,
    force: bool,
) -> Result<(), OptimizeError> {
    let result = sqlx::query(
        r#"
        UPDATE delivery_batches
        SET status = 'optimizing', updated_at = NOW()
        WHERE id = $1
          AND (status IN ('draft', 'failed') OR (status = 'ready' AND $2))
        "#,
    )
    .bind(batch_id)
    .bind(force)
    .execute(pool)
    .await
    .map_err(OptimizeError::Persistence)?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // The claim lost; inspect the current state to report why
    let batch = get_batch(pool, batch_id).await?;
    match batch {
        None => Err(OptimizeError::BatchNotFound),
        Some(batch) => match batch.status() {
            Some(BatchStatus::Optimizing) => Err(OptimizeError::AlreadyOptimizing),
            // Claimable now means another caller won the race just above
            Some(status) if status.claimable(force) => Err(OptimizeError::AlreadyOptimizing),
            Some(BatchStatus::Ready) => Err(OptimizeError::PreconditionNotMet(
                "batch is already optimized; pass force to re-optimize".to_string(),
            )),
            _ => Err(OptimizeError::PreconditionNotMet(format!(
                "batch in status '{}' cannot be optimized",
                batch.status
            ))),
        },
    }
}

/// Mark a batch as failed. Best-effort: called on error paths, so a
/// persistence failure here is logged rather than propagated.
pub async fn mark_failed(pool: &PgPool, batch_id: Uuid) {
    let result = sqlx::query(
        "UPDATE delivery_batches SET status = 'failed', updated_at = NOW() WHERE id = $1",
    )
    .bind(batch_id)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!("Failed to mark batch {} as failed: {}", batch_id, e);
    }
}

/// Pending deliveries of a batch, in creation order
pub async fn get_pending_deliveries(pool: &PgPool, batch_id: Uuid) -> Result<Vec<Delivery>> {
    let deliveries = sqlx::query_as::<_, Delivery>(
        r#"
        SELECT
            id, batch_id, customer_id, address, lat, lng, weight,
            earliest_time, latest_time, status::text, created_at
        FROM deliveries
        WHERE batch_id = $1 AND status = 'pending'
        ORDER BY created_at, id
        "#,
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    Ok(deliveries)
}

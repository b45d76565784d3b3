//! Route persistence queries

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::route::RouteRecord;

/// Replace a batch's routes with a freshly optimized set, in one
/// transaction.
///
/// Deletes any routes from a previous optimization, inserts the new
/// routes and stops, flips the routed deliveries to `assigned`, and
/// marks the batch `ready` with its new totals. Either all of it lands
/// or none of it does.
pub async fn replace_batch_routes(
    pool: &PgPool,
    batch_id: Uuid,
    delivery_date: chrono::NaiveDate,
    routes: &[RouteRecord],
    total_distance_km: f64,
    estimated_duration_minutes: i32,
    optimized_at: DateTime<Utc>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM route_stops
        WHERE route_id IN (SELECT id FROM routes WHERE batch_id = $1)
        "#,
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM routes WHERE batch_id = $1")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

    // Re-optimization may leave previously assigned deliveries out of
    // the new routes; reset everything non-terminal back to pending first
    sqlx::query(
        r#"
        UPDATE deliveries SET status = 'pending'
        WHERE batch_id = $1 AND status = 'assigned'
        "#,
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;

    for route in routes {
        let route_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO routes (
                id, batch_id, vehicle_id, driver_id, route_order, date,
                total_distance_km, estimated_duration_minutes, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'planned', NOW(), NOW())
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(route.vehicle_id)
        .bind(route.driver_id)
        .bind(route.route_order)
        .bind(delivery_date)
        .bind(route.total_distance_km)
        .bind(route.estimated_duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        for stop in &route.stops {
            sqlx::query(
                r#"
                INSERT INTO route_stops (id, route_id, delivery_id, stop_order, created_at)
                VALUES ($1, $2, $3, $4, NOW())
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(route_id)
            .bind(stop.delivery_id)
            .bind(stop.stop_order)
            .execute(&mut *tx)
            .await?;

            sqlx::query("UPDATE deliveries SET status = 'assigned' WHERE id = $1")
                .bind(stop.delivery_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query(
        r#"
        UPDATE delivery_batches
        SET status = 'ready',
            total_distance_km = $2,
            estimated_duration_minutes = $3,
            optimized_at = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(batch_id)
    .bind(total_distance_km)
    .bind(estimated_duration_minutes)
    .bind(optimized_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

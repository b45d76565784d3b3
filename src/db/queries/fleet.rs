//! Fleet queries

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::fleet::{Driver, Vehicle};

/// Active vehicles for a tenant, in creation order.
///
/// Creation order keeps the round-robin route assignment stable across
/// re-optimizations of the same batch.
pub async fn get_active_vehicles(pool: &PgPool, user_id: Uuid) -> Result<Vec<Vehicle>> {
    let vehicles = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, user_id, name, capacity_weight, capacity_volume,
               max_stops, is_active, created_at
        FROM vehicles
        WHERE user_id = $1 AND is_active = TRUE
        ORDER BY created_at, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(vehicles)
}

/// Active drivers for a tenant, in creation order
pub async fn get_active_drivers(pool: &PgPool, user_id: Uuid) -> Result<Vec<Driver>> {
    let drivers = sqlx::query_as::<_, Driver>(
        r#"
        SELECT id, user_id, name, phone, is_active, created_at
        FROM drivers
        WHERE user_id = $1 AND is_active = TRUE
        ORDER BY created_at, id
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(drivers)
}

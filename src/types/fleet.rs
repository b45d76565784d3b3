//! Fleet entities - vehicles and drivers owned by a tenant
//!
//! The optimizer reads these, it never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Vehicle entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Capacity in kg
    pub capacity_weight: Option<f64>,
    /// Capacity in m³
    pub capacity_volume: Option<f64>,
    pub max_stops: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Driver entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

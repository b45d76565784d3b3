//! Delivery batch entity and its status state machine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle status of a delivery batch.
///
/// The optimization core drives `draft → optimizing → {ready | failed}`.
/// `ready → in_progress → completed` is driven by dispatch events outside
/// this worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Draft,
    Optimizing,
    Ready,
    InProgress,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Draft => "draft",
            BatchStatus::Optimizing => "optimizing",
            BatchStatus::Ready => "ready",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(BatchStatus::Draft),
            "optimizing" => Some(BatchStatus::Optimizing),
            "ready" => Some(BatchStatus::Ready),
            "in_progress" => Some(BatchStatus::InProgress),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }

    /// Statuses from which an optimize request may claim the batch.
    /// `ready` requires the explicit force flag; `failed` batches are
    /// always re-optimizable.
    pub fn claimable(&self, force: bool) -> bool {
        match self {
            BatchStatus::Draft | BatchStatus::Failed => true,
            BatchStatus::Ready => force,
            _ => false,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery batch - a date-scoped set of deliveries routed together
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub delivery_date: NaiveDate,
    pub depot_address: String,
    pub depot_lat: Option<f64>,
    pub depot_lng: Option<f64>,
    pub status: String,
    pub total_stops: i32,
    pub total_distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
    pub optimized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn status(&self) -> Option<BatchStatus> {
        BatchStatus::parse(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["draft", "optimizing", "ready", "in_progress", "completed", "failed"] {
            let status = BatchStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(BatchStatus::parse("bogus").is_none());
    }

    #[test]
    fn test_draft_is_claimable_without_force() {
        assert!(BatchStatus::Draft.claimable(false));
        assert!(BatchStatus::Failed.claimable(false));
    }

    #[test]
    fn test_ready_requires_force() {
        assert!(!BatchStatus::Ready.claimable(false));
        assert!(BatchStatus::Ready.claimable(true));
    }

    #[test]
    fn test_terminal_and_active_states_never_claimable() {
        for status in [BatchStatus::Optimizing, BatchStatus::InProgress, BatchStatus::Completed] {
            assert!(!status.claimable(false));
            assert!(!status.claimable(true));
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&BatchStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}

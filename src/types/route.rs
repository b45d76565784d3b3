//! Persisted route record types
//!
//! Wire shapes for routes written by the optimization workflow and read
//! back by the frontend.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted route for one vehicle within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub route_order: i32,
    pub vehicle_id: Uuid,
    pub driver_id: Uuid,
    pub total_distance_km: f64,
    pub estimated_duration_minutes: i32,
    pub status: String,
    pub stops: Vec<StopRecord>,
}

/// A persisted stop within a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRecord {
    pub delivery_id: Uuid,
    /// 1-based position in the route, depot excluded
    pub stop_order: i32,
}

/// Summary of one optimization run, reported through job status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationSummary {
    pub batch_id: Uuid,
    pub routes: Vec<RouteRecord>,
    pub total_distance_km: f64,
    pub estimated_duration_minutes: i32,
    pub feasible: bool,
    /// Deliveries that could not be fitted into any route
    pub unassigned_delivery_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_record_serializes_camel_case() {
        let record = RouteRecord {
            route_order: 1,
            vehicle_id: Uuid::nil(),
            driver_id: Uuid::nil(),
            total_distance_km: 12.4,
            estimated_duration_minutes: 58,
            status: "planned".to_string(),
            stops: vec![StopRecord { delivery_id: Uuid::nil(), stop_order: 1 }],
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"routeOrder\":1"));
        assert!(json.contains("\"totalDistanceKm\":12.4"));
        assert!(json.contains("\"estimatedDurationMinutes\":58"));
        assert!(json.contains("\"stopOrder\":1"));
    }

    #[test]
    fn test_summary_reports_unassigned() {
        let summary = OptimizationSummary {
            batch_id: Uuid::nil(),
            routes: vec![],
            total_distance_km: 0.0,
            estimated_duration_minutes: 0,
            feasible: false,
            unassigned_delivery_ids: vec![Uuid::new_v4()],
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"feasible\":false"));
        assert!(json.contains("unassignedDeliveryIds"));
    }
}

//! Delivery entity - one stop to be routed within a batch

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single delivery within a batch
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub customer_id: Uuid,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Package weight in kg
    pub weight: Option<f64>,
    /// Earliest acceptable arrival
    pub earliest_time: Option<NaiveTime>,
    /// Latest acceptable arrival
    pub latest_time: Option<NaiveTime>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Delivery {
    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }

    /// Time window in minutes-of-day, if both bounds are set and ordered.
    /// A window with `earliest > latest` is a data entry error and is
    /// ignored rather than making the whole batch infeasible.
    pub fn window_minutes(&self) -> Option<(u32, u32)> {
        match (self.earliest_time, self.latest_time) {
            (Some(earliest), Some(latest)) if earliest <= latest => {
                Some((minutes_of_day(earliest), minutes_of_day(latest)))
            }
            _ => None,
        }
    }
}

fn minutes_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_delivery(earliest: Option<NaiveTime>, latest: Option<NaiveTime>) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            batch_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            address: "Av. Winston Churchill 25".to_string(),
            lat: Some(18.47),
            lng: Some(-69.94),
            weight: Some(4.5),
            earliest_time: earliest,
            latest_time: latest,
            status: "pending".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_window_minutes_converts_both_bounds() {
        let d = make_delivery(
            NaiveTime::from_hms_opt(9, 30, 0),
            NaiveTime::from_hms_opt(12, 0, 0),
        );
        assert_eq!(d.window_minutes(), Some((570, 720)));
    }

    #[test]
    fn test_window_minutes_none_when_partial() {
        let d = make_delivery(NaiveTime::from_hms_opt(9, 0, 0), None);
        assert_eq!(d.window_minutes(), None);
    }

    #[test]
    fn test_window_minutes_rejects_inverted_window() {
        let d = make_delivery(
            NaiveTime::from_hms_opt(14, 0, 0),
            NaiveTime::from_hms_opt(10, 0, 0),
        );
        assert_eq!(d.window_minutes(), None);
    }

    #[test]
    fn test_has_coordinates() {
        let mut d = make_delivery(None, None);
        assert!(d.has_coordinates());
        d.lng = None;
        assert!(!d.has_coordinates());
    }
}

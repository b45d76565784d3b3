//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.3;

/// Average urban delivery speed in km/h for time estimation
pub const AVERAGE_SPEED_KMH: f64 = 35.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Estimated road distance between two points in meters
pub fn estimated_road_meters(from: &Coordinates, to: &Coordinates) -> u64 {
    (haversine_distance(from, to) * ROAD_COEFFICIENT * 1000.0).round() as u64
}

/// Estimated travel time between two points in seconds
pub fn estimated_travel_seconds(from: &Coordinates, to: &Coordinates) -> u64 {
    let road_km = haversine_distance(from, to) * ROAD_COEFFICIENT;
    (road_km / AVERAGE_SPEED_KMH * 3600.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn santo_domingo() -> Coordinates {
        Coordinates { lat: 18.4861, lng: -69.9312 }
    }

    fn santiago() -> Coordinates {
        Coordinates { lat: 19.4517, lng: -70.6970 }
    }

    #[test]
    fn test_haversine_santo_domingo_santiago() {
        let distance = haversine_distance(&santo_domingo(), &santiago());
        // Santo Domingo to Santiago is roughly 135 km straight line
        assert!((distance - 135.0).abs() < 10.0, "got {} km", distance);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let point = santo_domingo();
        assert!(haversine_distance(&point, &point) < 0.001);
    }

    #[test]
    fn test_road_estimate_applies_coefficient() {
        let straight_m = haversine_distance(&santo_domingo(), &santiago()) * 1000.0;
        let road_m = estimated_road_meters(&santo_domingo(), &santiago()) as f64;
        assert!((road_m / straight_m - ROAD_COEFFICIENT).abs() < 0.01);
    }

    #[test]
    fn test_travel_time_is_positive_and_reasonable() {
        let seconds = estimated_travel_seconds(&santo_domingo(), &santiago());
        // ~175 road km at 35 km/h is about 5 hours
        assert!(seconds > 4 * 3600 && seconds < 7 * 3600, "got {} s", seconds);
    }
}

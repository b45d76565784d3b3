//! Google Distance Matrix API client
//!
//! Paid strategy, only enabled when an API key is configured.
//! https://developers.google.com/maps/documentation/distance-matrix

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DistanceMatrix, MatrixProvider};
use crate::types::Coordinates;

const API_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Google Distance Matrix client configuration
#[derive(Debug, Clone)]
pub struct GoogleMatrixConfig {
    pub api_key: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl GoogleMatrixConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timeout_seconds: 15,
        }
    }
}

/// Google Distance Matrix client
pub struct GoogleMatrixClient {
    client: Client,
    config: GoogleMatrixConfig,
}

impl GoogleMatrixClient {
    pub fn new(config: GoogleMatrixConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn format_points(points: &[Coordinates]) -> String {
        points
            .iter()
            .map(|c| format!("{},{}", c.lat, c.lng))
            .collect::<Vec<_>>()
            .join("|")
    }
}

#[async_trait]
impl MatrixProvider for GoogleMatrixClient {
    async fn get_matrix(&self, points: &[Coordinates]) -> Result<DistanceMatrix> {
        let n = points.len();
        if n == 0 {
            return Ok(DistanceMatrix::zeroed(0));
        }

        let formatted = Self::format_points(points);
        debug!("Requesting distance matrix from Google for {} locations", n);

        let response = self
            .client
            .get(API_URL)
            .query(&[
                ("origins", formatted.as_str()),
                ("destinations", formatted.as_str()),
                ("units", "metric"),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to Google Distance Matrix")?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Google Distance Matrix returned HTTP {}", status);
        }

        let body: MatrixResponse = response
            .json()
            .await
            .context("Failed to parse Google Distance Matrix response")?;

        if body.status != "OK" {
            anyhow::bail!("Google Distance Matrix request rejected: {}", body.status);
        }

        if body.rows.len() != n {
            anyhow::bail!("Google returned {} rows for {} origins", body.rows.len(), n);
        }

        let mut matrix = DistanceMatrix::zeroed(n);
        for (i, row) in body.rows.iter().enumerate() {
            if row.elements.len() != n {
                anyhow::bail!("Google returned a ragged row at index {}", i);
            }
            for (j, element) in row.elements.iter().enumerate() {
                if element.status != "OK" {
                    anyhow::bail!(
                        "Google has no route for pair {} -> {}: {}",
                        i,
                        j,
                        element.status
                    );
                }
                let distance = element
                    .distance
                    .as_ref()
                    .context("element missing distance")?;
                let duration = element
                    .duration
                    .as_ref()
                    .context("element missing duration")?;

                // distance.value is meters, duration.value is seconds
                matrix.distances[i][j] = distance.value;
                matrix.durations[i][j] = duration.value;
            }
        }

        debug!("Received distance matrix from Google: {}x{}", n, n);
        Ok(matrix)
    }

    fn name(&self) -> &str {
        "GoogleDistanceMatrix"
    }
}

// Google API types

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_points_uses_lat_lng_order() {
        let points = vec![
            Coordinates { lat: 18.4861, lng: -69.9312 },
            Coordinates { lat: 18.5001, lng: -69.85 },
        ];
        assert_eq!(
            GoogleMatrixClient::format_points(&points),
            "18.4861,-69.9312|18.5001,-69.85"
        );
    }

    #[test]
    fn test_matrix_response_parses_element_values() {
        let json = r#"{
            "status": "OK",
            "rows": [
                {"elements": [
                    {"status": "OK", "distance": {"value": 0}, "duration": {"value": 0}},
                    {"status": "OK", "distance": {"value": 5230}, "duration": {"value": 780}}
                ]},
                {"elements": [
                    {"status": "OK", "distance": {"value": 5410}, "duration": {"value": 800}},
                    {"status": "OK", "distance": {"value": 0}, "duration": {"value": 0}}
                ]}
            ]
        }"#;

        let body: MatrixResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.status, "OK");
        assert_eq!(body.rows[0].elements[1].distance.as_ref().unwrap().value, 5230);
    }

    #[test]
    fn test_matrix_element_parses_zero_results() {
        let json = r#"{"status": "ZERO_RESULTS"}"#;
        let element: MatrixElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.status, "ZERO_RESULTS");
        assert!(element.distance.is_none());
    }
}

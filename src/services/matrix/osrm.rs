//! OSRM table service client
//!
//! OSRM API documentation:
//! https://project-osrm.org/docs/v5.24.0/api/#table-service

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DistanceMatrix, MatrixProvider};
use crate::types::Coordinates;

/// OSRM client configuration
#[derive(Debug, Clone)]
pub struct OsrmConfig {
    /// Base URL of the OSRM server (e.g., "http://localhost:5000")
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl OsrmConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}

/// OSRM routing client
pub struct OsrmClient {
    client: Client,
    config: OsrmConfig,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Build the table request URL. OSRM expects `lng,lat` pairs joined
    /// with semicolons in the path.
    fn build_table_url(&self, points: &[Coordinates]) -> String {
        let coords = points
            .iter()
            .map(|c| format!("{},{}", c.lng, c.lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/driving/{}?annotations=distance,duration",
            self.config.base_url, coords
        )
    }
}

#[async_trait]
impl MatrixProvider for OsrmClient {
    async fn get_matrix(&self, points: &[Coordinates]) -> Result<DistanceMatrix> {
        let n = points.len();
        if n == 0 {
            return Ok(DistanceMatrix::zeroed(0));
        }

        let url = self.build_table_url(points);
        debug!("Requesting distance matrix from OSRM for {} locations", n);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send table request to OSRM")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("OSRM returned error {}: {}", status, body);
        }

        let table: TableResponse = response
            .json()
            .await
            .context("Failed to parse OSRM response")?;

        if table.code != "Ok" {
            anyhow::bail!("OSRM table request rejected: {}", table.code);
        }

        let distances = table
            .distances
            .context("OSRM response missing distances")?;
        let durations = table
            .durations
            .context("OSRM response missing durations")?;

        if distances.len() != n || durations.len() != n {
            anyhow::bail!(
                "OSRM returned {} rows for {} locations",
                distances.len().min(durations.len()),
                n
            );
        }

        let mut matrix = DistanceMatrix::zeroed(n);
        for i in 0..n {
            if distances[i].len() != n || durations[i].len() != n {
                anyhow::bail!("OSRM returned a ragged matrix row at index {}", i);
            }
            for j in 0..n {
                // null cells mean OSRM found no road between the pair;
                // partial coverage is a failed strategy
                let distance = distances[i][j]
                    .ok_or_else(|| anyhow::anyhow!("OSRM has no distance for pair {} -> {}", i, j))?;
                let duration = durations[i][j]
                    .ok_or_else(|| anyhow::anyhow!("OSRM has no duration for pair {} -> {}", i, j))?;

                // OSRM reports meters and seconds already
                matrix.distances[i][j] = distance.round() as u64;
                matrix.durations[i][j] = duration.round() as u64;
            }
        }

        debug!("Received distance matrix from OSRM: {}x{}", n, n);
        Ok(matrix)
    }

    fn name(&self) -> &str {
        "OSRM"
    }
}

// OSRM API types

#[derive(Debug, Deserialize)]
struct TableResponse {
    code: String,
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_osrm_config_default() {
        let config = OsrmConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.timeout_seconds, 30);
    }

    #[test]
    fn test_build_table_url_uses_lng_lat_order() {
        let client = OsrmClient::new(OsrmConfig::default());
        let points = vec![
            Coordinates { lat: 18.4861, lng: -69.9312 },
            Coordinates { lat: 18.5001, lng: -69.8500 },
        ];

        let url = client.build_table_url(&points);
        assert!(url.starts_with("http://localhost:5000/table/v1/driving/"));
        assert!(url.contains("-69.9312,18.4861;-69.85,18.5001"));
        assert!(url.ends_with("annotations=distance,duration"));
    }

    #[test]
    fn test_table_response_parses_null_cells() {
        let json = r#"{
            "code": "Ok",
            "distances": [[0.0, null], [1200.5, 0.0]],
            "durations": [[0.0, 90.0], [95.0, 0.0]]
        }"#;

        let table: TableResponse = serde_json::from_str(json).unwrap();
        assert_eq!(table.code, "Ok");
        assert_eq!(table.distances.unwrap()[0][1], None);
    }

    #[tokio::test]
    #[ignore = "Requires running OSRM server"]
    async fn test_osrm_integration_two_points() {
        let client = OsrmClient::new(OsrmConfig::new("http://localhost:5000"));
        let points = vec![
            Coordinates { lat: 18.4861, lng: -69.9312 },
            Coordinates { lat: 18.4682, lng: -69.9410 },
        ];

        let matrix = client.get_matrix(&points).await.unwrap();
        assert_eq!(matrix.size, 2);
        assert!(matrix.distance(0, 1) > 0);
    }
}

//! Distance/time matrix construction with provider fallback
//!
//! Providers are tried in a fixed priority order: OSRM (free routing graph),
//! Google Distance Matrix (paid, only when configured), then a haversine
//! estimate that always succeeds. A provider that times out, returns a
//! non-2xx response, or covers only part of the requested pairs is logged
//! and skipped; the call fails only when every provider fails.

mod google;
mod osrm;

pub use google::{GoogleMatrixClient, GoogleMatrixConfig};
pub use osrm::{OsrmClient, OsrmConfig};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::OptimizeError;
use crate::services::geo;
use crate::types::Coordinates;

/// Sentinel for pairs a provider reported as unreachable.
/// Large enough to dominate any real distance, small enough not to
/// overflow when summed along a route.
pub const UNREACHABLE: u64 = u64::MAX / 4;

/// Square distance/duration matrix over a list of locations.
/// Index 0 is the depot by convention. Not assumed symmetric.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    /// Distance in meters [from][to]
    pub distances: Vec<Vec<u64>>,
    /// Duration in seconds [from][to]
    pub durations: Vec<Vec<u64>>,
    /// Number of locations
    pub size: usize,
}

impl DistanceMatrix {
    pub fn zeroed(size: usize) -> Self {
        Self {
            distances: vec![vec![0; size]; size],
            durations: vec![vec![0; size]; size],
            size,
        }
    }

    pub fn distance(&self, from: usize, to: usize) -> u64 {
        self.distances[from][to]
    }

    pub fn duration(&self, from: usize, to: usize) -> u64 {
        self.durations[from][to]
    }

    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.distances[from][to] < UNREACHABLE && self.durations[from][to] < UNREACHABLE
    }

    /// Dimension check against the requested location count.
    pub fn is_complete_for(&self, n: usize) -> bool {
        self.size == n
            && self.distances.len() == n
            && self.durations.len() == n
            && self.distances.iter().all(|row| row.len() == n)
            && self.durations.iter().all(|row| row.len() == n)
    }
}

/// A distance matrix strategy
#[async_trait]
pub trait MatrixProvider: Send + Sync {
    /// Compute the full pairwise matrix for the given points.
    /// Implementations must either cover every pair or fail.
    async fn get_matrix(&self, points: &[Coordinates]) -> Result<DistanceMatrix>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Haversine-based estimate. Always succeeds; used as the last-resort
/// strategy so a network outage cannot fail the whole optimization.
pub struct HaversineProvider;

#[async_trait]
impl MatrixProvider for HaversineProvider {
    async fn get_matrix(&self, points: &[Coordinates]) -> Result<DistanceMatrix> {
        let n = points.len();
        let mut matrix = DistanceMatrix::zeroed(n);

        for i in 0..n {
            for j in 0..n {
                if i != j {
                    matrix.distances[i][j] = geo::estimated_road_meters(&points[i], &points[j]);
                    matrix.durations[i][j] = geo::estimated_travel_seconds(&points[i], &points[j]);
                }
            }
        }

        Ok(matrix)
    }

    fn name(&self) -> &str {
        "Haversine"
    }
}

/// Ordered fallback chain over matrix providers
pub struct ProviderChain {
    providers: Vec<Box<dyn MatrixProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn MatrixProvider>>) -> Self {
        Self { providers }
    }

    /// Try each provider in order until one returns a complete matrix.
    /// Individual provider failures are logged, never surfaced; only a
    /// fully exhausted chain fails.
    pub async fn get_matrix(&self, points: &[Coordinates]) -> Result<DistanceMatrix, OptimizeError> {
        for provider in &self.providers {
            debug!("Requesting {}x{} matrix from {}", points.len(), points.len(), provider.name());

            match provider.get_matrix(points).await {
                Ok(matrix) if matrix.is_complete_for(points.len()) => {
                    if provider.name() == "Haversine" {
                        warn!("Using haversine matrix estimate; routing accuracy is degraded");
                    }
                    return Ok(matrix);
                }
                Ok(matrix) => {
                    warn!(
                        "Provider {} returned a {}x{} matrix for {} locations, skipping",
                        provider.name(),
                        matrix.size,
                        matrix.size,
                        points.len()
                    );
                }
                Err(e) => {
                    warn!("Provider {} failed: {:#}", provider.name(), e);
                }
            }
        }

        Err(OptimizeError::MatrixUnavailable)
    }
}

/// Build the provider chain from configuration. Order is fixed:
/// OSRM, then Google if an API key is configured, then haversine.
pub fn build_provider_chain(config: &Config) -> ProviderChain {
    let mut providers: Vec<Box<dyn MatrixProvider>> = Vec::new();

    providers.push(Box::new(OsrmClient::new(OsrmConfig::new(&config.osrm_url))));

    if let Some(key) = &config.google_api_key {
        providers.push(Box::new(GoogleMatrixClient::new(GoogleMatrixConfig::new(key))));
    }

    providers.push(Box::new(HaversineProvider));

    ProviderChain::new(providers)
}

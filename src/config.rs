//! Configuration management

use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// OSRM table service URL
    pub osrm_url: String,

    /// Google Distance Matrix API key (optional, paid fallback)
    pub google_api_key: Option<String>,

    /// Wall-clock budget for the solver improvement phase
    pub solver_budget: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set")?;

        let osrm_url = std::env::var("OSRM_URL")
            .unwrap_or_else(|_| "http://localhost:5000".to_string());

        let google_api_key = std::env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let solver_budget_seconds = match std::env::var("SOLVER_BUDGET_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("SOLVER_BUDGET_SECONDS must be a positive integer")?,
            Err(_) => 30,
        };

        Ok(Self {
            nats_url,
            database_url,
            osrm_url,
            google_api_key,
            solver_budget: Duration::from_secs(solver_budget_seconds),
        })
    }
}

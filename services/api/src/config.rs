//! Service configuration: JSON file named by `IRL_API_CONFIG`, with
//! defaults for local development. `DATABASE_URL` overrides the config
//! field so deployments can keep credentials out of the file.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
    /// Postgres connection string. When absent the service runs on the
    /// in-memory ledger (dev mode).
    pub database_url: Option<String>,
    /// Max checkpoint check-ins per player per UTC day.
    pub max_checkins_per_day: i64,
    /// Points awarded per location check-in.
    pub location_points_value: i64,
    /// Default row count for the leaderboard endpoint.
    pub leaderboard_limit: i64,
    /// Checkpoints seeded into the in-memory ledger at startup.
    pub seed_checkpoints: Vec<SeedCheckpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCheckpoint {
    pub slug: String,
    pub name: String,
    pub chain: String,
    pub points_value: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            database_url: None,
            max_checkins_per_day: 10,
            location_points_value: 100,
            leaderboard_limit: 25,
            seed_checkpoints: vec![
                SeedCheckpoint {
                    slug: "hq-lobby".to_string(),
                    name: "HQ Lobby".to_string(),
                    chain: "evm".to_string(),
                    points_value: 100,
                },
                SeedCheckpoint {
                    slug: "popup-sol".to_string(),
                    name: "Pop-up Booth (Solana)".to_string(),
                    chain: "solana".to_string(),
                    points_value: 250,
                },
            ],
        }
    }
}

pub fn load_config() -> ApiConfig {
    let mut config = read_config_file();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            config.database_url = Some(url);
        }
    }
    config
}

fn read_config_file() -> ApiConfig {
    let path = std::env::var("IRL_API_CONFIG").unwrap_or_default();
    if !path.is_empty() {
        if let Ok(contents) = std::fs::read_to_string(&path) {
            if let Ok(config) = serde_json::from_str::<ApiConfig>(&contents) {
                return config;
            }
        }
        warn!("Failed to load config from {}, using defaults", path);
    }
    ApiConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let c = ApiConfig::default();
        assert_eq!(c.max_checkins_per_day, 10);
        assert_eq!(c.location_points_value, 100);
        assert!(!c.seed_checkpoints.is_empty());
    }
}

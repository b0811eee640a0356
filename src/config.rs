//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Shared key required on log ingestion. `None` leaves ingestion open.
    pub ingest_api_key: Option<String>,
    /// How often old logs are purged. Zero disables the sweeper.
    pub retention_sweep_interval: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: DEFAULT_PORT,
            ingest_api_key: None,
            retention_sweep_interval: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let sweep_secs = match env::var("RETENTION_SWEEP_INTERVAL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("RETENTION_SWEEP_INTERVAL_SECS", raw))?,
            Err(_) => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port,
            ingest_api_key: env::var("INGEST_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            retention_sweep_interval: Duration::from_secs(sweep_secs),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the environment mutations don't race each other.
    #[test]
    fn test_config_from_env() {
        env::set_var("PORT", "8081");
        env::set_var("INGEST_API_KEY", "  secret-key \n");
        env::set_var("RETENTION_SWEEP_INTERVAL_SECS", "60");

        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.port, 8081);
        assert_eq!(config.ingest_api_key.as_deref(), Some("secret-key"));
        assert_eq!(config.retention_sweep_interval, Duration::from_secs(60));

        env::set_var("INGEST_API_KEY", "   ");
        let config = Config::from_env().expect("Config should load");
        assert!(config.ingest_api_key.is_none());

        env::set_var("PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("PORT", _)));

        env::remove_var("PORT");
        env::remove_var("INGEST_API_KEY");
        env::remove_var("RETENTION_SWEEP_INTERVAL_SECS");
    }
}

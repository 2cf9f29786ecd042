use std::time::Duration;

use prism_orchestrator::PollConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Base URL of the generation provider.
    pub provider_base_url: String,
    /// API key sent with every provider request.
    pub provider_api_key: String,
    /// Delay between status polls, in seconds.
    pub poll_interval_secs: u64,
    /// Hard ceiling on poll attempts per task.
    pub poll_max_attempts: u32,
    /// Consecutive transport failures tolerated while polling.
    pub poll_transient_retries: u32,
    /// Task records retained in the in-memory index.
    pub history_capacity: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                    |
    /// |--------------------------|----------------------------|
    /// | `HOST`                   | `0.0.0.0`                  |
    /// | `PORT`                   | `3000`                     |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                       |
    /// | `PROVIDER_BASE_URL`      | `https://api.example.com`  |
    /// | `PROVIDER_API_KEY`       | (empty)                    |
    /// | `POLL_INTERVAL_SECS`     | `3`                        |
    /// | `POLL_MAX_ATTEMPTS`      | `200`                      |
    /// | `POLL_TRANSIENT_RETRIES` | `3`                        |
    /// | `HISTORY_CAPACITY`       | `50`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let provider_base_url =
            std::env::var("PROVIDER_BASE_URL").unwrap_or_else(|_| "https://api.example.com".into());

        let provider_api_key = std::env::var("PROVIDER_API_KEY").unwrap_or_default();

        let poll_interval_secs: u64 = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("POLL_INTERVAL_SECS must be a valid u64");

        let poll_max_attempts: u32 = std::env::var("POLL_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "200".into())
            .parse()
            .expect("POLL_MAX_ATTEMPTS must be a valid u32");

        let poll_transient_retries: u32 = std::env::var("POLL_TRANSIENT_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("POLL_TRANSIENT_RETRIES must be a valid u32");

        let history_capacity: usize = std::env::var("HISTORY_CAPACITY")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("HISTORY_CAPACITY must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            provider_base_url,
            provider_api_key,
            poll_interval_secs,
            poll_max_attempts,
            poll_transient_retries,
            history_capacity,
        }
    }

    /// Polling parameters derived from the environment.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
            transient_retries: self.poll_transient_retries,
        }
    }
}

//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; in-memory storage when unset
/// - `READY_DELAY_SECS` — delay before a paid order becomes `ready` (default: `300`)
/// - `DELIVERED_DELAY_SECS` — delay before a ready order becomes `delivered` (default: `600`)
/// - `JOB_POLL_INTERVAL_MS` — transition worker poll interval (default: `1000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub ready_delay_secs: i64,
    pub delivered_delay_secs: i64,
    pub job_poll_interval: Duration,
    pub log_level: String,
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parsed("PORT", 3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            ready_delay_secs: env_parsed("READY_DELAY_SECS", 300),
            delivered_delay_secs: env_parsed("DELIVERED_DELAY_SECS", 600),
            job_poll_interval: Duration::from_millis(env_parsed("JOB_POLL_INTERVAL_MS", 1000)),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            ready_delay_secs: 300,
            delivered_delay_secs: 600,
            job_poll_interval: Duration::from_millis(1000),
            log_level: "info".to_string(),
        }
    }
}

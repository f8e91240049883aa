//! Application configuration loaded from environment variables.

use std::time::Duration;

use choreography::{RetryPolicy, WorkerConfig};

/// Upper bound accepted for `CONSUMER_WORKERS`.
pub const MAX_CONSUMER_WORKERS: usize = 1024;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string (default: unset, in-memory stores)
/// - `CONSUMER_WORKERS` — concurrent messages per consumer, at most [`MAX_CONSUMER_WORKERS`] (default: `4`)
/// - `MAX_UPDATE_ATTEMPTS` — read-transition-write attempts on conflict (default: `3`)
/// - `PUBLISH_TIMEOUT_MS` — publish acknowledgement deadline (default: `5000`)
/// - `MAX_REDELIVERIES` — redeliveries of a failing message (default: `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub consumer_workers: usize,
    pub max_update_attempts: u32,
    pub publish_timeout: Duration,
    pub max_redeliveries: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            consumer_workers: parsed("CONSUMER_WORKERS")
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| (1..=MAX_CONSUMER_WORKERS).contains(n))
                .unwrap_or(defaults.consumer_workers),
            max_update_attempts: parsed("MAX_UPDATE_ATTEMPTS")
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_update_attempts),
            publish_timeout: parsed("PUBLISH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.publish_timeout),
            max_redeliveries: parsed("MAX_REDELIVERIES")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.max_redeliveries),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_update_attempts, RetryPolicy::default().backoff)
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            workers: self.consumer_workers,
            max_redeliveries: self.max_redeliveries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            consumer_workers: 4,
            max_update_attempts: 3,
            publish_timeout: Duration::from_millis(5000),
            max_redeliveries: 5,
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Context, Result};

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the resume API, without a trailing slash.
    pub backend_base: String,
    pub exports_dir: PathBuf,
    /// Sleep after an empty poll and after a failed iteration.
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let poll_ms = std::env::var("POLL_MS")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u64>()
            .context("POLL_MS must be a number of milliseconds")?;
        ensure!(poll_ms > 0, "POLL_MS must be greater than zero");

        let http_timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("HTTP_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Config {
            backend_base: std::env::var("BACKEND_BASE")
                .unwrap_or_else(|_| "http://localhost:4000".to_string())
                .trim_end_matches('/')
                .to_string(),
            exports_dir: std::env::var("EXPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("exports")),
            poll_interval: Duration::from_millis(poll_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

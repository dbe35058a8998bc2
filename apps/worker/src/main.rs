mod client;
mod config;
mod error;
mod poller;
mod render;

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::client::HttpJobApi;
use crate::config::Config;
use crate::poller::Poller;
use crate::render::MockPdfRenderer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting export worker v{} (backend: {}, poll every {}ms)",
        env!("CARGO_PKG_VERSION"),
        config.backend_base,
        config.poll_interval.as_millis()
    );

    let api = HttpJobApi::new(config.backend_base.clone(), config.http_timeout)?;
    let renderer = MockPdfRenderer::new(config.exports_dir.clone()).await?;
    info!("Writing exports to {}", renderer.exports_dir().display());
    let poller = Poller::new(Arc::new(api), Arc::new(renderer), config.poll_interval);

    poller.run(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping after the current job");
}

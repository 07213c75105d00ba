//! NIDS demo server binary
//!
//! Loads the intrusion classifier, then serves the web page, prediction API,
//! health check and Prometheus metrics until interrupted.

use anyhow::{Context, Result};
use nids_lib::pipeline::InferenceEngine;
use nids_lib::{ServingMetrics, StructuredLogger};
use nids_server::{api, config::ServerConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting nids-server");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        "Server configured"
    );

    let metrics = ServingMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // The server never starts without a model
    let start = Instant::now();
    let engine = match InferenceEngine::load(&config.model_path, config.model_sha256.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            error!(
                error = %e,
                path = %config.model_path.display(),
                "Model failed to load, refusing to start"
            );
            return Err(e).with_context(|| {
                format!("Failed to load model from {}", config.model_path.display())
            });
        }
    };
    if let Some(info) = engine.info() {
        metrics.set_model_info(info);
        logger.log_model_loaded(info, start.elapsed().as_millis());
    }

    let state = Arc::new(
        api::AppState::new(Arc::new(engine), metrics, logger.clone())
            .with_max_upload_bytes(config.max_upload_bytes),
    );

    let addr = config.listen_addr();
    logger.log_startup(SERVER_VERSION, &addr);

    let shutdown_logger = logger.clone();
    api::serve(&addr, state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down cleanly");
    Ok(())
}

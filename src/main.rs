//! mesh-harbor binary: runs one collection session against a node-table file
//! (the replay device) and the configured ingestion endpoint, until Ctrl-C.

use anyhow::{Context, Result};
use mesh_harbor::device::replay::ReplayDevice;
use mesh_harbor::error::StartError;
use mesh_harbor::{Session, SessionConfig};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the replay device re-reads its node-table file.
const REPLAY_REFRESH: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = SessionConfig::config_path();
    info!("loading configuration from {}", path.display());
    let config = SessionConfig::load(&path)
        .await
        .context("failed to load configuration")?;
    let device_port = config.device_port.clone();

    let mut session = Session::new(config).context("invalid session configuration")?;

    info!("connecting to device on {device_port}");
    let device = ReplayDevice::connect(&device_port, REPLAY_REFRESH)
        .await
        .map_err(StartError::Connection)?;
    session.start(Box::new(device))?;

    info!("collection running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    session.stop().await;
    if session.is_rate_limited() {
        info!("note: the endpoint reported rate limiting during this session");
    }
    Ok(())
}

//! File-backed device implementation.
//!
//! Serves a node table from a JSON file and re-reads it periodically, so the
//! pipeline can run end to end without mesh hardware. Real transports
//! implement the same [`DeviceLink`] seam; their connection and wire-protocol
//! handling live outside this crate.

use super::{DeviceLink, InboundPacket, SharedNodes};
use crate::model::NodeTable;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

pub struct ReplayDevice {
    nodes: SharedNodes,
    refresh_task: tokio::task::JoinHandle<()>,
    closed: bool,
}

impl ReplayDevice {
    /// Opens `path`, loads the node table, and keeps re-reading it every
    /// `refresh` so file edits show up in later collection cycles.
    pub async fn connect(path: impl Into<PathBuf>, refresh: Duration) -> Result<Self> {
        let path = path.into();
        let table = load_table(&path).await?;
        debug!(nodes = table.len(), path = %path.display(), "replay device connected");
        let nodes = Arc::new(Mutex::new(table));

        let refresh_nodes = nodes.clone();
        let refresh_task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(refresh).await;
                match load_table(&path).await {
                    Ok(table) => *refresh_nodes.lock() = table,
                    Err(e) => warn!("replay device refresh failed: {e:#}"),
                }
            }
        });

        Ok(Self { nodes, refresh_task, closed: false })
    }
}

async fn load_table(path: &Path) -> Result<NodeTable> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read node table from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("invalid node table in {}", path.display()))
}

impl DeviceLink for ReplayDevice {
    fn nodes(&self) -> SharedNodes {
        self.nodes.clone()
    }

    fn packets(&mut self) -> Option<mpsc::UnboundedReceiver<InboundPacket>> {
        // A file replay has no inbound packet stream.
        None
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.refresh_task.abort();
        debug!("replay device closed");
        Ok(())
    }
}

impl Drop for ReplayDevice {
    fn drop(&mut self) {
        self.refresh_task.abort();
    }
}

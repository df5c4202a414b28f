//! Collection loop: snapshot, extract, enqueue, on a fixed cadence.

use crate::config::SessionConfig;
use crate::device::NodeSnapshotStore;
use crate::extract;
use crate::model::DeliveryBatch;
use crate::sender::QueueMsg;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Interval waits happen in increments this long, re-checking the running
/// flag after each one, so a stop request is honored within a tick rather
/// than at the next full interval boundary.
const TICK: Duration = Duration::from_secs(1);

/// Pause after a failed cycle before retrying. One bad cycle never ends the
/// session.
const CYCLE_FAILURE_BACKOFF_SECS: u64 = 10;

pub async fn run(
    config: Arc<SessionConfig>,
    store: NodeSnapshotStore,
    queue: mpsc::UnboundedSender<QueueMsg>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match run_cycle(&config, &store, &queue, &running) {
            Ok(()) => {
                debug!(
                    secs = config.collection_interval_secs,
                    "collection cycle complete, waiting"
                );
                wait_ticks(config.collection_interval_secs, &running).await;
            }
            Err(e) => {
                error!("collection cycle failed: {e:#}");
                wait_ticks(CYCLE_FAILURE_BACKOFF_SECS, &running).await;
            }
        }
    }
    debug!("collection loop stopped");
}

fn run_cycle(
    config: &SessionConfig,
    store: &NodeSnapshotStore,
    queue: &mpsc::UnboundedSender<QueueMsg>,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    info!("starting collection cycle");
    let nodes = store.snapshot();
    if nodes.is_empty() {
        info!("no nodes visible this cycle");
        return Ok(());
    }

    debug!(nodes = nodes.len(), "processing snapshot");
    let mut queued = 0usize;
    for (node_id, node) in &nodes {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        let points = extract::extract(node_id, node, &config.categories);
        if points.is_empty() {
            continue;
        }
        debug!(node = %node_id, points = points.len(), "queueing batch");
        if queue.send(QueueMsg::Batch(DeliveryBatch { points })).is_err() {
            anyhow::bail!("delivery queue closed");
        }
        queued += 1;
    }
    info!(batches = queued, "collection cycle queued");
    Ok(())
}

async fn wait_ticks(secs: u64, running: &AtomicBool) {
    for _ in 0..secs {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(TICK).await;
    }
}

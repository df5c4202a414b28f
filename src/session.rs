//! Session lifecycle: wiring, start, and coordinated best-effort shutdown.

use crate::config::SessionConfig;
use crate::device::{DeviceLink, InboundPacket, NodeSnapshotStore};
use crate::error::{ConfigError, StartError};
use crate::scheduler;
use crate::sender::{QueueMsg, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lifecycle states of a collection session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
}

/// Bound on waiting for either loop to wind down. A task that does not
/// observe the stop within this window is abandoned rather than blocking
/// shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// One run of the collection-and-delivery pipeline, from start to stop.
///
/// Owns the running flag, both loop tasks, and the device handle. Transitions
/// are Idle -> Running -> Stopping -> Idle; `start` on a non-idle session and
/// `stop` on a non-running session are rejected as no-ops.
pub struct Session {
    config: Arc<SessionConfig>,
    state: SessionState,
    running: Arc<AtomicBool>,
    rate_limited: Arc<AtomicBool>,
    device: Option<Box<dyn DeviceLink>>,
    queue: Option<mpsc::UnboundedSender<QueueMsg>>,
    scheduler_task: Option<JoinHandle<()>>,
    sender_task: Option<JoinHandle<()>>,
    packet_task: Option<JoinHandle<()>>,
}

impl Session {
    /// Validates the configuration and prepares an idle session.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            state: SessionState::Idle,
            running: Arc::new(AtomicBool::new(false)),
            rate_limited: Arc::new(AtomicBool::new(false)),
            device: None,
            queue: None,
            scheduler_task: None,
            sender_task: None,
            packet_task: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Persistent rate-limit advisory for the operator layer. Set on any 429
    /// from the endpoint, never cleared while the session runs.
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::SeqCst)
    }

    /// Wires the pipeline onto an already-connected device and launches the
    /// collection and delivery loops.
    pub fn start(&mut self, mut device: Box<dyn DeviceLink>) -> Result<(), StartError> {
        if self.state != SessionState::Idle {
            return Err(StartError::AlreadyRunning);
        }
        info!("starting data collection");

        let sender = Sender::new(
            self.config.clone(),
            self.running.clone(),
            self.rate_limited.clone(),
        )
        .map_err(StartError::Connection)?;

        let store = NodeSnapshotStore::new(device.nodes());
        let (tx, rx) = mpsc::unbounded_channel();
        self.running.store(true, Ordering::SeqCst);
        self.rate_limited.store(false, Ordering::SeqCst);

        self.sender_task = Some(tokio::spawn(sender.run(rx)));
        self.scheduler_task = Some(tokio::spawn(scheduler::run(
            self.config.clone(),
            store,
            tx.clone(),
            self.running.clone(),
        )));
        if let Some(packets) = device.packets() {
            self.packet_task = Some(tokio::spawn(log_packets(packets)));
        }

        self.queue = Some(tx);
        self.device = Some(device);
        self.state = SessionState::Running;
        Ok(())
    }

    /// Cooperative, bounded-time shutdown: flag down, sentinel in, both loops
    /// joined under a timeout, device closed exactly once. Safe to call again
    /// once idle.
    pub async fn stop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        self.state = SessionState::Stopping;
        info!("stopping data collection");
        self.running.store(false, Ordering::SeqCst);

        if let Some(queue) = self.queue.take() {
            let _ = queue.send(QueueMsg::Shutdown);
        }
        if let Some(task) = self.sender_task.take() {
            join_bounded(task, "sender").await;
        }
        if let Some(task) = self.scheduler_task.take() {
            join_bounded(task, "scheduler").await;
        }
        if let Some(task) = self.packet_task.take() {
            task.abort();
        }
        if let Some(mut device) = self.device.take() {
            match device.close() {
                Ok(()) => info!("device interface closed"),
                Err(e) => warn!("error closing device interface: {e:#}"),
            }
        }

        self.state = SessionState::Idle;
        info!("data collection stopped");
    }
}

async fn join_bounded(task: JoinHandle<()>, name: &str) {
    match tokio::time::timeout(JOIN_TIMEOUT, task).await {
        Ok(Ok(())) => debug!("{name} task finished"),
        Ok(Err(e)) => warn!("{name} task panicked: {e}"),
        Err(_) => warn!("{name} task did not stop within {JOIN_TIMEOUT:?}, abandoning it"),
    }
}

/// Read-only logging of decoded inbound packets; not part of the data path.
async fn log_packets(mut packets: mpsc::UnboundedReceiver<InboundPacket>) {
    while let Some(packet) = packets.recv().await {
        info!(from = %packet.from, "received text: {}", packet.text);
    }
}

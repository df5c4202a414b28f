//! Delivery queue and the paced HTTP sender.
//!
//! Unbounded FIFO of per-node batches between the scheduler and the sender
//! task. Delivery is at-most-once per point: every failure path logs and
//! drops, nothing is retried, nothing is persisted.

use crate::config::SessionConfig;
use crate::model::{DataPoint, DeliveryBatch};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Messages carried by the delivery queue.
#[derive(Debug)]
pub enum QueueMsg {
    Batch(DeliveryBatch),
    /// Distinguished shutdown sentinel, pushed once by the stop sequence.
    Shutdown,
}

/// Dequeue wait bound, so the sender re-checks the running flag while idle.
const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Responses logged on hard failure are truncated to this many characters.
const BODY_LOG_LIMIT: usize = 200;

pub struct Sender {
    client: reqwest::Client,
    config: Arc<SessionConfig>,
    running: Arc<AtomicBool>,
    rate_limited: Arc<AtomicBool>,
}

impl Sender {
    pub fn new(
        config: Arc<SessionConfig>,
        running: Arc<AtomicBool>,
        rate_limited: Arc<AtomicBool>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, config, running, rate_limited })
    }

    /// Drains the queue until the shutdown sentinel arrives or the running
    /// flag drops. A batch interrupted by shutdown is abandoned; its
    /// remaining points are dropped.
    pub async fn run(self, mut queue: mpsc::UnboundedReceiver<QueueMsg>) {
        let delay = self.config.inter_request_delay();

        while self.running.load(Ordering::SeqCst) {
            let msg = match timeout(DEQUEUE_TIMEOUT, queue.recv()).await {
                Ok(Some(msg)) => msg,
                Ok(None) => break, // queue closed, scheduler side gone
                Err(_) => continue, // idle, re-check the running flag
            };
            let batch = match msg {
                QueueMsg::Batch(batch) => batch,
                QueueMsg::Shutdown => break,
            };

            for point in batch.points {
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.send_point(&point).await;
                tokio::time::sleep(delay).await;
            }
        }
        debug!("sender loop stopped");
    }

    /// Posts one point alone as the JSON body. 200 is success; 429 raises
    /// the persistent rate-limited advisory but the point still counts as
    /// handled; anything else drops the point with a diagnostic.
    async fn send_point(&self, point: &DataPoint) {
        debug!(node = %point.ship_id, metric = %point.cargo_id, "sending point");
        let response = self
            .client
            .post(&self.config.endpoint_url)
            .header("X-API-Key", &self.config.api_key)
            .json(point)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == StatusCode::OK => {
                info!(node = %point.ship_id, metric = %point.cargo_id, "point delivered");
            }
            Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                warn!(metric = %point.cargo_id, "rate limit exceeded (429)");
                self.rate_limited.store(true, Ordering::SeqCst);
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!(
                    metric = %point.cargo_id,
                    %status,
                    body = truncate(&body, BODY_LOG_LIMIT),
                    "failed to send point"
                );
            }
            Err(e) => {
                error!(metric = %point.cargo_id, "network error sending point: {e}");
            }
        }
    }
}

fn truncate(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

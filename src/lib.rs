//! Mesh radio telemetry collection and forwarding pipeline.
//!
//! Periodically snapshots the node table exposed by a mesh device interface,
//! flattens each node's metric groups into normalized `{time, ship_id,
//! cargo_id, value}` points, and forwards them one request at a time to a
//! Telemetry Harbor style ingestion endpoint, pacing deliveries and
//! surfacing the endpoint's rate-limit signal. Delivery is deliberately
//! at-most-once: failed points are logged and dropped, never retried.

pub mod config;
pub mod device;
pub mod error;
pub mod extract;
pub mod model;
pub mod scheduler;
pub mod sender;
pub mod session;

pub use config::{CategoryToggles, SessionConfig};
pub use error::{ConfigError, StartError};
pub use model::{Category, DataPoint, DeliveryBatch, MetricValue, NodeRecord, NodeTable};
pub use session::{Session, SessionState};

//! Device interface seam and the node snapshot store.
//!
//! The device interface owns the live node table and mutates it from its own
//! background path; everything the core reads goes through
//! [`NodeSnapshotStore`]'s copy-on-read contract, never a raw reference.

pub mod replay;

use crate::model::NodeTable;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared handle to the live node table owned by the device interface.
pub type SharedNodes = Arc<Mutex<NodeTable>>;

pub fn new_shared_nodes() -> SharedNodes {
    Arc::new(Mutex::new(NodeTable::new()))
}

/// A decoded inbound packet surfaced by the device interface. Log-only: not
/// part of the collection data path.
#[derive(Debug, Clone)]
pub struct InboundPacket {
    pub from: String,
    pub text: String,
}

/// The seam to the external device interface.
///
/// The core treats transports as opaque beyond this shape: a live node table
/// handle, an optional inbound-packet subscription, and a close operation the
/// shutdown sequence calls exactly once.
pub trait DeviceLink: Send {
    /// Handle to the live node table the device mutates in the background.
    fn nodes(&self) -> SharedNodes;

    /// Take-once subscription to decoded inbound packets, if the transport
    /// produces them.
    fn packets(&mut self) -> Option<mpsc::UnboundedReceiver<InboundPacket>>;

    /// Closes the underlying transport.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Thread-safe, consistent read of the live node table.
///
/// The lock is held only for the clone; copying dominates the cost and all
/// processing happens on the returned snapshot, which later device-side
/// mutation can never touch.
pub struct NodeSnapshotStore {
    nodes: SharedNodes,
}

impl NodeSnapshotStore {
    pub fn new(nodes: SharedNodes) -> Self {
        Self { nodes }
    }

    /// Full independent copy of the live table. An empty (or not yet
    /// populated) table yields an empty snapshot, not an error.
    pub fn snapshot(&self) -> NodeTable {
        self.nodes.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeRecord, NodeUser};

    #[test]
    fn snapshot_is_immune_to_later_mutation() {
        let shared = new_shared_nodes();
        shared.lock().insert(
            "!node1".into(),
            NodeRecord {
                user: Some(NodeUser { long_name: Some("Buoy-1".into()) }),
                ..Default::default()
            },
        );

        let store = NodeSnapshotStore::new(shared.clone());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);

        // Device-side update path keeps mutating after the copy.
        shared.lock().get_mut("!node1").unwrap().user = None;
        shared.lock().insert("!node2".into(), NodeRecord::default());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            snapshot["!node1"].series_label("!node1"),
            "Buoy-1",
            "snapshot must keep the state at copy time"
        );
    }

    #[test]
    fn empty_table_snapshots_to_empty() {
        let store = NodeSnapshotStore::new(new_shared_nodes());
        assert!(store.snapshot().is_empty());
    }
}

//! Core data shapes: the node record as the device interface reports it, and
//! the normalized point format the ingestion endpoint accepts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Live node table as exposed by the device interface, keyed by node id.
pub type NodeTable = HashMap<String, NodeRecord>;

/// Metric categories, in the fixed order extraction walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Position,
    DeviceMetrics,
    Environment,
    AirQuality,
    Power,
    PaxCounter,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Position,
        Category::DeviceMetrics,
        Category::Environment,
        Category::AirQuality,
        Category::Power,
        Category::PaxCounter,
    ];
}

/// User-assigned identity block of a node record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUser {
    #[serde(default)]
    pub long_name: Option<String>,
}

/// One node as reported by the device interface.
///
/// Owned and mutated by the device's background update path; the core only
/// ever sees cloned snapshots. Category sub-records stay raw
/// (`serde_json::Map`) because the device reports heterogeneous values —
/// numbers, numeric strings — and normalization is the extractor's job.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    #[serde(default)]
    pub user: Option<NodeUser>,
    #[serde(default)]
    pub last_heard: Option<i64>,
    #[serde(default)]
    pub position: Option<Map<String, Value>>,
    #[serde(default)]
    pub device_metrics: Option<Map<String, Value>>,
    #[serde(default)]
    pub environment_metrics: Option<Map<String, Value>>,
    #[serde(default)]
    pub air_quality_metrics: Option<Map<String, Value>>,
    #[serde(default)]
    pub power_metrics: Option<Map<String, Value>>,
    #[serde(default)]
    pub paxcounter: Option<Map<String, Value>>,
}

/// Fallback series names use this many leading characters of the node id.
const NODE_ID_PREFIX_LEN: usize = 8;

impl NodeRecord {
    /// Raw sub-record for one category, if the node reported it.
    pub fn section(&self, category: Category) -> Option<&Map<String, Value>> {
        match category {
            Category::Position => self.position.as_ref(),
            Category::DeviceMetrics => self.device_metrics.as_ref(),
            Category::Environment => self.environment_metrics.as_ref(),
            Category::AirQuality => self.air_quality_metrics.as_ref(),
            Category::Power => self.power_metrics.as_ref(),
            Category::PaxCounter => self.paxcounter.as_ref(),
        }
    }

    /// Series label for this node: the user-assigned long name when present
    /// and non-empty, otherwise a fallback derived from the node id.
    pub fn series_label(&self, node_id: &str) -> String {
        match self.user.as_ref().and_then(|u| u.long_name.as_deref()) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => {
                let prefix: String = node_id.chars().take(NODE_ID_PREFIX_LEN).collect();
                format!("Unknown-{prefix}")
            }
        }
    }
}

/// A successfully-cast metric value. Untagged so integers serialize without
/// a fractional part, which is what the endpoint's contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

/// One observation ready for ingestion, in the endpoint's wire shape.
///
/// Invariant: a `DataPoint` only exists after its raw value cast succeeded;
/// absent or uncastable source fields are never materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub time: String,
    pub ship_id: String,
    pub cargo_id: String,
    pub value: MetricValue,
}

/// Ordered points produced from one node during one collection cycle.
/// Lives from enqueue until the sender drains (or abandons) it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryBatch {
    pub points: Vec<DataPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn series_label_prefers_long_name() {
        let node = NodeRecord {
            user: Some(NodeUser { long_name: Some("Buoy-1".into()) }),
            ..Default::default()
        };
        assert_eq!(node.series_label("!abcd1234"), "Buoy-1");
    }

    #[test]
    fn series_label_falls_back_to_id_prefix() {
        let node = NodeRecord::default();
        assert_eq!(node.series_label("!abcd1234efgh"), "Unknown-!abcd123");

        // Blank names are treated as absent.
        let blank = NodeRecord {
            user: Some(NodeUser { long_name: Some("   ".into()) }),
            ..Default::default()
        };
        assert_eq!(blank.series_label("!abcd1234"), "Unknown-!abcd123");
    }

    #[test]
    fn node_record_parses_device_interface_shape() {
        let node: NodeRecord = serde_json::from_value(json!({
            "user": {"longName": "Buoy-1", "shortName": "B1"},
            "lastHeard": 1756500000,
            "position": {"latitude": 45.1, "longitude": -122.5},
            "deviceMetrics": {"batteryLevel": 87},
            "unknownSection": {"x": 1}
        }))
        .unwrap();
        assert_eq!(node.series_label("!abcd1234"), "Buoy-1");
        assert_eq!(node.last_heard, Some(1756500000));
        assert!(node.section(Category::Position).is_some());
        assert!(node.section(Category::Environment).is_none());
    }

    #[test]
    fn data_point_wire_round_trip() {
        let point = DataPoint {
            time: "2026-08-30T12:00:00.000000Z".into(),
            ship_id: "Buoy-1".into(),
            cargo_id: "BatteryLevel".into(),
            value: MetricValue::Int(87),
        };
        let wire = serde_json::to_string(&point).unwrap();
        // Integers must not grow a fractional part on the wire.
        assert!(wire.contains("\"value\":87"));
        let back: DataPoint = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, point);

        let float_point = DataPoint { value: MetricValue::Float(45.1), ..point };
        let wire = serde_json::to_string(&float_point).unwrap();
        let back: DataPoint = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, float_point);
    }
}

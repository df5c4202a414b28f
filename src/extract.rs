//! Metric extraction: one node record in, an ordered list of normalized
//! points out.
//!
//! Every forwarded field is declared once in [`FIELDS`], and a single generic
//! routine walks that table. Output order is table order, so tests can assert
//! exact sequences. A field that is absent is skipped silently; a field that
//! fails its declared cast is skipped with a diagnostic and never takes its
//! siblings, category, or node down with it.

use crate::config::CategoryToggles;
use crate::model::{Category, DataPoint, MetricValue, NodeRecord};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::warn;

/// Declared target type of a telemetry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Float,
}

struct FieldSpec {
    category: Category,
    source_key: &'static str,
    cargo_id: &'static str,
    kind: FieldKind,
}

impl FieldSpec {
    const fn new(
        category: Category,
        source_key: &'static str,
        cargo_id: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self { category, source_key, cargo_id, kind }
    }
}

/// The normalization contract: every field the pipeline forwards, grouped by
/// category, in output order.
const FIELDS: &[FieldSpec] = &[
    FieldSpec::new(Category::Position, "latitude", "latitude", FieldKind::Float),
    FieldSpec::new(Category::Position, "longitude", "longitude", FieldKind::Float),
    FieldSpec::new(Category::Position, "altitude", "altitude", FieldKind::Int),
    FieldSpec::new(Category::Position, "satsInView", "satsInView", FieldKind::Int),
    FieldSpec::new(Category::DeviceMetrics, "batteryLevel", "BatteryLevel", FieldKind::Int),
    FieldSpec::new(Category::DeviceMetrics, "voltage", "Voltage", FieldKind::Float),
    FieldSpec::new(Category::DeviceMetrics, "channelUtilization", "ChannelUtilization", FieldKind::Float),
    FieldSpec::new(Category::DeviceMetrics, "airUtilTx", "AirUtilTX", FieldKind::Float),
    FieldSpec::new(Category::Environment, "temperature", "Temperature", FieldKind::Float),
    FieldSpec::new(Category::Environment, "relativeHumidity", "RelativeHumidity", FieldKind::Float),
    FieldSpec::new(Category::Environment, "barometricPressure", "BarometricPressure", FieldKind::Float),
    FieldSpec::new(Category::AirQuality, "pm25Standard", "PM25", FieldKind::Float),
    FieldSpec::new(Category::AirQuality, "co2", "CO2", FieldKind::Int),
    FieldSpec::new(Category::Power, "power", "Power", FieldKind::Float),
    FieldSpec::new(Category::Power, "current", "Current", FieldKind::Float),
    FieldSpec::new(Category::PaxCounter, "pax", "PaxCounter", FieldKind::Int),
];

/// UTC timestamp in the fixed ISO-8601 form the endpoint expects, with an
/// explicit `Z` marker.
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Extracts every enabled, castable field of `node` into normalized points,
/// stamped with one timestamp for the whole node.
pub fn extract(node_id: &str, node: &NodeRecord, enabled: &CategoryToggles) -> Vec<DataPoint> {
    extract_at(node_id, node, enabled, &utc_timestamp())
}

/// Like [`extract`], with the per-node timestamp supplied by the caller.
pub fn extract_at(
    node_id: &str,
    node: &NodeRecord,
    enabled: &CategoryToggles,
    time: &str,
) -> Vec<DataPoint> {
    let ship_id = node.series_label(node_id);
    let mut points = Vec::new();

    for spec in FIELDS {
        if !enabled.contains(spec.category) {
            continue;
        }
        let Some(section) = node.section(spec.category) else {
            continue;
        };
        // A JSON null is treated the same as an absent field.
        let Some(raw) = section.get(spec.source_key).filter(|v| !v.is_null()) else {
            continue;
        };
        match cast(raw, spec.kind) {
            Some(value) => points.push(DataPoint {
                time: time.to_string(),
                ship_id: ship_id.clone(),
                cargo_id: spec.cargo_id.to_string(),
                value,
            }),
            None => warn!(
                node = %ship_id,
                field = spec.source_key,
                raw = %raw,
                "could not cast field value, skipping"
            ),
        }
    }

    points
}

/// Casts a raw reported value to its declared kind. Accepts JSON numbers and
/// numeric strings; anything else fails the cast. Int fields truncate
/// fractional numbers but reject fractional strings.
fn cast(raw: &Value, kind: FieldKind) -> Option<MetricValue> {
    match kind {
        FieldKind::Int => match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(MetricValue::Int(i)),
                None => n.as_f64().map(|f| MetricValue::Int(f as i64)),
            },
            Value::String(s) => s.trim().parse::<i64>().ok().map(MetricValue::Int),
            _ => None,
        },
        FieldKind::Float => match raw {
            Value::Number(n) => n.as_f64().map(MetricValue::Float),
            Value::String(s) => s.trim().parse::<f64>().ok().map(MetricValue::Float),
            _ => None,
        },
    }
}

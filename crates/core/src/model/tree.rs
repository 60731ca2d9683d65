use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{BridgeError, Result};

/// Deepest mapping nesting accepted when decoding a metric tree.
pub const MAX_TREE_DEPTH: usize = 64;

/// A decoded Ambari metrics subtree: nested mappings ending in time series.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricTree {
    Branch(BTreeMap<String, MetricTree>),
    Series(Vec<SeriesPoint>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub value: f64,
    pub timestamp: i64,
}

impl MetricTree {
    /// Decodes a JSON value as either a mapping of child trees or a
    /// sequence of `[value, timestamp]` pairs.
    pub fn decode(value: &Value) -> Result<Self> {
        decode_at(value, "metrics", 0)
    }
}

fn decode_at(value: &Value, path: &str, depth: usize) -> Result<MetricTree> {
    if depth > MAX_TREE_DEPTH {
        return Err(BridgeError::Parse(format!(
            "metric tree nested deeper than {MAX_TREE_DEPTH} levels at {path}"
        )));
    }

    match value {
        Value::Object(map) => {
            let mut children = BTreeMap::new();
            for (key, child) in map {
                let child_path = format!("{path}.{key}");
                children.insert(key.clone(), decode_at(child, &child_path, depth + 1)?);
            }
            Ok(MetricTree::Branch(children))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, item)| decode_pair(item, path, idx))
            .collect::<Result<Vec<_>>>()
            .map(MetricTree::Series),
        other => Err(BridgeError::Parse(format!(
            "expected mapping or series at {path}, got {}",
            json_kind(other)
        ))),
    }
}

fn decode_pair(item: &Value, path: &str, idx: usize) -> Result<SeriesPoint> {
    let bad = |reason: &str| {
        BridgeError::Parse(format!("bad series point {path}[{idx}]: {reason} ({item})"))
    };

    let Some([value, timestamp]) = item.as_array().map(Vec::as_slice) else {
        return Err(bad("expected [value, timestamp]"));
    };

    let value = value.as_f64().ok_or_else(|| bad("value is not a number"))?;
    let timestamp = match timestamp.as_i64() {
        Some(ts) => ts,
        None => {
            let ts = timestamp
                .as_f64()
                .filter(|ts| ts.is_finite() && ts.fract() == 0.0)
                .ok_or_else(|| bad("timestamp is not integer seconds"))?;
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            if ts < i64::MIN as f64 || ts >= i64::MAX as f64 {
                return Err(bad("timestamp out of range"));
            }
            ts as i64
        }
    };

    Ok(SeriesPoint { value, timestamp })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_nested_mapping_to_series() {
        let tree = MetricTree::decode(&json!({
            "cpu": {"user": [[0.5, 100], [0.7, 200]], "idle": []}
        }))
        .unwrap();

        let MetricTree::Branch(root) = &tree else {
            panic!("expected branch");
        };
        let MetricTree::Branch(cpu) = &root["cpu"] else {
            panic!("expected branch");
        };
        assert_eq!(cpu["idle"], MetricTree::Series(vec![]));
        assert_eq!(
            cpu["user"],
            MetricTree::Series(vec![
                SeriesPoint {
                    value: 0.5,
                    timestamp: 100
                },
                SeriesPoint {
                    value: 0.7,
                    timestamp: 200
                },
            ])
        );
    }

    #[test]
    fn accepts_integral_float_timestamps() {
        let tree = MetricTree::decode(&json!([[3, 1500.0]])).unwrap();
        assert_eq!(
            tree,
            MetricTree::Series(vec![SeriesPoint {
                value: 3.0,
                timestamp: 1500
            }])
        );
    }

    #[test]
    fn rejects_scalar_leaves() {
        let err = MetricTree::decode(&json!({"cpu": {"cpu_num": 4}})).unwrap_err();
        assert!(matches!(err, BridgeError::Parse(ref msg) if msg.contains("metrics.cpu.cpu_num")));
    }

    #[test]
    fn rejects_malformed_pairs() {
        for bad in [
            json!([[1.0]]),
            json!([[1.0, 2, 3]]),
            json!([["x", 100]]),
            json!([[null, 100]]),
            json!([[1.0, 100.5]]),
            json!([[1.0, 1e30]]),
            json!([[1.0, -1e19]]),
            json!([[1.0, 9.223372036854775807e18]]),
            json!([42]),
        ] {
            assert!(
                matches!(MetricTree::decode(&bad), Err(BridgeError::Parse(_))),
                "accepted {bad}"
            );
        }
    }

    #[test]
    fn bounds_nesting_depth() {
        let mut deep = json!([[1.0, 1]]);
        for _ in 0..(MAX_TREE_DEPTH + 5) {
            deep = json!({ "n": deep });
        }
        assert!(matches!(
            MetricTree::decode(&deep),
            Err(BridgeError::Parse(ref msg)) if msg.contains("deeper")
        ));

        let mut shallow = json!([[1.0, 1]]);
        for _ in 0..10 {
            shallow = json!({ "n": shallow });
        }
        assert!(MetricTree::decode(&shallow).is_ok());
    }
}

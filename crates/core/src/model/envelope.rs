use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::model::tree::MetricTree;

/// Top-level Ambari response document.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEnvelope {
    Component(ComponentMetrics),
    HostList(Vec<HostMetrics>),
}

/// `{ServiceComponentInfo: {...}, metrics: {...}}`
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMetrics {
    pub service_name: String,
    pub component_name: String,
    pub metrics: Option<MetricTree>,
}

/// One entry of `{items: [{HostRoles: {...}, metrics: {...}}]}`
#[derive(Debug, Clone, PartialEq)]
pub struct HostMetrics {
    pub host_name: String,
    pub component_name: String,
    pub metrics: Option<MetricTree>,
}

impl ComponentMetrics {
    pub fn prefix(&self) -> String {
        format!("{}.{}Metrics", self.service_name, self.component_name)
    }
}

impl HostMetrics {
    pub fn host_label(&self) -> &str {
        host_label(&self.host_name)
    }

    pub fn prefix(&self) -> String {
        format!("{}.{}Metrics", self.host_label(), self.component_name)
    }
}

/// Strips the domain and the role suffix from a host name:
/// `worker-3.cluster.internal` becomes `worker`.
pub fn host_label(host_name: &str) -> &str {
    let short = host_name.split('.').next().unwrap_or(host_name);
    short.split('-').next().unwrap_or(short)
}

impl MetricEnvelope {
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(raw)
            .map_err(|e| BridgeError::Parse(format!("invalid JSON document: {e}")))?;
        Self::from_json(&doc)
    }

    pub fn from_json(doc: &Value) -> Result<Self> {
        let Some(root) = doc.as_object() else {
            return Err(BridgeError::UnsupportedFormat(
                "document root is not an object".to_string(),
            ));
        };

        if let Some(info) = root
            .get("ServiceComponentInfo")
            .and_then(Value::as_object)
            .filter(|info| !info.is_empty())
        {
            return Ok(Self::Component(ComponentMetrics {
                service_name: required_str(info, "ServiceComponentInfo", "service_name")?,
                component_name: required_str(info, "ServiceComponentInfo", "component_name")?,
                metrics: decode_metrics(root.get("metrics"))?,
            }));
        }

        if let Some(items) = root.get("items").and_then(Value::as_array) {
            let hosts = items
                .iter()
                .enumerate()
                .map(|(idx, item)| decode_host_item(item, idx))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self::HostList(hosts));
        }

        Err(BridgeError::UnsupportedFormat(
            "document has neither ServiceComponentInfo nor items".to_string(),
        ))
    }

    /// Prefixes paired with their trees, in document order.
    pub fn groups(&self) -> Vec<(String, Option<&MetricTree>)> {
        match self {
            Self::Component(component) => vec![(component.prefix(), component.metrics.as_ref())],
            Self::HostList(hosts) => hosts
                .iter()
                .map(|host| (host.prefix(), host.metrics.as_ref()))
                .collect(),
        }
    }
}

fn decode_host_item(item: &Value, idx: usize) -> Result<HostMetrics> {
    let item = item
        .as_object()
        .ok_or_else(|| BridgeError::Parse(format!("items[{idx}] is not an object")))?;
    let roles = item
        .get("HostRoles")
        .and_then(Value::as_object)
        .ok_or_else(|| BridgeError::Parse(format!("items[{idx}] has no HostRoles")))?;
    let section = format!("items[{idx}].HostRoles");

    Ok(HostMetrics {
        host_name: required_str(roles, &section, "host_name")?,
        component_name: required_str(roles, &section, "component_name")?,
        metrics: decode_metrics(item.get("metrics"))?,
    })
}

/// Absent, null and empty metrics all mean "nothing to publish".
fn decode_metrics(value: Option<&Value>) -> Result<Option<MetricTree>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) if map.is_empty() => Ok(None),
        Some(Value::Array(items)) if items.is_empty() => Ok(None),
        Some(value) => MetricTree::decode(value).map(Some),
    }
}

fn required_str(map: &Map<String, Value>, section: &str, key: &str) -> Result<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BridgeError::Parse(format!("{section} is missing string field {key}")))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn host_label_strips_domain_and_role_suffix() {
        assert_eq!(host_label("worker-3.cluster.internal"), "worker");
        assert_eq!(host_label("wn0-hdi.example.net"), "wn0");
        assert_eq!(host_label("headnode"), "headnode");
        assert_eq!(host_label(""), "");
    }

    #[test]
    fn decodes_component_envelope() {
        let env = MetricEnvelope::from_json(&json!({
            "ServiceComponentInfo": {"service_name": "HDFS", "component_name": "NAMENODE"},
            "metrics": {"cpu": {"user": [[0.5, 100]]}}
        }))
        .unwrap();

        let MetricEnvelope::Component(component) = &env else {
            panic!("expected component envelope");
        };
        assert_eq!(component.prefix(), "HDFS.NAMENODEMetrics");
        assert_eq!(env.groups().len(), 1);
        assert_eq!(env.groups()[0].0, "HDFS.NAMENODEMetrics");
    }

    #[test]
    fn decodes_host_list_envelope() {
        let env = MetricEnvelope::from_json(&json!({
            "items": [
                {"HostRoles": {"host_name": "wn1-abc.internal", "component_name": "DATANODE"},
                 "metrics": {"cpu": {"cpu_user": [[1.0, 10]]}}},
                {"HostRoles": {"host_name": "wn2-abc.internal", "component_name": "DATANODE"}}
            ]
        }))
        .unwrap();

        let prefixes: Vec<_> = env.groups().into_iter().map(|(p, _)| p).collect();
        assert_eq!(prefixes, vec!["wn1.DATANODEMetrics", "wn2.DATANODEMetrics"]);
        assert!(env.groups()[1].1.is_none());
    }

    #[test]
    fn empty_service_component_info_falls_through_to_items() {
        let env = MetricEnvelope::from_json(&json!({"ServiceComponentInfo": {}, "items": []}))
            .unwrap();
        assert_eq!(env, MetricEnvelope::HostList(vec![]));
    }

    #[test]
    fn unknown_shapes_are_unsupported() {
        for doc in [json!({"href": "x"}), json!([1, 2]), json!("text")] {
            assert!(matches!(
                MetricEnvelope::from_json(&doc),
                Err(BridgeError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn missing_identity_fields_are_parse_errors() {
        let err = MetricEnvelope::from_json(&json!({
            "ServiceComponentInfo": {"service_name": "HDFS"},
            "metrics": {}
        }))
        .unwrap_err();
        assert!(matches!(err, BridgeError::Parse(ref msg) if msg.contains("component_name")));

        let err = MetricEnvelope::from_json(&json!({"items": [{"metrics": {}}]})).unwrap_err();
        assert!(matches!(err, BridgeError::Parse(ref msg) if msg.contains("HostRoles")));
    }

    #[test]
    fn rejects_invalid_json_bytes() {
        assert!(matches!(
            MetricEnvelope::from_slice(b"{not json"),
            Err(BridgeError::Parse(_))
        ));
    }
}

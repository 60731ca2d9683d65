use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Metric paths requested per Ambari call.
pub const BATCH_SIZE: usize = 10;

/// Sampling period, in seconds, requested for windowed queries.
pub const WINDOW_PERIOD_SECS: i64 = 15;

/// One Ambari endpoint and the metric paths polled from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricPackage {
    pub module: String,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// `[start,end,period]` suffix Ambari uses for temporal queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: i64,
    pub end: i64,
    pub period: i64,
}

impl QueryWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            period: WINDOW_PERIOD_SECS,
        }
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.start, self.end, self.period)
    }
}

impl MetricPackage {
    pub fn new(module: &str, metrics: &[&str]) -> Self {
        Self {
            module: module.to_string(),
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn batches(&self) -> std::slice::Chunks<'_, String> {
        self.metrics.chunks(BATCH_SIZE)
    }

    /// Query parameters for one batch: the package's own parameters plus
    /// the averaged `fields` selection.
    pub fn query_params(
        &self,
        batch: &[String],
        window: Option<&QueryWindow>,
    ) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k.as_str() != "fields")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.push(("fields".to_string(), render_fields(batch, window)));
        params
    }
}

pub fn render_fields(batch: &[String], window: Option<&QueryWindow>) -> String {
    let window = window.map(ToString::to_string).unwrap_or_default();
    batch
        .iter()
        .map(|path| format!("{path}._avg{window}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Metrics polled when the config file does not list any packages.
pub fn default_packages() -> Vec<MetricPackage> {
    vec![
        MetricPackage::new(
            "services/HDFS/components/NAMENODE",
            &[
                "metrics/cpu/cpu_user",
                "metrics/cpu/cpu_system",
                "metrics/cpu/cpu_wio",
                "metrics/memory/mem_free",
                "metrics/memory/mem_cached",
                "metrics/jvm/memHeapUsedM",
                "metrics/jvm/memHeapCommittedM",
                "metrics/jvm/gcCount",
                "metrics/jvm/gcTimeMillis",
                "metrics/rpc/client/RpcQueueTime_avg_time",
                "metrics/rpc/client/RpcProcessingTime_avg_time",
                "metrics/dfs/FSNamesystem/CapacityUsed",
                "metrics/dfs/FSNamesystem/CapacityRemaining",
                "metrics/dfs/FSNamesystem/BlocksTotal",
                "metrics/dfs/FSNamesystem/UnderReplicatedBlocks",
            ],
        ),
        MetricPackage::new(
            "services/YARN/components/RESOURCEMANAGER",
            &[
                "metrics/yarn/Queue/root/AppsRunning",
                "metrics/yarn/Queue/root/AppsPending",
                "metrics/yarn/Queue/root/AllocatedMB",
                "metrics/yarn/Queue/root/AvailableMB",
                "metrics/yarn/Queue/root/AllocatedContainers",
                "metrics/yarn/ClusterMetrics/NumActiveNMs",
                "metrics/yarn/ClusterMetrics/NumUnhealthyNMs",
            ],
        ),
        MetricPackage::new(
            "host_components",
            &[
                "metrics/cpu/cpu_user",
                "metrics/cpu/cpu_system",
                "metrics/disk/read_bytes",
                "metrics/disk/write_bytes",
                "metrics/network/bytes_in",
                "metrics/network/bytes_out",
                "metrics/memory/mem_free",
            ],
        )
        .with_param("HostRoles/component_name", "DATANODE"),
        MetricPackage::new(
            "host_components",
            &[
                "metrics/yarn/ContainersRunning",
                "metrics/yarn/ContainersFailed",
                "metrics/yarn/AllocatedGB",
                "metrics/yarn/AvailableGB",
                "metrics/cpu/cpu_user",
                "metrics/memory/mem_free",
            ],
        )
        .with_param("HostRoles/component_name", "NODEMANAGER"),
    ]
}

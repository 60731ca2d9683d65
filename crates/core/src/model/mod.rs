pub mod envelope;
pub mod point;
pub mod tree;

pub use envelope::{ComponentMetrics, HostMetrics, MetricEnvelope, host_label};
pub use point::PublishedPoint;
pub use tree::{MAX_TREE_DEPTH, MetricTree, SeriesPoint};

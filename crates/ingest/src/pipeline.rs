use ambari2graphite_core::error::{BridgeError, Result};
use ambari2graphite_core::flatten::{flatten_document, flatten_envelope};
use ambari2graphite_core::model::MetricEnvelope;
use ambari2graphite_core::rebase::RebaseContext;
use ambari2graphite_core::sink::PointSink;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub skipped: usize,
    pub points: usize,
}

/// Flattens documents one at a time into a single sink, isolating
/// per-document failures.
pub struct Publisher<S> {
    sink: S,
    rebase: Option<RebaseContext>,
    summary: RunSummary,
}

impl<S: PointSink> Publisher<S> {
    pub fn new(sink: S, rebase: Option<RebaseContext>) -> Self {
        Self {
            sink,
            rebase,
            summary: RunSummary::default(),
        }
    }

    /// Parses and publishes one raw document. Parse and shape errors are
    /// logged and counted; sink errors are returned.
    pub fn publish_raw(&mut self, label: &str, raw: &[u8]) -> Result<usize> {
        let flattened = MetricEnvelope::from_slice(raw)
            .and_then(|envelope| flatten_envelope(&envelope, self.rebase.as_ref(), &mut self.sink));
        self.settle(label, flattened)
    }

    pub fn publish_value(&mut self, label: &str, doc: &Value) -> Result<usize> {
        let flattened = flatten_document(doc, self.rebase.as_ref(), &mut self.sink);
        self.settle(label, flattened)
    }

    fn settle(&mut self, label: &str, flattened: Result<usize>) -> Result<usize> {
        match flattened {
            Ok(points) => {
                self.summary.documents += 1;
                self.summary.points += points;
                info!(document = %label, points, "published document");
                Ok(points)
            }
            Err(err) if err.is_document_scoped() => {
                self.record_skipped(label, &err);
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    pub fn record_skipped(&mut self, label: &str, err: &BridgeError) {
        self.summary.documents += 1;
        self.summary.skipped += 1;
        warn!(document = %label, error = %err, "skipping document");
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

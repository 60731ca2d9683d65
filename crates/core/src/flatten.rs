use serde_json::Value;

use crate::error::Result;
use crate::model::{MetricEnvelope, MetricTree, PublishedPoint};
use crate::rebase::{RebaseContext, rebase_timestamp};
use crate::sink::PointSink;

/// Decodes a raw JSON document and flattens it into `sink`.
///
/// The envelope is decoded and every point rebased before anything is
/// emitted, so a malformed document contributes no points.
pub fn flatten_document(
    doc: &Value,
    rebase: Option<&RebaseContext>,
    sink: &mut dyn PointSink,
) -> Result<usize> {
    let envelope = MetricEnvelope::from_json(doc)?;
    flatten_envelope(&envelope, rebase, sink)
}

/// Emits one point per surviving series sample and returns how many were
/// emitted. Groups without metrics are skipped. Nothing reaches `sink`
/// unless the whole envelope flattens cleanly.
pub fn flatten_envelope(
    envelope: &MetricEnvelope,
    rebase: Option<&RebaseContext>,
    sink: &mut dyn PointSink,
) -> Result<usize> {
    let mut staged: Vec<PublishedPoint> = Vec::new();
    for (prefix, tree) in envelope.groups() {
        let Some(tree) = tree else {
            continue;
        };
        flatten_tree(&prefix, tree, rebase, &mut staged)?;
    }

    let emitted = staged.len();
    for point in staged {
        sink.emit(point)?;
    }
    Ok(emitted)
}

/// Walks `tree`, joining keys onto `path` with dots.
pub fn flatten_tree(
    path: &str,
    tree: &MetricTree,
    rebase: Option<&RebaseContext>,
    sink: &mut dyn PointSink,
) -> Result<usize> {
    match tree {
        MetricTree::Branch(children) => {
            let mut emitted = 0;
            for (key, child) in children {
                emitted += flatten_tree(&format!("{path}.{key}"), child, rebase, sink)?;
            }
            Ok(emitted)
        }
        MetricTree::Series(points) => {
            let mut emitted = 0;
            for point in points {
                let Some(timestamp) = rebase_timestamp(rebase, point.timestamp)? else {
                    continue;
                };
                sink.emit(PublishedPoint::new(path, point.value, timestamp))?;
                emitted += 1;
            }
            Ok(emitted)
        }
    }
}

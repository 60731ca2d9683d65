use serde::{Deserialize, Serialize};

/// One flattened sample on its way to the sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublishedPoint {
    pub path: String,
    pub value: f64,
    pub timestamp: i64,
}

impl PublishedPoint {
    pub fn new(path: impl Into<String>, value: f64, timestamp: i64) -> Self {
        Self {
            path: path.into(),
            value,
            timestamp,
        }
    }
}

use chrono::{DateTime, Utc};

use crate::error::{BridgeError, Result};

/// Anchor that replayed test windows are shifted onto (2019-11-17 10:56:00 UTC).
pub const BASE_TIMESTAMP_TO_UPLOAD: i64 = 1_573_988_160;

/// Lead subtracted from the operator supplied test start date so the first
/// minute before the test is kept.
pub const TEST_START_LEAD_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebaseContext {
    pub test_start_timestamp: i64,
    pub base_timestamp_to_upload: i64,
}

impl RebaseContext {
    pub fn new(test_start_timestamp: i64) -> Self {
        Self {
            test_start_timestamp,
            base_timestamp_to_upload: BASE_TIMESTAMP_TO_UPLOAD,
        }
    }

    pub fn from_test_start_date(date: DateTime<Utc>) -> Self {
        Self::new(date.timestamp() - TEST_START_LEAD_SECS)
    }

    /// `Ok(None)` when `ts` predates the test window. A shift that leaves
    /// the `i64` range is a parse error for the owning document.
    pub fn rebase(&self, ts: i64) -> Result<Option<i64>> {
        if ts < self.test_start_timestamp {
            return Ok(None);
        }
        ts.checked_sub(self.test_start_timestamp)
            .and_then(|offset| self.base_timestamp_to_upload.checked_add(offset))
            .map(Some)
            .ok_or_else(|| {
                BridgeError::Parse(format!(
                    "timestamp {ts} overflows when rebased from {} onto {}",
                    self.test_start_timestamp, self.base_timestamp_to_upload
                ))
            })
    }
}

/// Applies an optional rebase; without a context every timestamp passes
/// through unchanged.
pub fn rebase_timestamp(ctx: Option<&RebaseContext>, ts: i64) -> Result<Option<i64>> {
    match ctx {
        Some(ctx) => ctx.rebase(ts),
        None => Ok(Some(ts)),
    }
}

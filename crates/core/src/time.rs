use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{BridgeError, Result};

/// Date format accepted for `--start-date` and `--test-start-date`.
pub const CLI_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses an operator supplied `YYYY-MM-DD hh:mm:ss` date as UTC.
pub fn parse_cli_date(input: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(input.trim(), CLI_DATE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            BridgeError::Parse(format!(
                "expected date as YYYY-MM-DD hh:mm:ss, got {input}: {e}"
            ))
        })
}

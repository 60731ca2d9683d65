use std::io::{IsTerminal, Write};

use ambari2graphite_core::error::{BridgeError, Result};
use ambari2graphite_core::model::PublishedPoint;
use ambari2graphite_core::sink::PointSink;
use ambari2graphite_ingest::forward::format_line;
use ambari2graphite_ingest::pipeline::RunSummary;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Prints Graphite plaintext lines instead of sending them (`--dry-run`).
pub struct StdoutSink {
    prefix: String,
    lines: u64,
}

impl StdoutSink {
    pub fn new(prefix: String) -> Self {
        Self { prefix, lines: 0 }
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }
}

impl PointSink for StdoutSink {
    fn emit(&mut self, point: PublishedPoint) -> Result<()> {
        std::io::stdout()
            .lock()
            .write_all(format_line(&self.prefix, &point).as_bytes())
            .map_err(|e| BridgeError::Sink(format!("stdout write failed: {e}")))?;
        self.lines += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: &'static str,
    pub dry_run: bool,
    #[serde(flatten)]
    pub summary: RunSummary,
    pub sent: u64,
}

pub fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let color = std::io::stdout().is_terminal();
    let skipped = if color && report.summary.skipped > 0 {
        report.summary.skipped.yellow().to_string()
    } else {
        report.summary.skipped.to_string()
    };
    let sent = if color {
        report.sent.green().to_string()
    } else {
        report.sent.to_string()
    };
    let target = if report.dry_run { "printed" } else { "sent" };
    println!(
        "-- mode={} documents={} skipped={} points={} {target}={sent} --",
        report.mode, report.summary.documents, skipped, report.summary.points,
    );
    Ok(())
}

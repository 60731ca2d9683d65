mod output;
mod telemetry;

use std::path::PathBuf;

use ambari2graphite_core::config::Config;
use ambari2graphite_core::rebase::RebaseContext;
use ambari2graphite_core::sink::PointSink;
use ambari2graphite_core::time::parse_cli_date;
use ambari2graphite_ingest::ambari::{AmbariCollector, query_window};
use ambari2graphite_ingest::forward::{ForwardConfig, GraphiteSink};
use ambari2graphite_ingest::local::LocalSource;
use ambari2graphite_ingest::pipeline::Publisher;
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;

use crate::output::{RunReport, StdoutSink, print_report};
use crate::telemetry::{LogFormat, init_cli_tracing};

#[derive(Parser, Debug)]
#[command(name = "ambari2graphite")]
#[command(about = "Republish Ambari cluster metrics to Graphite")]
struct Cli {
    #[arg(help = "Config file path")]
    config_path: PathBuf,

    #[arg(short = 's', long, help = "Start date (YYYY-MM-DD hh:mm:ss, UTC)")]
    start_date: Option<String>,

    #[arg(short = 't', long, help = "Test start date (YYYY-MM-DD hh:mm:ss, UTC)")]
    test_start_date: Option<String>,

    #[arg(
        short = 'l',
        long = "local",
        requires = "input_path",
        help = "Replay saved response files instead of polling Ambari"
    )]
    use_local_data: bool,

    #[arg(short = 'i', long, help = "Input file or directory for --local")]
    input_path: Option<PathBuf>,

    #[arg(long, help = "Print Graphite lines to stdout instead of sending them")]
    dry_run: bool,

    #[arg(long, help = "Print the run summary as JSON")]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_cli_tracing(LogFormat::from_env());

    let cfg = Config::load(&cli.config_path)
        .with_context(|| format!("load config {}", cli.config_path.display()))?;
    let start = cli
        .start_date
        .as_deref()
        .map(parse_cli_date)
        .transpose()
        .context("parse --start-date")?;
    let rebase = cli
        .test_start_date
        .as_deref()
        .map(parse_cli_date)
        .transpose()
        .context("parse --test-start-date")?
        .map(RebaseContext::from_test_start_date);
    if let Some(ctx) = &rebase {
        tracing::info!(
            test_start = ctx.test_start_timestamp,
            base = ctx.base_timestamp_to_upload,
            "rebasing timestamps"
        );
    }

    let mode = if cli.use_local_data { "local" } else { "live" };

    let report = if cli.dry_run {
        let prefix = match cfg.graphite_prefix() {
            Ok(prefix) => prefix,
            Err(err) => {
                tracing::debug!(error = %err, "dry run without graphite prefix");
                String::new()
            }
        };
        let mut publisher = Publisher::new(StdoutSink::new(prefix), rebase);
        run_source(&cli, &cfg, start, &mut publisher).await?;
        RunReport {
            mode,
            dry_run: true,
            summary: publisher.summary(),
            sent: publisher.into_sink().lines(),
        }
    } else {
        let forward = ForwardConfig::from_config(&cfg).context("graphite configuration")?;
        let sink = GraphiteSink::connect(forward)
            .await
            .context("connect graphite")?;
        let mut publisher = Publisher::new(sink, rebase);
        let outcome = run_source(&cli, &cfg, start, &mut publisher).await;
        let summary = publisher.summary();
        let sent = publisher.into_sink().shutdown().await;
        RunReport {
            mode,
            dry_run: false,
            summary,
            sent: settle_graphite(outcome, sent)?,
        }
    };

    print_report(&report, cli.json)
}

/// Combines the run outcome with the writer's shutdown result. When both
/// failed, the writer error is attached to the run error.
fn settle_graphite(
    outcome: anyhow::Result<()>,
    sent: ambari2graphite_core::Result<u64>,
) -> anyhow::Result<u64> {
    match (outcome, sent) {
        (Ok(()), sent) => sent.context("flush graphite"),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(writer_err)) => {
            tracing::warn!(error = %writer_err, "graphite writer failed");
            Err(err.context(format!("graphite writer failed: {writer_err}")))
        }
    }
}

async fn run_source<S: PointSink>(
    cli: &Cli,
    cfg: &Config,
    start: Option<DateTime<Utc>>,
    publisher: &mut Publisher<S>,
) -> anyhow::Result<()> {
    if cli.use_local_data {
        let input = cli
            .input_path
            .as_deref()
            .context("--input-path is required with --local")?;
        let source = LocalSource::open(input)
            .await
            .with_context(|| format!("open input {}", input.display()))?;
        tracing::info!(files = source.files().len(), input = %input.display(), "replaying local files");
        source.replay(publisher).await?;
    } else {
        let collector = AmbariCollector::from_config(cfg).context("ambari configuration")?;
        tracing::info!(packages = collector.packages().len(), "collecting from ambari");
        collector
            .collect(query_window(start, Utc::now()), publisher)
            .await
            .context("collect from ambari")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn local_mode_requires_input_path() {
        assert!(Cli::try_parse_from(["ambari2graphite", "cfg.toml", "-l"]).is_err());
        let cli =
            Cli::try_parse_from(["ambari2graphite", "cfg.toml", "-l", "-i", "/data"]).unwrap();
        assert!(cli.use_local_data);
        assert_eq!(cli.input_path, Some(PathBuf::from("/data")));
    }

    #[test]
    fn writer_error_is_reported_with_run_failure() {
        use ambari2graphite_core::BridgeError;

        let err = settle_graphite(
            Err(anyhow::Error::new(BridgeError::Sink(
                "graphite writer stopped".to_string(),
            ))),
            Err(BridgeError::Sink("write to graphite failed: broken pipe".to_string())),
        )
        .unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("broken pipe"), "{message}");
        assert!(message.contains("graphite writer stopped"), "{message}");

        assert_eq!(settle_graphite(Ok(()), Ok(3)).unwrap(), 3);
        assert!(
            settle_graphite(Ok(()), Err(BridgeError::Sink("late".to_string())))
                .unwrap_err()
                .to_string()
                .contains("flush graphite")
        );
        assert!(
            settle_graphite(Err(anyhow::anyhow!("collect failed")), Ok(1))
                .unwrap_err()
                .to_string()
                .contains("collect failed")
        );
    }

    #[test]
    fn parses_dates_and_flags() {
        let cli = Cli::try_parse_from([
            "ambari2graphite",
            "cfg.toml",
            "-s",
            "2026-01-01 00:00:00",
            "--test-start-date",
            "2026-01-01 01:00:00",
            "--dry-run",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.start_date.as_deref(), Some("2026-01-01 00:00:00"));
        assert_eq!(cli.test_start_date.as_deref(), Some("2026-01-01 01:00:00"));
        assert!(cli.dry_run && cli.json && !cli.use_local_data);
    }
}

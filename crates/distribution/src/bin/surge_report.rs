//! Print the surge distribution of an upload as JSON rows.
//!
//! Without `--bin` the histogram rows are printed; with it, the samples
//! behind that bar.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use surge_aggregation::SnapshotComposer;
use surge_core::{Config, H3Indexer, TimestampMs};
use surge_distribution::{build_report, write_rows_json, TimeRange};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "surge-report",
    version,
    about = "Histogram of surge values swept over an uploaded dataset"
)]
struct Args {
    /// Upload file (JSON with demand, supply and optional multipliers)
    upload: PathBuf,

    /// Settings file (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sweep start, RFC 3339; defaults to the first observed instant
    #[arg(long, value_parser = parse_instant)]
    from: Option<TimestampMs>,

    /// Sweep end, RFC 3339; defaults to the last observed instant
    #[arg(long, value_parser = parse_instant)]
    to: Option<TimestampMs>,

    /// Print the samples behind this histogram bar instead of the bars
    #[arg(long)]
    bin: Option<usize>,
}

fn parse_instant(s: &str) -> std::result::Result<TimestampMs, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| format!("invalid RFC 3339 instant {:?}: {}", s, e))
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if args.from.is_some() {
        config.distribution.from_ms = args.from;
    }
    if args.to.is_some() {
        config.distribution.to_ms = args.to;
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = load_config(&args)?;
    let upload = surge_ingestion::load_json(&args.upload)
        .with_context(|| format!("loading upload {}", args.upload.display()))?;

    if config.pricing.multipliers.is_empty() {
        config.pricing.multipliers = upload.multipliers;
    }
    config.validate()?;

    let indexer = H3Indexer::new();
    let composer = SnapshotComposer::for_dataset(&indexer, &config, &upload.dataset);
    let range = TimeRange::from_config(&config.distribution, &upload.dataset);
    let report = build_report(&composer, &upload.dataset, &config.distribution, range);

    info!(
        mode = ?report.mode,
        instants = report.instants,
        samples = report.histogram.total_count(),
        bins = report.histogram.bins.len(),
        "report ready"
    );

    let stdout = std::io::stdout();
    match args.bin {
        Some(index) => {
            let bin = report.histogram.bin(index).with_context(|| {
                format!(
                    "no bin {} (histogram has {})",
                    index,
                    report.histogram.bins.len()
                )
            })?;
            write_rows_json(stdout.lock(), &bin.drill_down_rows())?;
        }
        None => write_rows_json(stdout.lock(), &report.histogram.rows())?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_args() {
        let args = Args::try_parse_from([
            "surge-report",
            "up.json",
            "--config",
            "cfg.json",
            "--from=2024-01-01T00:00:00Z",
            "--to",
            "2024-01-01T01:00:00+01:00",
            "--bin",
            "3",
        ])
        .unwrap();

        assert_eq!(args.upload, PathBuf::from("up.json"));
        assert_eq!(args.config, Some(PathBuf::from("cfg.json")));
        assert_eq!(args.from, Some(1_704_067_200_000));
        // Offset is honored: same instant as `from`
        assert_eq!(args.to, Some(1_704_067_200_000));
        assert_eq!(args.bin, Some(3));
    }

    #[test]
    fn test_upload_required() {
        assert!(Args::try_parse_from(["surge-report"]).is_err());
    }

    #[test]
    fn test_extra_positional_rejected() {
        assert!(Args::try_parse_from(["surge-report", "a.json", "b.json"]).is_err());
    }

    #[test]
    fn test_bad_instant_rejected() {
        assert!(Args::try_parse_from(["surge-report", "up.json", "--from", "yesterday"]).is_err());
    }

    #[test]
    fn test_help_is_handled() {
        let err = Args::try_parse_from(["surge-report", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_range_overrides_config() {
        let args = Args::try_parse_from(["surge-report", "up.json", "--to", "2024-01-01T00:00:00Z"])
            .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.distribution.from_ms, None);
        assert_eq!(config.distribution.to_ms, Some(1_704_067_200_000));
    }
}

use anyhow::Result;
use clap::Parser;
use imtrace::analysis::{self, LatencyPercentiles, SummaryReport};
use imtrace::cli::{Cli, OutputFormat};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

#[derive(Debug, Serialize)]
struct LatencyReport {
    file: String,
    #[serde(flatten)]
    percentiles: LatencyPercentiles,
}

#[derive(Debug, Serialize)]
struct Report {
    summary: SummaryReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    latencies: Vec<LatencyReport>,
}

fn collect_latencies(dir: &Path) -> Result<Vec<LatencyReport>> {
    let mut reports = Vec::new();
    for path in analysis::find_latency_files(dir)? {
        let samples = match analysis::read_latency_file(&path) {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", path.display(), e);
                continue;
            }
        };
        if let Some(percentiles) = analysis::latency_percentiles(&samples) {
            let file = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            reports.push(LatencyReport { file, percentiles });
        }
    }
    Ok(reports)
}

fn print_text(report: &Report) {
    let summary = &report.summary;
    println!(
        "threads: {}  events: {}  lost: {}",
        summary.threads,
        summary.events.len(),
        summary.lost_events
    );
    println!();

    println!("{:>12}  location", "count");
    println!("─────────────────────────────────────────");
    for row in &summary.events {
        println!("{:>12}  {}", row.count, row.location);
    }

    if !summary.transitions.is_empty() {
        println!();
        println!("{:>12}  {:>7}  transition", "count", "p");
        println!("─────────────────────────────────────────");
        for row in &summary.transitions {
            println!(
                "{:>12}  {:>7.4}  {} -> {}",
                row.count, row.probability, row.from, row.to
            );
        }
    }

    for latency in &report.latencies {
        println!();
        println!("{} ({} samples)", latency.file, latency.percentiles.samples);
        for (point, log) in latency
            .percentiles
            .values
            .iter()
            .zip(latency.percentiles.log_values.iter().map(Some).chain(std::iter::repeat(None)))
        {
            match log {
                Some(log) => println!(
                    "  p{:<5} {:>14.6}  ln {:>10.6}",
                    point.percentile, point.value, log.value
                ),
                None => println!("  p{:<5} {:>14.6}", point.percentile, point.value),
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    if !args.dir.is_dir() {
        anyhow::bail!("{} is not a directory", args.dir.display());
    }

    tracing::debug!("reading dumps from {}", args.dir.display());
    let merged = analysis::merge_directory(&args.dir)?;

    let latencies = if args.percentiles {
        collect_latencies(&args.dir)?
    } else {
        Vec::new()
    };

    let report = Report {
        summary: merged.report(),
        latencies,
    };

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(())
}

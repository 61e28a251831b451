//! CLI argument parsing for imtrace-report

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "imtrace-report")]
#[command(version)]
#[command(about = "Merge and summarize imtrace dump files", long_about = None)]
pub struct Cli {
    /// Directory holding *.im.out and event-flat-* files
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = "/tmp")]
    pub dir: PathBuf,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also summarize latency reservoirs as percentiles
    #[arg(short = 'p', long = "percentiles")]
    pub percentiles: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

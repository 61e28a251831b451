//! Offline analysis of dump directories
//!
//! Reads the summary and latency files written by traced threads, merges
//! per-thread counts by call site, and summarizes latency reservoirs.

pub mod latency;
pub mod summary;

pub use latency::{
    find_latency_files, latency_percentiles, parse_latency_file_name, parse_latency_samples,
    percentile, read_latency_file, LatencyFileInfo, LatencyPercentiles, PercentilePoint,
    PERCENTILES,
};
pub use summary::{
    find_summary_files, merge_directory, merge_summaries, parse_summary, read_summary_file,
    Location, MergedSummary, SummaryEvent, SummaryReport, SummaryTransition, ThreadSummary,
};

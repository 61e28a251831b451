//! Latency reservoir files: reading and percentile summaries
//!
//! Each file holds one sample per line, in latency units (10 µs). Percentiles
//! are reported on the raw samples and on their natural logarithm, since
//! latency distributions are usually closer to log-normal.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::summary::Location;
use crate::error::TraceError;

/// Percentile points reported for every reservoir
pub const PERCENTILES: [f64; 21] = [
    5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0, 65.0, 70.0, 75.0,
    80.0, 85.0, 90.0, 95.0, 99.0, 99.9,
];

const LATENCY_PREFIX: &str = "event-flat-";

/// Linear-interpolated percentile of already sorted data
///
/// `p` is clamped to `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Parse one sample per line; blank lines are ignored
pub fn parse_latency_samples(text: &str) -> Result<Vec<f64>, TraceError> {
    text.lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| {
            raw.trim().parse::<f64>().map_err(|_| TraceError::Parse {
                line: index + 1,
                message: format!("bad latency sample {:?}", raw.trim()),
            })
        })
        .collect()
}

pub fn read_latency_file<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_latency_samples(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Latency files (`event-flat-*`) in `dir`, sorted by name
pub fn find_latency_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let entry = entry?;
        let is_latency = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(LATENCY_PREFIX));
        if is_latency && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Identity decoded from a latency file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatencyFileInfo {
    pub from: Location,
    pub to: Location,
    pub pid: i32,
    pub tid: i32,
}

/// Decode `event-flat-<f1>:<l1>-<f2>:<l2>-<pid>-<tid>-im`
///
/// File names containing `-` are ambiguous; the split is anchored on the
/// `:<line>-` boundaries so hyphenated names still decode when unambiguous.
pub fn parse_latency_file_name(name: &str) -> Option<LatencyFileInfo> {
    let body = name.strip_prefix(LATENCY_PREFIX)?.strip_suffix("-im")?;
    let (rest, tid) = body.rsplit_once('-')?;
    let (pairs, pid) = rest.rsplit_once('-')?;

    // first '-' that follows a ':<digits>' run ends the source location
    let bytes = pairs.as_bytes();
    let ends_with_line = |prefix: &str| {
        prefix.rsplit_once(':').is_some_and(|(_, line)| {
            !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
        })
    };
    let split = (0..bytes.len()).find(|&i| bytes[i] == b'-' && ends_with_line(&pairs[..i]))?;

    Some(LatencyFileInfo {
        from: Location::parse(&pairs[..split])?,
        to: Location::parse(&pairs[split + 1..])?,
        pid: pid.parse().ok()?,
        tid: tid.parse().ok()?,
    })
}

/// One percentile row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentilePoint {
    pub percentile: f64,
    pub value: f64,
}

/// Percentiles of one reservoir
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyPercentiles {
    pub samples: usize,
    pub values: Vec<PercentilePoint>,
    /// Percentiles of `ln(sample)`; non-positive samples are excluded
    pub log_values: Vec<PercentilePoint>,
}

fn points(sorted: &[f64]) -> Vec<PercentilePoint> {
    if sorted.is_empty() {
        return Vec::new();
    }
    PERCENTILES
        .iter()
        .map(|&p| PercentilePoint {
            percentile: p,
            value: percentile(sorted, p),
        })
        .collect()
}

/// Percentile summary; `None` for an empty reservoir
pub fn latency_percentiles(samples: &[f64]) -> Option<LatencyPercentiles> {
    if samples.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let logs: Vec<f64> = sorted.iter().filter(|&&v| v > 0.0).map(|v| v.ln()).collect();

    Some(LatencyPercentiles {
        samples: samples.len(),
        values: points(&sorted),
        log_values: points(&logs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 50.0), 3.0);
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 100.0), 5.0);
        assert!((percentile(&data, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_edge_cases() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[7.5], 99.9), 7.5);
    }

    #[test]
    fn test_percentile_out_of_range_is_clamped() {
        let data = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&data, 150.0), 3.0);
        assert_eq!(percentile(&data, -20.0), 1.0);
        assert_eq!(percentile(&data, f64::NAN), 1.0);
    }

    #[test]
    fn test_parse_samples() {
        let samples = parse_latency_samples("0.500000\n\n12.250000\n").unwrap();
        assert_eq!(samples, vec![0.5, 12.25]);
        assert!(matches!(
            parse_latency_samples("1.0\nabc\n"),
            Err(TraceError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_latency_percentiles() {
        let samples: Vec<f64> = (1..=100).rev().map(f64::from).collect();
        let summary = latency_percentiles(&samples).unwrap();
        assert_eq!(summary.samples, 100);
        assert_eq!(summary.values.len(), PERCENTILES.len());
        assert!((summary.values[9].value - 50.5).abs() < 1e-9);
        assert_eq!(summary.log_values.len(), PERCENTILES.len());
        // monotone
        assert!(summary.values.windows(2).all(|w| w[0].value <= w[1].value));
    }

    #[test]
    fn test_log_excludes_non_positive() {
        let summary = latency_percentiles(&[0.0, 0.0, 1.0]).unwrap();
        assert_eq!(summary.log_values[0].value, 0.0);
        assert!(latency_percentiles(&[]).is_none());
        assert!(latency_percentiles(&[0.0]).unwrap().log_values.is_empty());
    }

    #[test]
    fn test_parse_file_name() {
        let info = parse_latency_file_name("event-flat-xlog.c:10-xact.c:20-4242-4243-im").unwrap();
        assert_eq!(info.from, Location::new("xlog.c", 10));
        assert_eq!(info.to, Location::new("xact.c", 20));
        assert_eq!((info.pid, info.tid), (4242, 4243));
    }

    #[test]
    fn test_parse_file_name_with_hyphen() {
        let info = parse_latency_file_name("event-flat-my-file.c:3-b.c:4-1-2-im").unwrap();
        assert_eq!(info.from, Location::new("my-file.c", 3));
        assert_eq!(info.to, Location::new("b.c", 4));
    }

    #[test]
    fn test_parse_file_name_rejects() {
        assert!(parse_latency_file_name("1.2.0.im.out").is_none());
        assert!(parse_latency_file_name("event-flat-a.c:1-b.c:2-x-2-im").is_none());
    }

    #[test]
    fn test_find_latency_files() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join("event-flat-a.c:1-a.c:1-1-1-im"), "1.0\n").unwrap();
        fs::write(dir.path().join("1.1.0.im.out"), "").unwrap();
        let files = find_latency_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(read_latency_file(&files[0]).unwrap(), vec![1.0]);
    }
}

//! Summary dump reader and cross-thread merge
//!
//! Event ids are dense per thread and mean nothing across threads, so merged
//! results are keyed by call-site location instead.

use anyhow::{Context, Result};
use fnv::FnvHashMap;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TraceError;

const LOST_PREFIX: &str = "ERROR: Lost event type: ";

/// A call-site location as written in a dump
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Location {
            file: file.into(),
            line,
        }
    }

    /// Parse `file:line` (the file may itself contain colons)
    pub fn parse(text: &str) -> Option<Self> {
        let (file, line) = text.trim().rsplit_once(':')?;
        let line = line.trim().parse().ok()?;
        Some(Location::new(file, line))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One `<file>:<line> = <id>, <count>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEvent {
    pub location: Location,
    pub id: usize,
    pub count: u64,
}

/// One `<source> -> <target>: <count>` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTransition {
    pub source: usize,
    pub target: usize,
    pub count: u64,
}

/// A single thread's summary file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadSummary {
    pub events: Vec<SummaryEvent>,
    pub transitions: Vec<SummaryTransition>,
    /// Call sites reported by overflow markers
    pub lost_events: Vec<Location>,
}

impl ThreadSummary {
    pub fn location_of(&self, id: usize) -> Option<&Location> {
        self.events.iter().find(|e| e.id == id).map(|e| &e.location)
    }

    pub fn total_occurrences(&self) -> u64 {
        self.events.iter().map(|e| e.count).sum()
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> TraceError {
    TraceError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_event_line(text: &str, line: usize) -> Result<SummaryEvent, TraceError> {
    let (left, right) = text
        .rsplit_once(" = ")
        .ok_or_else(|| parse_error(line, "expected '<file>:<line> = <id>, <count>'"))?;
    let location =
        Location::parse(left).ok_or_else(|| parse_error(line, "bad call-site location"))?;
    let (id, count) = right
        .split_once(',')
        .ok_or_else(|| parse_error(line, "expected '<id>, <count>'"))?;
    let id = id
        .trim()
        .parse()
        .map_err(|_| parse_error(line, "bad event id"))?;
    let count = count
        .trim()
        .parse()
        .map_err(|_| parse_error(line, "bad occurrence count"))?;
    Ok(SummaryEvent {
        location,
        id,
        count,
    })
}

fn parse_transition_line(text: &str, line: usize) -> Result<SummaryTransition, TraceError> {
    let (source, rest) = text
        .split_once("->")
        .ok_or_else(|| parse_error(line, "expected '<source> -> <target>: <count>'"))?;
    let (target, count) = rest
        .split_once(':')
        .ok_or_else(|| parse_error(line, "expected '<target>: <count>'"))?;
    let parse_id = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| parse_error(line, "bad event id"))
    };
    Ok(SummaryTransition {
        source: parse_id(source)?,
        target: parse_id(target)?,
        count: count
            .trim()
            .parse()
            .map_err(|_| parse_error(line, "bad transition count"))?,
    })
}

/// Parse a summary file's contents
pub fn parse_summary(text: &str) -> Result<ThreadSummary, TraceError> {
    let mut summary = ThreadSummary::default();
    let mut transition_lines = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim_end();
        if raw.is_empty() {
            continue;
        }

        if let Some(rest) = raw.strip_prefix(LOST_PREFIX) {
            let location = rest
                .strip_suffix('!')
                .and_then(Location::parse)
                .ok_or_else(|| parse_error(line, "bad overflow marker"))?;
            summary.lost_events.push(location);
        } else if raw.contains(" = ") {
            // file names may contain "->", so event lines are keyed on " = "
            let event = parse_event_line(raw, line)?;
            if summary.location_of(event.id).is_some() {
                return Err(parse_error(line, format!("duplicate event id {}", event.id)));
            }
            summary.events.push(event);
        } else {
            summary.transitions.push(parse_transition_line(raw, line)?);
            transition_lines.push(line);
        }
    }

    for (transition, line) in summary.transitions.iter().zip(transition_lines) {
        for id in [transition.source, transition.target] {
            if summary.location_of(id).is_none() {
                return Err(parse_error(line, format!("unknown event id {}", id)));
            }
        }
    }

    Ok(summary)
}

/// Read and parse one summary file
pub fn read_summary_file<P: AsRef<Path>>(path: P) -> Result<ThreadSummary> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_summary(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn list_files<F: Fn(&str) -> bool>(dir: &Path, keep: F) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(&keep) && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Summary files (`*.im.out`) in `dir`, sorted by name
pub fn find_summary_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    list_files(dir.as_ref(), |name| name.ends_with(".im.out"))
}

/// Counts merged across any number of thread summaries
#[derive(Debug, Clone, Default)]
pub struct MergedSummary {
    pub threads: usize,
    pub event_counts: FnvHashMap<Location, u64>,
    pub transitions: FnvHashMap<(Location, Location), u64>,
    pub lost_events: u64,
}

impl MergedSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one thread's counts
    pub fn merge(&mut self, summary: &ThreadSummary) {
        self.threads += 1;
        self.lost_events += summary.lost_events.len() as u64;

        for event in &summary.events {
            *self.event_counts.entry(event.location.clone()).or_insert(0) += event.count;
        }

        for t in &summary.transitions {
            if let (Some(from), Some(to)) =
                (summary.location_of(t.source), summary.location_of(t.target))
            {
                *self
                    .transitions
                    .entry((from.clone(), to.clone()))
                    .or_insert(0) += t.count;
            }
        }
    }

    pub fn event_count(&self, location: &Location) -> u64 {
        self.event_counts.get(location).copied().unwrap_or(0)
    }

    pub fn transition_count(&self, from: &Location, to: &Location) -> u64 {
        self.transitions
            .get(&(from.clone(), to.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Sorted, serializable view with per-source transition probabilities
    pub fn report(&self) -> SummaryReport {
        let mut events: Vec<EventRow> = self
            .event_counts
            .iter()
            .map(|(location, &count)| EventRow {
                location: location.to_string(),
                count,
            })
            .collect();
        events.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));

        let mut outgoing: FnvHashMap<&Location, u64> = FnvHashMap::default();
        for ((from, _), &count) in &self.transitions {
            *outgoing.entry(from).or_insert(0) += count;
        }

        let mut keys: Vec<&(Location, Location)> = self.transitions.keys().collect();
        keys.sort();
        let transitions = keys
            .into_iter()
            .map(|key| {
                let count = self.transitions[key];
                let total = outgoing.get(&key.0).copied().unwrap_or(0);
                TransitionRow {
                    from: key.0.to_string(),
                    to: key.1.to_string(),
                    count,
                    probability: if total == 0 {
                        0.0
                    } else {
                        count as f64 / total as f64
                    },
                }
            })
            .collect();

        SummaryReport {
            threads: self.threads,
            lost_events: self.lost_events,
            events,
            transitions,
        }
    }
}

/// Merge any number of thread summaries
pub fn merge_summaries<'a, I>(summaries: I) -> MergedSummary
where
    I: IntoIterator<Item = &'a ThreadSummary>,
{
    let mut merged = MergedSummary::new();
    for summary in summaries {
        merged.merge(summary);
    }
    merged
}

/// Read and merge every summary file in `dir`
///
/// Unreadable or malformed files are skipped with a warning.
pub fn merge_directory<P: AsRef<Path>>(dir: P) -> Result<MergedSummary> {
    let mut merged = MergedSummary::new();
    for path in find_summary_files(dir)? {
        match read_summary_file(&path) {
            Ok(summary) => merged.merge(&summary),
            Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
        }
    }
    Ok(merged)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub location: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRow {
    pub from: String,
    pub to: String,
    pub count: u64,
    /// Share of the source's outgoing transitions
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub threads: usize,
    pub lost_events: u64,
    pub events: Vec<EventRow>,
    pub transitions: Vec<TransitionRow>,
}

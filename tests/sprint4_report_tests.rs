//! Dump directories read back through the analysis layer

use imtrace::analysis::{
    find_latency_files, latency_percentiles, merge_directory, parse_latency_file_name,
    read_latency_file, Location,
};
use imtrace::clock::ManualClock;
use imtrace::{ThreadTrace, TraceConfig};
use tempfile::TempDir;

fn run_workload(dir: &TempDir, rounds: usize) {
    let clock = ManualClock::new(0);
    let config = TraceConfig::new(dir.path(), 64);
    let mut trace = ThreadTrace::with_clock(&config, clock.clone()).unwrap();
    for _ in 0..rounds {
        trace.record_event("begin.c", 1);
        clock.advance(20_000);
        trace.record_event("commit.c", 2);
        clock.advance(5_000);
    }
    trace.dump();
}

#[test]
fn test_merge_two_thread_dumps() {
    let dir = TempDir::new().unwrap();
    // same pid/tid twice: the second summary gets suffix 1
    run_workload(&dir, 3);
    run_workload(&dir, 2);

    let merged = merge_directory(dir.path()).unwrap();
    let begin = Location::new("begin.c", 1);
    let commit = Location::new("commit.c", 2);

    assert_eq!(merged.threads, 2);
    assert_eq!(merged.event_count(&begin), 5);
    assert_eq!(merged.event_count(&commit), 5);
    assert_eq!(merged.transition_count(&begin, &commit), 5);
    assert_eq!(merged.transition_count(&commit, &begin), 3);

    let report = merged.report();
    let row = report
        .transitions
        .iter()
        .find(|r| r.from == "begin.c:1")
        .unwrap();
    assert_eq!(row.to, "commit.c:2");
    assert!((row.probability - 1.0).abs() < 1e-12);
}

#[test]
fn test_latency_files_read_back() {
    let dir = TempDir::new().unwrap();
    run_workload(&dir, 10);

    let files = find_latency_files(dir.path()).unwrap();
    assert!(!files.is_empty());

    for path in &files {
        let name = path.file_name().unwrap().to_str().unwrap();
        let info = parse_latency_file_name(name).unwrap();
        assert_eq!(info.pid, std::process::id() as i32);

        let samples = read_latency_file(path).unwrap();
        assert!(!samples.is_empty());
        let expected = if info.from.file == "begin.c" { 2.0 } else { 0.5 };
        assert!(samples.iter().all(|&s| (s - expected).abs() < 1e-9));

        let summary = latency_percentiles(&samples).unwrap();
        assert!((summary.values[9].value - expected).abs() < 1e-9);
    }
}

#[test]
fn test_empty_directory() {
    let dir = TempDir::new().unwrap();
    let merged = merge_directory(dir.path()).unwrap();
    assert_eq!(merged.threads, 0);
    let report = merged.report();
    assert!(report.events.is_empty());
    assert!(report.transitions.is_empty());
}

#[test]
fn test_missing_directory_is_an_error() {
    assert!(merge_directory("/nonexistent/imtrace-report").is_err());
}

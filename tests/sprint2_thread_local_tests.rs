//! Thread-local entry points
//!
//! Every test body runs on a fresh thread so that each one starts from an
//! untouched per-thread trace.

use imtrace::analysis::{find_summary_files, read_summary_file};
use imtrace::{EventId, TraceConfig, TraceError};
use std::path::Path;
use std::sync::OnceLock;
use std::thread;
use tempfile::TempDir;

const CAPACITY: usize = 128;

/// Process-wide dump directory under the target dir's scratch space
fn output_dir() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = TempDir::new_in(env!("CARGO_TARGET_TMPDIR")).unwrap();
        imtrace::configure(TraceConfig::new(dir.path(), CAPACITY)).unwrap();
        dir
    })
    .path()
}

fn on_fresh_thread<F: FnOnce() + Send + 'static>(f: F) {
    output_dir();
    thread::spawn(f).join().unwrap();
}

fn occupied() -> usize {
    imtrace::with_event_records(|records| records.iter().filter(|r| r.is_occupied()).count())
        .unwrap_or(0)
}

#[test]
fn test_untouched_thread_has_no_state() {
    on_fresh_thread(|| {
        assert!(!imtrace::is_overflowed());
        assert_eq!(imtrace::last_event_id(), None);
        assert!(imtrace::with_event_records(|r| r.len()).is_none());
        assert_eq!(imtrace::capacity(), CAPACITY);
        // dumping nothing is a no-op
        imtrace::dump_thread_trace();
    });
}

#[test]
fn test_record_lazily_initializes() {
    on_fresh_thread(|| {
        imtrace::record_event("lazy.c", 3);
        assert!(imtrace::last_event_id().is_some());
        assert_eq!(occupied(), 1);
        assert_eq!(imtrace::capacity(), CAPACITY);
    });
}

#[test]
fn test_x_y_x_through_thread_api() {
    on_fresh_thread(|| {
        imtrace::initialize_thread_trace();
        imtrace::record_event("x.c", 1);
        let x = imtrace::last_event_id().unwrap();
        imtrace::record_event("y.c", 2);
        let y = imtrace::last_event_id().unwrap();
        imtrace::record_event("x.c", 1);

        let counts = imtrace::with_thread_trace(|t| {
            (t.transition_count(x, x), t.transition_count(x, y), t.transition_count(y, x))
        });
        assert_eq!(counts, Some((0, 1, 1)));
        let total: u64 =
            imtrace::with_event_records(|r| r.iter().map(|e| e.occurrence_count()).sum()).unwrap();
        assert_eq!(total, 3);
    });
}

#[test]
fn test_initialize_wipes_thread_state() {
    on_fresh_thread(|| {
        imtrace::record_event("a.c", 1);
        imtrace::record_event("b.c", 1);
        imtrace::initialize_thread_trace();
        assert_eq!(occupied(), 0);
        assert_eq!(imtrace::last_event_id(), None);
        imtrace::initialize_thread_trace();
        assert_eq!(occupied(), 0);
    });
}

#[test]
fn test_resolve_is_idempotent() {
    on_fresh_thread(|| {
        let first = imtrace::resolve_or_register("resolve.c", 77).unwrap();
        let second = imtrace::resolve_or_register("resolve.c", 77).unwrap();
        assert_eq!(first, second);
        // resolving does not count an occurrence
        assert_eq!(imtrace::last_event_id(), None);
        let count = imtrace::with_event_records(|r| r[first.index()].occurrence_count());
        assert_eq!(count, Some(0));
    });
}

#[test]
fn test_resolve_reports_overflow() {
    on_fresh_thread(|| {
        for line in 0..CAPACITY as u32 {
            imtrace::resolve_or_register("fill.c", line).unwrap();
        }
        let err = imtrace::resolve_or_register("fill.c", 100_000).unwrap_err();
        assert!(err.is_overflow());
        assert!(matches!(err, TraceError::Overflow { line: 100_000, .. }));
    });
}

#[test]
fn test_resolve_while_trace_borrowed_is_unavailable() {
    on_fresh_thread(|| {
        let nested = imtrace::with_thread_trace(|_| imtrace::resolve_or_register("nested.c", 1));
        assert!(matches!(nested, Some(Err(TraceError::Unavailable))));
        // the outer borrow is released afterwards
        assert!(imtrace::resolve_or_register("nested.c", 1).is_ok());
    });
}

#[test]
fn test_record_overflow_sets_flag() {
    on_fresh_thread(|| {
        for line in 0..CAPACITY as u32 {
            imtrace::record_event("flood.c", line);
        }
        assert!(!imtrace::is_overflowed());
        let last = imtrace::last_event_id();
        imtrace::record_event("flood.c", CAPACITY as u32);
        assert!(imtrace::is_overflowed());
        assert_eq!(imtrace::last_event_id(), last);
        assert_eq!(occupied(), CAPACITY);
    });
}

#[test]
fn test_hash_ignores_directories() {
    assert_eq!(
        imtrace::hash("src/backend/xlog.c", 12),
        imtrace::hash("xlog.c", 12)
    );
    assert_ne!(imtrace::hash("xlog.c", 12), imtrace::hash("xlog.c", 13));
    assert_ne!(imtrace::hash("xlog.c", 12), imtrace::hash("xact.c", 12));
    assert_eq!(imtrace::hash("xlog.c\0\0\0", 12), imtrace::hash("xlog.c", 12));
}

#[test]
fn test_decide_sampling_first_occurrence() {
    on_fresh_thread(|| {
        let id = imtrace::resolve_or_register("sample.c", 1).unwrap();
        // zero occurrences always samples
        assert!(imtrace::decide_sampling(id));
        assert!(imtrace::with_thread_trace(|t| t.sampling_pending()).unwrap());
    });
}

#[test]
fn test_decide_sampling_unknown_id() {
    on_fresh_thread(|| {
        imtrace::initialize_thread_trace();
        assert!(imtrace::decide_sampling(EventId::new(CAPACITY + 5)));
    });
}

#[test]
fn test_macro_records_own_call_site() {
    on_fresh_thread(|| {
        imtrace::record_event!();
        let id = imtrace::last_event_id().unwrap();
        let site = imtrace::with_event_records(|r| r[id.index()].site()).flatten().unwrap();
        assert_eq!(site.file.as_str(), "sprint2_thread_local_tests.rs");
    });
}

#[test]
fn test_dump_writes_one_summary_per_thread() {
    on_fresh_thread(|| {
        imtrace::record_event("dumped.c", 10);
        imtrace::record_event("dumped.c", 11);
        let path = imtrace::with_thread_trace(|t| t.output_path().map(Path::to_path_buf))
            .flatten()
            .unwrap();
        imtrace::dump_thread_trace();
        imtrace::dump_thread_trace();

        let summary = read_summary_file(&path).unwrap();
        assert_eq!(summary.events.len(), 2);
        assert_eq!(summary.total_occurrences(), 2);
        assert_eq!(summary.transitions.len(), 1);
    });
    assert!(!find_summary_files(output_dir()).unwrap().is_empty());
}

#[test]
fn test_threads_are_isolated() {
    output_dir();
    let handles: Vec<_> = (0..4u32)
        .map(|n| {
            thread::spawn(move || {
                for _ in 0..=n {
                    imtrace::record_event("shared.c", 1);
                }
                imtrace::with_event_records(|r| r.iter().map(|e| e.occurrence_count()).sum::<u64>())
                    .unwrap()
            })
        })
        .collect();

    let totals: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(totals, vec![1, 2, 3, 4]);
}

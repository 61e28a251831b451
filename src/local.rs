//! Thread-scoped entry points
//!
//! Each thread lazily gets its own `ThreadTrace` on the first recorded event.
//! All functions here are infallible from the host's point of view: if the
//! trace cannot be created or is already borrowed (re-entrant call from a
//! logging hook, thread teardown), the call degrades to a no-op.

use std::cell::RefCell;

use crate::call_site::{event_hash, strip_path};
use crate::config;
use crate::error::{Result, TraceError};
use crate::fork;
use crate::registry::{EventId, EventRecord};
use crate::state::ThreadTrace;

thread_local! {
    static TRACE: RefCell<Option<ThreadTrace>> = const { RefCell::new(None) };
}

fn create() -> Option<ThreadTrace> {
    fork::install_fork_handler();
    match ThreadTrace::new(config::global()) {
        Ok(trace) => Some(trace),
        Err(e) => {
            tracing::warn!("could not initialize thread trace: {}", e);
            None
        }
    }
}

/// Run `f` on this thread's trace, creating it first if needed
///
/// Returns `None` if the trace is unavailable.
pub fn with_thread_trace<R, F>(f: F) -> Option<R>
where
    F: FnOnce(&mut ThreadTrace) -> R,
{
    TRACE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            if slot.is_none() {
                *slot = create();
            }
            slot.as_mut().map(f)
        })
        .ok()
        .flatten()
}

/// Run `f` on this thread's trace only if it already exists
fn with_existing<R, F>(f: F) -> Option<R>
where
    F: FnOnce(&mut ThreadTrace) -> R,
{
    TRACE
        .try_with(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            slot.as_mut().map(f)
        })
        .ok()
        .flatten()
}

/// Initialize (or wipe) this thread's trace
pub fn initialize_thread_trace() {
    let existed = with_existing(|trace| trace.reinitialize()).is_some();
    if !existed {
        with_thread_trace(|_| ());
    }
}

/// Record one occurrence of `file:line` on this thread
#[inline]
pub fn record_event(file: &'static str, line: u32) {
    with_thread_trace(|trace| trace.record_event(file, line));
}

/// Write this thread's dump files (once)
pub fn dump_thread_trace() {
    with_existing(|trace| trace.dump());
}

/// Whether this thread has lost a call site to registry overflow
pub fn is_overflowed() -> bool {
    with_existing(|trace| trace.is_overflowed()).unwrap_or(false)
}

/// Registry slots per thread
pub fn capacity() -> usize {
    with_existing(|trace| trace.capacity()).unwrap_or_else(|| config::global().capacity)
}

/// Id of this thread's most recent event
pub fn last_event_id() -> Option<EventId> {
    with_existing(|trace| trace.last_event_id()).flatten()
}

/// Read this thread's registry slots
///
/// Returns `None` if tracing has not started on this thread.
pub fn with_event_records<R, F>(f: F) -> Option<R>
where
    F: FnOnce(&[EventRecord]) -> R,
{
    TRACE
        .try_with(|cell| {
            let slot = cell.try_borrow().ok()?;
            slot.as_ref().map(|trace| f(trace.event_records()))
        })
        .ok()
        .flatten()
}

/// Registry hash for `file:line` (path stripped)
pub fn hash(file: &str, line: u32) -> u64 {
    event_hash(strip_path(file), line)
}

/// Resolve `file:line` to an event id without recording an occurrence
pub fn resolve_or_register(file: &'static str, line: u32) -> Result<EventId> {
    with_thread_trace(|trace| trace.resolve_or_register(file, line))
        .unwrap_or(Err(TraceError::Unavailable))
}

/// Run the sampling policy for `id` on this thread
pub fn decide_sampling(id: EventId) -> bool {
    with_thread_trace(|trace| trace.decide_sampling(id)).unwrap_or(false)
}

/// Post-fork child callback: reset this thread's trace if it has one
pub fn recover_after_fork() {
    fork::guarded(|| {
        with_existing(|trace| trace.recover_after_fork());
    });
}

/// Record an event at the macro's own call site
///
/// ```no_run
/// imtrace::record_event!();
/// ```
#[macro_export]
macro_rules! record_event {
    () => {
        $crate::record_event(::std::file!(), ::std::line!())
    };
}

//! imtrace - in-memory per-thread event tracer
//!
//! Instrumented code calls [`record_event`] (or the [`record_event!`] macro)
//! at interesting call sites. Each thread keeps its own registry of call
//! sites, a sparse Markov transition ledger between consecutive events, and
//! a biased reservoir of inter-event latencies. Nothing is shared between
//! threads and nothing is written until [`dump_thread_trace`] runs, so the
//! recording path takes no locks and does no I/O.
//!
//! Dumps land in the configured output directory:
//!
//! - `<pid>.<tid>.<n>.im.out` - event counts and transition counts
//! - `event-flat-<f1>:<l1>-<f2>:<l2>-<pid>-<tid>-im` - one latency reservoir
//!
//! The [`analysis`] module and the `imtrace-report` binary read them back.

pub mod adaptive_sampler;
pub mod analysis;
pub mod call_site;
pub mod cli;
pub mod clock;
pub mod config;
pub mod dump;
pub mod error;
pub mod fork;
mod local;
pub mod output;
pub mod prng;
pub mod registry;
pub mod reservoir;
pub mod sparse;
pub mod state;
pub mod transitions;

pub use adaptive_sampler::SamplingPolicy;
pub use call_site::{CallSite, FileId};
pub use config::{configure, TraceConfig};
pub use error::{Result, TraceError};
pub use local::{
    capacity, decide_sampling, dump_thread_trace, hash, initialize_thread_trace, is_overflowed,
    last_event_id, record_event, recover_after_fork, resolve_or_register, with_event_records,
    with_thread_trace,
};
pub use registry::{EventId, EventRecord, EventRegistry, NEVENTS};
pub use reservoir::{LATENCY_SCALE, RESERVOIR_SIZE};
pub use state::ThreadTrace;

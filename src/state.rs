//! Per-thread trace state and the recording algorithm
//!
//! A `ThreadTrace` is owned by exactly one thread for its whole life. Nothing
//! in it is shared, so the recording path takes no locks and touches no
//! atomics. Hosts either hold one explicitly per worker or go through the
//! thread-local accessor in [`crate::local`].

use std::path::{Path, PathBuf};

use crate::adaptive_sampler::SamplingPolicy;
use crate::call_site::CallSite;
use crate::clock::{elapsed_since, Clock, SystemClock};
use crate::config::TraceConfig;
use crate::dump::{dump_latency_files, dump_summary, overflow_marker};
use crate::error::Result;
use crate::fork::in_recovery;
use crate::output::{OutputHandle, ThreadIds};
use crate::prng::FastRand;
use crate::registry::{EventId, EventRecord, EventRegistry};
use crate::reservoir::{normalize_latency, observe_latency};
use crate::transitions::{record_transition, transition_count};

/// Everything one thread knows about its event stream
#[derive(Debug)]
pub struct ThreadTrace<C: Clock = SystemClock> {
    registry: EventRegistry,
    last_event: Option<EventId>,
    overflowed: bool,
    /// Decided while recording the previous event; consumed by the next one
    sample_next: bool,
    last_sample_timestamp: u64,
    rng: FastRand,
    policy: SamplingPolicy,
    output: OutputHandle,
    output_dir: PathBuf,
    ids: ThreadIds,
    clock: C,
}

impl ThreadTrace<SystemClock> {
    /// Initialize tracing for the calling thread
    pub fn new(config: &TraceConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> ThreadTrace<C> {
    /// Initialize with an explicit time source
    pub fn with_clock(config: &TraceConfig, clock: C) -> Result<Self> {
        config.validate()?;
        let registry = EventRegistry::new(config.capacity)?;
        let ids = ThreadIds::current();
        let output = OutputHandle::open(&config.output_dir, ids);

        tracing::debug!(
            "initialized tracing for {}.{} ({} slots)",
            ids.pid,
            ids.tid,
            config.capacity
        );

        Ok(ThreadTrace {
            registry,
            last_event: None,
            overflowed: false,
            sample_next: false,
            last_sample_timestamp: 0,
            rng: FastRand::new(ids.seed()),
            policy: SamplingPolicy::new(),
            output,
            output_dir: config.output_dir.clone(),
            ids,
            clock,
        })
    }

    /// Wipe all recorded state
    ///
    /// An open or finalized output handle is kept; an unopened or failed one
    /// is (re)opened.
    pub fn reinitialize(&mut self) {
        self.registry.clear();
        self.last_event = None;
        self.overflowed = false;
        self.sample_next = false;
        self.last_sample_timestamp = 0;
        self.ids = ThreadIds::current();
        self.rng.reseed(self.ids.seed());

        if matches!(self.output, OutputHandle::Unopened | OutputHandle::Failed) {
            self.output = OutputHandle::open(&self.output_dir, self.ids);
        }

        if !in_recovery() {
            tracing::debug!("reinitialized tracing for {}.{}", self.ids.pid, self.ids.tid);
        }
    }

    /// Drop the output handle without writing to it
    pub fn invalidate_output(&mut self) {
        self.output = OutputHandle::Unopened;
    }

    /// Reset after `fork()` in the child: fresh state, seed and summary file
    pub fn recover_after_fork(&mut self) {
        self.invalidate_output();
        self.reinitialize();
    }

    /// Record one occurrence of `file:line`
    pub fn record_event(&mut self, file: &'static str, line: u32) {
        self.record(CallSite::new(file, line));
    }

    /// Record one occurrence of a call site
    pub fn record(&mut self, site: CallSite) {
        let id = match self.registry.resolve(site) {
            Ok(id) => id,
            Err(_) => {
                self.note_overflow(site);
                return;
            }
        };

        if let Some(record) = self.registry.get_mut(id) {
            record.count += 1;
        }

        let mut observed_at = None;
        if let Some(prev) = self.last_event {
            if let Some(source) = self.registry.get_mut(prev) {
                record_transition(source, id);

                if self.sample_next {
                    let now = self.clock.now_nanos();
                    let elapsed = elapsed_since(self.last_sample_timestamp, now);
                    observe_latency(source, id, normalize_latency(elapsed), &mut self.rng);
                    observed_at = Some(now);
                }
            }
        }

        let was_sampling = self.sample_next;
        if self.decide_sampling(id) {
            // chain off the observation time when the previous transition was timed
            self.last_sample_timestamp = match observed_at {
                Some(now) if was_sampling => now,
                _ => self.clock.now_nanos(),
            };
        }

        self.last_event = Some(id);
    }

    /// Resolve a call site without recording an occurrence
    pub fn resolve_or_register(&mut self, file: &'static str, line: u32) -> Result<EventId> {
        self.registry.resolve(CallSite::new(file, line))
    }

    /// Decide (and remember) whether the transition leaving `id` is timed
    pub fn decide_sampling(&mut self, id: EventId) -> bool {
        let count = self.registry.get(id).map_or(0, EventRecord::occurrence_count);
        self.sample_next = self.policy.decide(count, &mut self.rng);
        self.sample_next
    }

    /// Write the summary and latency files; no-op after the first call
    pub fn dump(&mut self) {
        if self.output.is_finalized() {
            return;
        }

        match self.output.finalize() {
            Some(sink) => dump_summary(sink, &self.registry),
            None => tracing::warn!(
                "no summary file for {}.{}, writing latency files only",
                self.ids.pid,
                self.ids.tid
            ),
        }

        let files = dump_latency_files(&self.output_dir, &self.registry, self.ids);
        tracing::debug!(
            "dumped {} events and {} latency files for {}.{}",
            self.registry.occupied_count(),
            files,
            self.ids.pid,
            self.ids.tid
        );
    }

    fn note_overflow(&mut self, site: CallSite) {
        if !self.overflowed {
            tracing::warn!(
                "event registry full ({} slots), dropping {}",
                self.registry.capacity(),
                site
            );
        }
        self.overflowed = true;
        if let Some(sink) = self.output.sink_mut() {
            sink.write_str(&overflow_marker(site));
        }
    }

    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn capacity(&self) -> usize {
        self.registry.capacity()
    }

    pub fn last_event_id(&self) -> Option<EventId> {
        self.last_event
    }

    /// Read-only view of every registry slot
    pub fn event_records(&self) -> &[EventRecord] {
        self.registry.records()
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    /// `source -> target` count, zero if either id is unknown
    pub fn transition_count(&self, source: EventId, target: EventId) -> u64 {
        self.registry
            .get(source)
            .map_or(0, |record| transition_count(record, target))
    }

    /// Whether the next transition will be timed
    pub fn sampling_pending(&self) -> bool {
        self.sample_next
    }

    pub fn last_sample_timestamp(&self) -> u64 {
        self.last_sample_timestamp
    }

    pub fn output(&self) -> &OutputHandle {
        &self.output
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn thread_ids(&self) -> ThreadIds {
        self.ids
    }
}

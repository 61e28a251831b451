//! Fixed-capacity latency sample pools
//!
//! One reservoir per observed `(source, target)` transition. Until full, every
//! observation is appended. Once full, each observation overwrites a uniformly
//! random slot unconditionally.
//!
//! This is NOT Algorithm R: the admission probability does not decay with the
//! number of observations, so recent values are favored.

use crate::prng::FastRand;
use crate::registry::{EventId, EventRecord};
use crate::sparse::{SparseRow, Targeted};

/// Samples kept per transition
pub const RESERVOIR_SIZE: usize = 1000;

/// Raw nanoseconds per stored latency unit
pub const LATENCY_SCALE: f64 = 10_000.0;

/// Convert raw elapsed nanoseconds to the stored sample unit
#[inline]
pub fn normalize_latency(elapsed_nanos: u64) -> f64 {
    elapsed_nanos as f64 / LATENCY_SCALE
}

/// Latency samples for one `source -> target` transition
#[derive(Debug, Clone)]
pub struct Reservoir {
    target: EventId,
    samples: Vec<f64>,
}

impl Reservoir {
    pub fn new(target: EventId) -> Self {
        Reservoir {
            target,
            samples: Vec::with_capacity(RESERVOIR_SIZE),
        }
    }

    /// Add one normalized latency
    pub fn observe(&mut self, value: f64, rng: &mut FastRand) {
        if self.samples.len() < RESERVOIR_SIZE {
            self.samples.push(value);
            return;
        }

        let slot = rng.next() as usize % RESERVOIR_SIZE;
        self.samples[slot] = value;
    }

    /// Number of filled slots
    pub fn fill_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == RESERVOIR_SIZE
    }

    /// Samples in slot order
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

impl Targeted for Reservoir {
    fn target(&self) -> EventId {
        self.target
    }
}

/// A source event's reservoirs, ascending by target
pub type ReservoirRow = SparseRow<Reservoir>;

/// Feed a normalized latency for `source -> target`
pub fn observe_latency(source: &mut EventRecord, target: EventId, value: f64, rng: &mut FastRand) {
    source
        .latencies
        .get_or_insert_with(target, Reservoir::new)
        .observe(value, rng);
}

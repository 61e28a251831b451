//! Adaptive Sampling of Transition Latencies
//!
//! Every clock read on the hot path costs a syscall-class operation, so
//! latencies are only timed for a subset of transitions. The decision is made
//! when an event is recorded and applies to the transition *leaving* it.
//!
//! # Strategy
//!
//! | Occurrences of current event | Probability of timing the next transition |
//! |------------------------------|--------------------------------------------|
//! | 0 (first sighting)           | 100%                                       |
//! | n <= RESERVOIR_SIZE          | 100% (weight >= 1)                         |
//! | n > RESERVOIR_SIZE           | ~RESERVOIR_SIZE / n                        |
//!
//! Rare events fill their reservoirs quickly; hot events are timed less and
//! less often, bounding total timer overhead as the event stream grows.
//!
//! The probability is conditioned on the current event's frequency, not on the
//! frequency of the transition about to happen, since the next event is not
//! known yet.

use crate::prng::FastRand;
use crate::reservoir::RESERVOIR_SIZE;

/// Occurrence-weighted sampling policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingPolicy {
    /// Numerator of the sampling weight
    reservoir_size: usize,
}

impl SamplingPolicy {
    /// Policy weighted by the standard reservoir size
    pub fn new() -> Self {
        SamplingPolicy {
            reservoir_size: RESERVOIR_SIZE,
        }
    }

    /// Sampling weight for an event seen `occurrence_count` times
    ///
    /// Values >= 1.0 mean "always sample".
    pub fn weight(&self, occurrence_count: u64) -> f64 {
        if occurrence_count == 0 {
            return f64::INFINITY;
        }
        self.reservoir_size as f64 / occurrence_count as f64
    }

    /// Decide whether the transition leaving this event should be timed
    ///
    /// While recording, `occurrence_count` already includes the occurrence
    /// being recorded. Draws from `rng` only when the count is non-zero.
    pub fn decide(&self, occurrence_count: u64, rng: &mut FastRand) -> bool {
        if occurrence_count == 0 {
            return true;
        }

        let weight = self.weight(occurrence_count);
        let f = rng.next_unit();
        f <= weight
    }

    /// Expected fraction of transitions timed after `occurrence_count` sightings
    pub fn expected_rate(&self, occurrence_count: u64) -> f64 {
        self.weight(occurrence_count).min(1.0)
    }
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

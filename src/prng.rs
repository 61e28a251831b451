//! Per-thread linear congruential generator
//!
//! One multiply-add per draw, no shared state.
//! Output range is `[0, RAND_RANGE]` (15 bits).

use crate::reservoir::RESERVOIR_SIZE;

/// Largest value `FastRand::next` can return
pub const RAND_RANGE: u32 = 32767;

// Slot selection is `next() % RESERVOIR_SIZE`; a reservoir larger than the
// output range would leave slots that can never be overwritten.
const _: () = assert!(
    (RESERVOIR_SIZE as u32) < RAND_RANGE,
    "reservoir size must be less than PRNG range"
);

/// 64-bit LCG (`state = 214013 * state + 2531011`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastRand {
    state: u64,
}

impl FastRand {
    /// Create a generator from an explicit seed
    pub fn new(seed: u64) -> Self {
        FastRand { state: seed }
    }

    /// Re-seed in place
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }

    /// Current raw state (for tests and diagnostics)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Advance and return the next value in `[0, RAND_RANGE]`
    #[inline]
    pub fn next(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(214_013)
            .wrapping_add(2_531_011);
        ((self.state >> 16) & 0x7FFF) as u32
    }

    /// Next value normalized to `[0.0, 1.0]`
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        f64::from(self.next()) / f64::from(RAND_RANGE)
    }
}

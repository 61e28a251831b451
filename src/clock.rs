//! Nanosecond time sources for latency measurement
//!
//! The recording path is generic over `Clock` so that tests can drive time by
//! hand. Dispatch is static; `SystemClock` compiles down to one clock read.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock nanoseconds
pub trait Clock {
    /// Nanoseconds since an arbitrary fixed epoch
    ///
    /// Not required to be monotonic; callers clamp negative deltas to zero.
    fn now_nanos(&self) -> u64;
}

/// `CLOCK_REALTIME` nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_nanos(&self) -> u64 {
        // before-epoch clocks read as 0
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64)
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        ManualClock {
            nanos: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, nanos: u64) {
        self.nanos.set(nanos);
    }

    pub fn advance(&self, nanos: u64) {
        self.nanos.set(self.nanos.get().wrapping_add(nanos));
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.get()
    }
}

/// Elapsed nanoseconds, clamped to 0 if the clock went backwards
#[inline]
pub fn elapsed_since(start: u64, now: u64) -> u64 {
    now.saturating_sub(start)
}

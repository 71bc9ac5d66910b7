//! Time source for record timestamps and session tokens.

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds.
pub type EpochMs = i64;

/// Source of the current time in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> EpochMs;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> EpochMs {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                EpochMs::try_from(elapsed.as_millis()).unwrap_or(EpochMs::MAX)
            })
    }
}

/// Manually driven clock for deterministic callers.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<EpochMs>,
}

impl ManualClock {
    pub fn new(start_ms: EpochMs) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: EpochMs) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: EpochMs) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> EpochMs {
        self.now.get()
    }
}

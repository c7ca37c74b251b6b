//! Clock capability
//!
//! The dispatcher reads time only through [`Clock`], so tests can drive it
//! with a [`ManualClock`] instead of wall-clock delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond clock
pub trait Clock: Send + Sync {
    /// Current time in milliseconds. Never decreases.
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since construction
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start_instant: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start_instant.elapsed().as_millis() as u64
    }
}

/// Clock that only moves when told to
///
/// Cheap to clone; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move to `ms`. Earlier values are ignored so time never goes backwards.
    pub fn set(&self, ms: u64) {
        self.now_ms.fetch_max(ms, Ordering::SeqCst);
    }

    /// Move forward by `ms`
    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

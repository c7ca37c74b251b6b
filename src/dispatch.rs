//! Outbound dispatch - rate-limited relay of envelopes to the peer
//!
//! The dispatcher never touches platform time directly: it reads a [`Clock`]
//! and arms timers through a [`Scheduler`], both injected at construction.

mod clock;
mod dispatcher;
mod timer;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use dispatcher::{SendCallback, ThrottledDispatcher, DEFAULT_THROTTLE_MS};
pub use timer::{
    ManualScheduler, Scheduler, SchedulerError, TimerCallback, TimerHandle, TokioScheduler,
};

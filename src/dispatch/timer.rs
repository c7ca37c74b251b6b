//! Delayed-execution capability
//!
//! [`Scheduler`] arms one-shot callbacks. [`TokioScheduler`] backs them with
//! tokio timers; [`ManualScheduler`] holds them until the test advances time.

use super::clock::{Clock, ManualClock};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

/// Callback run once when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Opaque handle to an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Errors raised while setting up a scheduler
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Arms one-shot delayed callbacks
pub trait Scheduler: Send + Sync {
    /// Run `callback` once after `delay`
    fn schedule(&self, callback: TimerCallback, delay: Duration) -> TimerHandle;

    /// Cancel an armed timer. Unknown or already fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

/// Scheduler backed by `tokio::time::sleep`
pub struct TokioScheduler {
    runtime: Handle,
    /// Abort handles of timers that have not fired yet
    timers: Arc<Mutex<HashMap<u64, AbortHandle>>>,
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Scheduler on the runtime the caller is running in
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn current() -> Result<Self, SchedulerError> {
        Ok(Self::with_handle(Handle::try_current()?))
    }

    /// Scheduler spawning its timers on `runtime`
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of timers armed and not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);

        // Held across the spawn so the task cannot deregister before it is registered
        let mut armed = self.timers.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            timers.lock().remove(&id);
            trace!("Timer {} fired", id);
            callback();
        });
        armed.insert(id, task.abort_handle());

        trace!("Timer {} armed ({:?})", id, delay);
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(task) = self.timers.lock().remove(&handle.0) {
            task.abort();
            trace!("Timer {} cancelled", handle.0);
        }
    }
}

struct ManualTimer {
    id: u64,
    due_ms: u64,
    callback: TimerCallback,
}

/// Scheduler whose timers fire only when time is advanced explicitly
///
/// Shares a [`ManualClock`] with the code under test. Advancing moves the
/// clock to each timer's due time before firing it, in due order.
pub struct ManualScheduler {
    clock: ManualClock,
    timers: Mutex<Vec<ManualTimer>>,
    next_id: AtomicU64,
    created: AtomicU64,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            timers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            created: AtomicU64::new(0),
        }
    }

    /// Number of timers ever armed
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of timers armed and not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.timers.lock().len()
    }

    /// Due time of the earliest armed timer
    pub fn next_due(&self) -> Option<u64> {
        self.timers.lock().iter().map(|t| t.due_ms).min()
    }

    /// Advance the clock by `ms`, firing every timer that comes due
    pub fn advance_by(&self, ms: u64) -> usize {
        self.advance_to(self.clock.now_ms() + ms)
    }

    /// Advance the clock to `target_ms`, firing every timer due by then
    ///
    /// Callbacks may arm new timers; those fire too if they are due by
    /// `target_ms`. Returns the number of callbacks run.
    pub fn advance_to(&self, target_ms: u64) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.pop_due(target_ms) {
            self.clock.set(timer.due_ms);
            trace!("Manual timer {} fired at {}ms", timer.id, timer.due_ms);
            (timer.callback)();
            fired += 1;
        }
        self.clock.set(target_ms);
        fired
    }

    fn pop_due(&self, target_ms: u64) -> Option<ManualTimer> {
        let mut timers = self.timers.lock();
        let idx = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= target_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id))
            .map(|(idx, _)| idx)?;
        Some(timers.remove(idx))
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created.fetch_add(1, Ordering::SeqCst);
        let due_ms = self.clock.now_ms() + delay.as_millis() as u64;
        self.timers.lock().push(ManualTimer {
            id,
            due_ms,
            callback,
        });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.timers.lock().retain(|t| t.id != handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> TimerCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = Arc::clone(&count);
            move || -> TimerCallback {
                let count = Arc::clone(&count);
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
            }
        };
        (count, make)
    }

    #[test]
    fn test_manual_fires_in_due_order() {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock.clone());
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("late", 300u64), ("early", 100)] {
            let order = Arc::clone(&order);
            let seen = clock.clone();
            scheduler.schedule(
                Box::new(move || order.lock().push((label, seen.now_ms()))),
                Duration::from_millis(delay),
            );
        }

        assert_eq!(scheduler.next_due(), Some(100));
        assert_eq!(scheduler.advance_to(250), 1);
        assert_eq!(clock.now_ms(), 250);
        assert_eq!(scheduler.advance_by(100), 1);

        assert_eq!(*order.lock(), vec![("early", 100), ("late", 300)]);
        assert_eq!(scheduler.created(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_cancel() {
        let clock = ManualClock::new(0);
        let scheduler = ManualScheduler::new(clock);
        let (count, make) = counter();

        let handle = scheduler.schedule(make(), Duration::from_millis(10));
        let kept = scheduler.schedule(make(), Duration::from_millis(20));
        assert_ne!(handle.id(), kept.id());

        scheduler.cancel(handle);
        scheduler.advance_to(100);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.created(), 2);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_fires() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, make) = counter();

        scheduler.schedule(make(), Duration::from_millis(20));
        assert_eq!(scheduler.pending(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel() {
        let scheduler = TokioScheduler::current().unwrap();
        let (count, make) = counter();

        let handle = scheduler.schedule(make(), Duration::from_millis(50));
        scheduler.cancel(handle);
        assert_eq!(scheduler.pending(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tokio_scheduler_requires_runtime() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(SchedulerError::NoRuntime(_))
        ));
    }
}

//! Throttled dispatcher - at most one send per window, latest state always wins
//!
//! # Throttling Strategy
//!
//! 1. Every request replaces the pending envelope (last-write-wins).
//! 2. If a flush is already armed, nothing else happens: the armed flush
//!    picks up whatever is pending when it fires.
//! 3. Otherwise, if a full window has passed since the last send, the
//!    envelope goes out immediately (leading edge).
//! 4. Otherwise a single flush is armed for the end of the window
//!    (trailing edge).
//!
//! At most one timer is ever outstanding, so a burst of any size inside one
//! window produces exactly one send carrying its final envelope.

use super::clock::Clock;
use super::timer::{Scheduler, TimerHandle};
use parking_lot::{Mutex, MutexGuard, ReentrantMutex};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Default throttle window in milliseconds
pub const DEFAULT_THROTTLE_MS: u64 = 400;

/// Sentinel for "never sent": far enough back that any clock reading is a full window later
const LONG_AGO_MS: i64 = i64::MIN;

/// Transport callback receiving each outbound envelope
///
/// Called synchronously from the flush; must not block.
pub type SendCallback<E> = Arc<dyn Fn(E) + Send + Sync>;

struct DispatchState<E> {
    /// Clock reading at the most recent send
    last_send_ms: i64,
    /// Latest requested envelope not yet sent
    pending: Option<E>,
    /// Outstanding delayed flush, at most one
    scheduled: Option<TimerHandle>,
    disposed: bool,
    send_count: u64,
}

struct Shared<E> {
    window_ms: u64,
    send: SendCallback<E>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<DispatchState<E>>,
    /// Held across every transport call; `dispose` waits on it.
    /// Reentrant so the transport may call back into the dispatcher.
    send_gate: ReentrantMutex<()>,
}

/// Relays envelopes to the transport at most once per throttle window
///
/// Cheap to clone; clones drive the same dispatcher.
pub struct ThrottledDispatcher<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for ThrottledDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Send + 'static> ThrottledDispatcher<E> {
    /// Create a dispatcher sending through `send` at most once per `window`
    pub fn new(
        window: Duration,
        send: SendCallback<E>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let window_ms = window.as_millis() as u64;
        debug!("Throttled dispatcher created (window: {}ms)", window_ms);

        Self {
            shared: Arc::new(Shared {
                window_ms,
                send,
                clock,
                scheduler,
                state: Mutex::new(DispatchState {
                    last_send_ms: LONG_AGO_MS,
                    pending: None,
                    scheduled: None,
                    disposed: false,
                    send_count: 0,
                }),
                send_gate: ReentrantMutex::new(()),
            }),
        }
    }

    /// Request that `envelope` be sent
    ///
    /// Sends before returning when the window has elapsed, otherwise arms a
    /// single flush for the end of the window. Any envelope requested earlier
    /// and not yet sent is discarded.
    pub fn request_send(&self, envelope: E) {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.disposed {
            trace!("Dispatcher disposed, dropping request");
            return;
        }

        state.pending = Some(envelope);

        if state.scheduled.is_some() {
            trace!("Flush already armed, pending envelope replaced");
            return;
        }

        let now = shared.clock.now_ms() as i64;
        let elapsed = now.saturating_sub(state.last_send_ms);
        let window = shared.window_ms as i64;

        if elapsed >= window {
            trace!("Window elapsed ({}ms), sending immediately", elapsed);
            shared.flush_locked(state);
        } else {
            let delay = Duration::from_millis((window - elapsed) as u64);
            let weak: Weak<Shared<E>> = Arc::downgrade(shared);
            let handle = shared.scheduler.schedule(
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.flush();
                    }
                }),
                delay,
            );
            trace!("Flush armed in {:?}", delay);
            state.scheduled = Some(handle);
        }
    }

    /// Cancel any armed flush and drop the pending envelope
    ///
    /// Later requests and late timer fires become no-ops. A send already in
    /// progress on another thread is waited for, so the transport is never
    /// called after this returns. Called from inside the transport, it
    /// returns without waiting for that same send.
    pub fn dispose(&self) {
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.pending = None;
            if let Some(handle) = state.scheduled.take() {
                shared.scheduler.cancel(handle);
            }
        }

        // State lock released first: the transport may re-enter while holding the gate
        let _gate = shared.send_gate.lock();
        debug!(
            "Dispatcher disposed (total sends: {})",
            shared.state.lock().send_count
        );
    }

    /// Throttle window
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.shared.window_ms)
    }

    /// Whether an envelope is waiting to be sent
    pub fn has_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    /// Whether a delayed flush is armed
    pub fn is_flush_armed(&self) -> bool {
        self.shared.state.lock().scheduled.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Number of envelopes handed to the transport so far
    pub fn send_count(&self) -> u64 {
        self.shared.state.lock().send_count
    }
}

impl<E> Shared<E> {
    /// Timer entry point
    fn flush(&self) {
        let state = self.state.lock();
        self.flush_locked(state);
    }

    /// Send whatever is pending, then clear the pending envelope and the armed flush.
    ///
    /// `last_send_ms` is stamped before the lock is released so no other
    /// request can slip a second send into the same window. The transport
    /// runs under the send gate, after re-checking that `dispose` has not
    /// happened in between.
    fn flush_locked(&self, mut state: MutexGuard<'_, DispatchState<E>>) {
        state.scheduled = None;

        let Some(envelope) = state.pending.take() else {
            trace!("Flush with nothing pending");
            return;
        };

        state.last_send_ms = self.clock.now_ms() as i64;
        drop(state);

        let _gate = self.send_gate.lock();
        {
            let mut state = self.state.lock();
            if state.disposed {
                trace!("Disposed before send, dropping envelope");
                return;
            }
            state.send_count += 1;
            trace!("Sending envelope #{}", state.send_count);
        }

        (self.send)(envelope);
    }
}

//! WidgetStateManager - widget values plus throttled delivery to the peer
//!
//! UI event handlers call the setters, then ask for an update message. The
//! manager snapshots the registry and hands it to the throttled dispatcher.

use crate::dispatch::{
    Clock, MonotonicClock, Scheduler, SchedulerError, SendCallback, ThrottledDispatcher,
    TokioScheduler, DEFAULT_THROTTLE_MS,
};
use crate::state::{BackMsg, WidgetRegistry, WidgetValue};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Manages widget values and sends update messages back to the peer
pub struct WidgetStateManager {
    registry: WidgetRegistry,
    dispatcher: ThrottledDispatcher<BackMsg>,
}

impl WidgetStateManager {
    /// Manager on the current tokio runtime with the default 400ms window
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new(send: SendCallback<BackMsg>) -> Result<Self, SchedulerError> {
        Ok(Self::with_capabilities(
            Duration::from_millis(DEFAULT_THROTTLE_MS),
            send,
            Arc::new(MonotonicClock::new()),
            Arc::new(TokioScheduler::current()?),
        ))
    }

    /// Manager with an explicit window, clock and scheduler
    pub fn with_capabilities(
        window: Duration,
        send: SendCallback<BackMsg>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            registry: WidgetRegistry::new(),
            dispatcher: ThrottledDispatcher::new(window, send, clock, scheduler),
        }
    }

    /// True only before the first value is set in this session
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn set_trigger_value(&mut self, widget_id: &str, value: bool) {
        self.registry.set_trigger_value(widget_id, value);
    }

    pub fn set_bool_value(&mut self, widget_id: &str, value: bool) {
        self.registry.set_bool_value(widget_id, value);
    }

    pub fn set_int_value(&mut self, widget_id: &str, value: i64) {
        self.registry.set_int_value(widget_id, value);
    }

    pub fn set_float_value(&mut self, widget_id: &str, value: f64) {
        self.registry.set_float_value(widget_id, value);
    }

    pub fn set_string_value(&mut self, widget_id: &str, value: impl Into<String>) {
        self.registry.set_string_value(widget_id, value);
    }

    pub fn set_float_array_value(&mut self, widget_id: &str, value: impl Into<Vec<f64>>) {
        self.registry.set_float_array_value(widget_id, value);
    }

    pub fn set_value(&mut self, widget_id: &str, value: WidgetValue) {
        self.registry.set_value(widget_id, value);
    }

    /// Send every current widget value to the peer, throttled
    pub fn send_update_widgets_message(&self) {
        let states = self.registry.snapshot();
        debug!("Update requested ({} widgets)", states.len());
        self.dispatcher.request_send(BackMsg::UpdateWidgets(states));
    }

    /// Stop sending: cancels an armed flush and drops the pending message
    pub fn dispose(&self) {
        self.dispatcher.dispose();
    }

    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &ThrottledDispatcher<BackMsg> {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ManualClock, ManualScheduler};
    use crate::state::WidgetStates;
    use parking_lot::Mutex;

    fn make_manager() -> (WidgetStateManager, Arc<ManualScheduler>, Arc<Mutex<Vec<BackMsg>>>) {
        let clock = ManualClock::new(0);
        let scheduler = Arc::new(ManualScheduler::new(clock.clone()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let send: SendCallback<BackMsg> = {
            let sent = Arc::clone(&sent);
            Arc::new(move |msg| sent.lock().push(msg))
        };
        let manager = WidgetStateManager::with_capabilities(
            Duration::from_millis(DEFAULT_THROTTLE_MS),
            send,
            Arc::new(clock),
            scheduler.clone(),
        );
        (manager, scheduler, sent)
    }

    fn widgets(msg: &BackMsg) -> &WidgetStates {
        match msg {
            BackMsg::UpdateWidgets(states) => states,
        }
    }

    #[test]
    fn test_first_update_sent_immediately() {
        let (mut manager, _scheduler, sent) = make_manager();
        assert!(manager.is_empty());

        manager.set_float_value("slider", 0.5);
        manager.send_update_widgets_message();

        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            widgets(&sent[0]).get("slider").unwrap().value,
            WidgetValue::Float(0.5)
        );
    }

    #[test]
    fn test_drag_sends_final_value() {
        let (mut manager, scheduler, sent) = make_manager();

        manager.set_float_value("slider", 0.0);
        manager.send_update_widgets_message();
        for step in 1..=10 {
            scheduler.advance_by(16);
            manager.set_float_value("slider", step as f64 / 10.0);
            manager.send_update_widgets_message();
        }
        scheduler.advance_to(400);

        let sent = sent.lock();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            widgets(&sent[1]).get("slider").unwrap().value,
            WidgetValue::Float(1.0)
        );
        assert_eq!(scheduler.created(), 1);
    }

    #[test]
    fn test_in_flight_message_unaffected_by_later_edits() {
        let (mut manager, scheduler, sent) = make_manager();

        manager.set_int_value("n", 1);
        manager.send_update_widgets_message();
        scheduler.advance_by(100);
        manager.set_int_value("n", 2);
        manager.send_update_widgets_message();
        manager.set_int_value("n", 3);
        scheduler.advance_to(400);

        let sent = sent.lock();
        assert_eq!(widgets(&sent[0]).get("n").unwrap().value, WidgetValue::Int(1));
        assert_eq!(widgets(&sent[1]).get("n").unwrap().value, WidgetValue::Int(2));
    }

    #[test]
    fn test_empty_registry_still_sends() {
        let (manager, _scheduler, sent) = make_manager();
        manager.send_update_widgets_message();

        let sent = sent.lock();
        assert_eq!(sent.len(), 1);
        assert!(widgets(&sent[0]).is_empty());
    }

    #[test]
    fn test_dispose_drops_pending_update() {
        let (mut manager, scheduler, sent) = make_manager();
        manager.set_bool_value("check", true);
        manager.send_update_widgets_message();
        scheduler.advance_by(50);
        manager.set_bool_value("check", false);
        manager.send_update_widgets_message();

        manager.dispose();
        scheduler.advance_to(1_000);

        assert_eq!(sent.lock().len(), 1);
        assert!(manager.dispatcher().is_disposed());
    }

    #[test]
    fn test_new_requires_runtime() {
        let send: SendCallback<BackMsg> = Arc::new(|_| {});
        assert!(WidgetStateManager::new(send).is_err());
    }
}

//! WidgetRegistry - In-memory widget values keyed by widget id
//!
//! Holds the current value of every widget the user has touched. Pure data:
//! no timing, no I/O. Snapshots copy every value so an envelope that is in
//! flight is never affected by later edits.

use super::builders::{EnvelopeBuilder, WidgetStatesBuilder};
use super::types::{FloatArray, WidgetState, WidgetStates, WidgetValue};
use std::collections::HashMap;
use tracing::trace;

/// Current value of every widget, keyed by id
#[derive(Debug, Default, Clone)]
pub struct WidgetRegistry {
    widgets: HashMap<String, WidgetState>,
}

impl WidgetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// True until the first value is set
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Number of widgets with a value
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Current value for `id`, if any
    pub fn get(&self, id: &str) -> Option<&WidgetValue> {
        self.widgets.get(id).map(|state| &state.value)
    }

    pub fn set_trigger_value(&mut self, id: &str, value: bool) {
        self.set_value(id, WidgetValue::Trigger(value));
    }

    pub fn set_bool_value(&mut self, id: &str, value: bool) {
        self.set_value(id, WidgetValue::Bool(value));
    }

    pub fn set_int_value(&mut self, id: &str, value: i64) {
        self.set_value(id, WidgetValue::Int(value));
    }

    pub fn set_float_value(&mut self, id: &str, value: f64) {
        self.set_value(id, WidgetValue::Float(value));
    }

    pub fn set_string_value(&mut self, id: &str, value: impl Into<String>) {
        self.set_value(id, WidgetValue::String(value.into()));
    }

    pub fn set_float_array_value(&mut self, id: &str, value: impl Into<Vec<f64>>) {
        self.set_value(id, WidgetValue::FloatArray(FloatArray::from(value.into())));
    }

    /// Replace the active value for `id`, whatever its previous kind
    pub fn set_value(&mut self, id: &str, value: WidgetValue) {
        trace!("Widget {} <- {}", id, value.kind());
        self.get_or_create(id).value = value;
    }

    /// Copy every entry into a fresh [`WidgetStates`]
    pub fn snapshot(&self) -> WidgetStates {
        self.snapshot_with(WidgetStatesBuilder)
    }

    /// Copy every entry into an envelope built by `builder`
    ///
    /// Iteration order is unspecified.
    pub fn snapshot_with<B: EnvelopeBuilder>(&self, mut builder: B) -> B::Envelope {
        let entities = self
            .widgets
            .values()
            .map(|state| {
                let mut entity = builder.create_entity(&state.id);
                builder.set_variant(&mut entity, &state.value);
                entity
            })
            .collect();
        builder.collect(entities)
    }

    /// Returns the entry for `id`, minting a zero-value one if absent.
    fn get_or_create(&mut self, id: &str) -> &mut WidgetState {
        if !self.widgets.contains_key(id) {
            trace!("New widget entry: {}", id);
        }
        self.widgets
            .entry(id.to_string())
            .or_insert_with(|| WidgetState::new(id))
    }
}

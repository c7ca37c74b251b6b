//! Envelope builders
//!
//! Turns registry entries into the aggregate payload handed to the transport.
//! The registry only knows how to walk its entries; what the payload looks
//! like is up to the [`EnvelopeBuilder`].

use super::types::{WidgetState, WidgetStates, WidgetValue};

/// Builds an outbound envelope from widget entries
///
/// Implementations own the payload shape. The registry calls
/// `create_entity` then `set_variant` for every entry, and finally `collect`.
pub trait EnvelopeBuilder {
    /// Per-widget message
    type Entity;
    /// Aggregate payload
    type Envelope;

    /// Create an empty message for widget `id`
    fn create_entity(&mut self, id: &str) -> Self::Entity;

    /// Store `value` as the entity's active variant
    fn set_variant(&mut self, entity: &mut Self::Entity, value: &WidgetValue);

    /// Assemble the aggregate payload
    fn collect(self, entities: Vec<Self::Entity>) -> Self::Envelope;
}

/// Default builder producing [`WidgetStates`]
#[derive(Debug, Default, Clone, Copy)]
pub struct WidgetStatesBuilder;

impl EnvelopeBuilder for WidgetStatesBuilder {
    type Entity = WidgetState;
    type Envelope = WidgetStates;

    fn create_entity(&mut self, id: &str) -> WidgetState {
        WidgetState::new(id)
    }

    fn set_variant(&mut self, entity: &mut WidgetState, value: &WidgetValue) {
        entity.value = value.clone();
    }

    fn collect(self, entities: Vec<WidgetState>) -> WidgetStates {
        WidgetStates { widgets: entities }
    }
}

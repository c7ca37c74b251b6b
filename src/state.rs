//! State management module - widget values per session
//!
//! This module provides the registry that tracks the current value of every
//! widget, and the builders that turn it into an outbound envelope.

mod builders;
mod store;
mod types;

pub use builders::{EnvelopeBuilder, WidgetStatesBuilder};
pub use store::WidgetRegistry;
pub use types::{BackMsg, FloatArray, WidgetKind, WidgetState, WidgetStates, WidgetValue};

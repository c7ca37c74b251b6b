//! Widget Relay
//!
//! Tracks the current value of every widget a user is manipulating and relays
//! the aggregate to a remote peer, at most once per throttle window, always
//! delivering the latest state.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod manager;
pub mod state;

pub use dispatch::{SendCallback, ThrottledDispatcher, DEFAULT_THROTTLE_MS};
pub use manager::WidgetStateManager;
pub use state::{BackMsg, WidgetRegistry, WidgetState, WidgetStates, WidgetValue};

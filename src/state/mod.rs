//! State management and events

mod container;
mod events;

pub use container::SettingsStore;
pub use events::{EventBus, EventFilter, NodeEvent};

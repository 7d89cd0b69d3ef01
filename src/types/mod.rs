//! Core types module

mod config;
mod role;
mod settings;

#[cfg(test)]
mod tests;

pub use config::{
    CorrectionTuning, DEFAULT_CONTROL_PORT, DEFAULT_DISCOVERY_PORT, DEFAULT_SYNC_PORT,
    NodeConfig, NodeConfigBuilder,
};
pub use role::Role;
pub use settings::Settings;

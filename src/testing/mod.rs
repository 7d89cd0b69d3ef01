//! Test doubles for driving nodes without real media or peers

mod media;
pub mod network_sim;
mod transport;


pub use media::SimulatedMedia;
pub use network_sim::NetworkSimulator;
pub use transport::RecordingTransport;

//! Command registry, dispatcher and control servers

mod command;
mod connection;
mod dispatcher;
mod registry;
mod server;

#[cfg(test)]
mod tests;

pub use command::{CommandHandler, FnHandler, StateTarget};
pub use connection::{Connection, ConnectionInfo, ConnectionKind};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use registry::CommandRegistry;
pub use server::{ControlServer, DatagramServer};

//! Command and state-target traits

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::connection::Connection;
use crate::error::Result;

/// Handler for one named text command
///
/// Handlers own whatever state they need (typically `Arc` handles) and
/// never panic: failures are logged or answered on `conn`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute the command with the tokens following its name
    async fn execute(&self, conn: &Connection, args: &[&str]);
}

/// Adapts a plain closure into a `CommandHandler`
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Connection, &[&str]) + Send + Sync,
{
    /// Wrap a closure
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&Connection, &[&str]) + Send + Sync,
{
    async fn execute(&self, conn: &Connection, args: &[&str]) {
        (self.f)(conn, args);
    }
}

/// Component that accepts bulk structured-state updates
#[async_trait]
pub trait StateTarget: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether the target still wants updates
    ///
    /// Dead targets are dropped from the registry before the next apply.
    fn is_alive(&self) -> bool {
        true
    }

    /// Apply the keys of `doc` this target understands
    ///
    /// # Errors
    ///
    /// Returns an error if a recognised key holds an invalid value.
    async fn apply_state(&self, doc: &Map<String, Value>) -> Result<()>;
}

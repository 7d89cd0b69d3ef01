//! Text command dispatcher
//!
//! A payload is split into lines and each line into whitespace tokens. The
//! first token selects a registered command and the rest become its
//! arguments. A payload in which no line names a command is tried as a
//! structured-state document (a JSON object) and applied to every live
//! state target; anything else is dropped.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use super::command::{CommandHandler, StateTarget};
use super::connection::{Connection, ConnectionInfo};
use super::registry::CommandRegistry;

/// What became of a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// This many lines matched registered commands
    Commands(usize),
    /// The payload was a state document applied to this many targets
    StateApplied(usize),
    /// Nothing usable in the payload
    Dropped,
}

/// Routes inbound payloads to command handlers
pub struct Dispatcher {
    registry: RwLock<CommandRegistry>,
    connections: Mutex<Vec<ConnectionInfo>>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry
    #[must_use]
    pub fn new(registry: CommandRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler, replacing any previous one of the same name
    pub async fn register(&self, name: impl Into<String>, handler: impl CommandHandler + 'static) {
        self.registry.write().await.register(name, handler);
    }

    /// Add a structured-state target
    pub async fn add_target(&self, target: Arc<dyn StateTarget>) {
        self.registry.write().await.add_target(target);
    }

    /// Registered command names, sorted
    pub async fn command_names(&self) -> Vec<String> {
        self.registry.read().await.names()
    }

    /// Remember an open connection
    pub async fn track(&self, conn: &Connection) {
        let mut connections = self.connections.lock().await;
        connections.retain(ConnectionInfo::is_open);
        connections.push(conn.info());
    }

    /// Currently open connections, pruning closed ones
    pub async fn open_connections(&self) -> Vec<ConnectionInfo> {
        let mut connections = self.connections.lock().await;
        connections.retain(ConnectionInfo::is_open);
        connections.clone()
    }

    /// Dispatch one raw payload received on `conn`
    ///
    /// Commands run in line order, each awaited before the next starts.
    pub async fn dispatch(&self, conn: &Connection, payload: &[u8]) -> DispatchOutcome {
        let text = match std::str::from_utf8(payload) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(peer = %conn.peer(), "Dropping non UTF-8 payload: {}", e);
                return DispatchOutcome::Dropped;
            }
        };

        let mut matched = 0;
        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((name, args)) = tokens.split_first() else {
                continue;
            };

            // Clone the handler out so the registry lock is not held across the await
            let handler = self.registry.read().await.get(name);
            match handler {
                Some(handler) => {
                    tracing::trace!(peer = %conn.peer(), command = name, "Dispatching");
                    handler.execute(conn, args).await;
                    matched += 1;
                }
                None => {
                    tracing::trace!(peer = %conn.peer(), command = name, "No handler for line");
                }
            }
        }

        if matched > 0 {
            return DispatchOutcome::Commands(matched);
        }

        self.apply_state_document(conn, text).await
    }

    async fn apply_state_document(&self, conn: &Connection, text: &str) -> DispatchOutcome {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            tracing::trace!(peer = %conn.peer(), "Dropping unrecognised payload");
            return DispatchOutcome::Dropped;
        }

        let doc = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(doc)) => doc,
            Ok(_) => {
                tracing::trace!(peer = %conn.peer(), "Dropping non-object JSON payload");
                return DispatchOutcome::Dropped;
            }
            Err(e) => {
                tracing::warn!(peer = %conn.peer(), "Malformed state document: {}", e);
                return DispatchOutcome::Dropped;
            }
        };

        let targets = self.registry.write().await.live_targets();
        let mut applied = 0;
        for target in targets {
            match target.apply_state(&doc).await {
                Ok(()) => applied += 1,
                Err(e) => {
                    tracing::warn!(target_name = target.name(), "State document rejected: {}", e);
                }
            }
        }
        tracing::debug!(peer = %conn.peer(), applied, "Applied state document");
        DispatchOutcome::StateApplied(applied)
    }
}

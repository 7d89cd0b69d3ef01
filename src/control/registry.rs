//! Command registry

use std::collections::HashMap;
use std::sync::Arc;

use super::command::{CommandHandler, StateTarget};

/// Maps command names to handlers and holds the structured-state targets
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn CommandHandler>>,
    targets: Vec<Arc<dyn StateTarget>>,
}

impl CommandRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one of the same name
    ///
    /// Returns the replaced handler.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Option<Arc<dyn CommandHandler>> {
        self.register_arc(name, Arc::new(handler))
    }

    /// Register a shared handler
    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Option<Arc<dyn CommandHandler>> {
        let name = name.into();
        let previous = self.commands.insert(name.clone(), handler);
        if previous.is_some() {
            tracing::debug!(command = %name, "Replaced command handler");
        }
        previous
    }

    /// Remove a handler
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.remove(name)
    }

    /// Look up a handler by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.commands.get(name).cloned()
    }

    /// Check whether a command is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered command names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if no command is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Add a structured-state target
    pub fn add_target(&mut self, target: Arc<dyn StateTarget>) {
        self.targets.push(target);
    }

    /// Drop dead targets and return the live ones
    pub fn live_targets(&mut self) -> Vec<Arc<dyn StateTarget>> {
        self.targets.retain(|t| {
            let alive = t.is_alive();
            if !alive {
                tracing::debug!(target_name = t.name(), "Dropping dead state target");
            }
            alive
        });
        self.targets.clone()
    }

    /// Number of targets currently held, dead or alive
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

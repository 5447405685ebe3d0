use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Invalid argument for action '{action}': {reason}")]
    InvalidArgument { action: String, reason: String },
}

/// Handler invoked with the single string argument of an action
pub type ActionHandler = Arc<dyn Fn(&str) -> Result<(), ActionError> + Send + Sync>;

/// Registry of named actions that can be triggered remotely (shortcuts, API calls)
#[derive(Default)]
pub struct ActionRegistry {
    actions: RwLock<HashMap<String, ActionHandler>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any previous handler with the same name
    pub fn register(&self, name: &str, handler: ActionHandler) {
        match self.actions.write() {
            Ok(mut actions) => {
                if actions.insert(name.to_string(), handler).is_some() {
                    warn!("Action '{}' was registered twice, keeping the latest handler", name);
                } else {
                    debug!("Registered action '{}'", name);
                }
            }
            Err(_) => warn!("Failed to acquire write lock when registering action '{}'", name),
        }
    }

    /// Invoke an action with its argument
    pub fn invoke(&self, name: &str, argument: &str) -> Result<(), ActionError> {
        let handler = self
            .actions
            .read()
            .ok()
            .and_then(|actions| actions.get(name).cloned())
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))?;

        debug!("Invoking action '{}' with '{}'", name, argument);
        handler(argument)
    }

    /// Names of all registered actions, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .actions
            .read()
            .map(|actions| actions.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

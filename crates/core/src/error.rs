use thiserror::Error;

use crate::actions::action::ActionType;

/// Errors raised while resolving or talking to MIDI ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("MIDI port not found: {0}")]
    NotFound(String),

    #[error("Failed to initialize MIDI client: {0}")]
    Init(String),

    #[error("Failed to connect to MIDI port '{port}': {reason}")]
    Connect { port: String, reason: String },

    #[error("Failed to send to MIDI port '{port}': {reason}")]
    Send { port: String, reason: String },
}

/// Errors surfaced by action handlers and the executor.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The payload does not parse for its action type.
    #[error("{0}")]
    Validation(String),

    /// The action ran and failed, with the diagnostic text where available.
    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("No handler registered for action type '{0}'")]
    NoHandler(ActionType),

    #[error(transparent)]
    Port(#[from] PortError),
}

/// Structural errors from the action tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Cannot move group '{group}' into its own subtree ('{destination}')")]
    Cycle { group: String, destination: String },
}

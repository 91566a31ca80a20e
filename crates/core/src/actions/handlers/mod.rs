use async_trait::async_trait;
use tokio::process::Command;

use crate::actions::action::ActionType;
use crate::error::ActionError;

pub mod midi_send;
pub mod script;
pub mod shell;
pub mod sleep;

pub use midi_send::{MidiSendHandler, MidiSendKind, MidiSendPayload};
pub use script::ScriptHandler;
pub use shell::ShellHandler;
pub use sleep::SleepHandler;

/// Strategy for one action type.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action type this handler runs
    fn action_type(&self) -> ActionType;

    /// Run the payload and return its textual output
    async fn execute(&self, payload: &str) -> Result<String, ActionError>;

    /// Check the payload without running it
    async fn validate(&self, payload: &str) -> Result<(), ActionError>;

    /// Whether the handler can run on this host
    fn is_supported(&self) -> bool;
}

/// What a subprocess failure should be reported as.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Execution,
    Validation,
}

/// Run `command` to completion and return its trimmed stdout.
///
/// A non-zero exit becomes an error carrying `label` and the process's
/// stderr, or the exit status if stderr was empty.
pub(crate) async fn run_process(
    mut command: Command,
    label: &str,
    failure: Failure,
) -> Result<String, ActionError> {
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ActionError::Execution(format!("{} failed to start: {}", label, e)))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        format!("{} failed: {}", label, output.status)
    } else {
        format!("{} error: {}", label, stderr.trim())
    };

    Err(match failure {
        Failure::Execution => ActionError::Execution(message),
        Failure::Validation => ActionError::Validation(message),
    })
}

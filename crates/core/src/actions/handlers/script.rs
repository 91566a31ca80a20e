use async_trait::async_trait;
use tokio::process::Command;

use super::{run_process, ActionHandler, Failure};
use crate::actions::action::ActionType;
use crate::error::ActionError;

/// Runs AppleScript through `osascript`. macOS only.
#[derive(Debug, Default)]
pub struct ScriptHandler;

#[async_trait]
impl ActionHandler for ScriptHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Script
    }

    async fn execute(&self, payload: &str) -> Result<String, ActionError> {
        if !self.is_supported() {
            return Err(ActionError::Unsupported(
                "AppleScript is only supported on macOS".to_string(),
            ));
        }

        let mut command = Command::new("osascript");
        command.arg("-e").arg(payload);
        run_process(command, "AppleScript", Failure::Execution).await
    }

    async fn validate(&self, payload: &str) -> Result<(), ActionError> {
        if !self.is_supported() {
            return Err(ActionError::Unsupported(
                "AppleScript validation is only available on macOS".to_string(),
            ));
        }

        // Compile-only pass; the output is discarded
        let mut command = Command::new("osacompile");
        command.args(["-o", "/dev/null", "-e"]).arg(payload);
        run_process(command, "AppleScript syntax", Failure::Validation)
            .await
            .map(|_| ())
    }

    fn is_supported(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

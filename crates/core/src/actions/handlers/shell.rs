use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use super::{run_process, ActionHandler, Failure};
use crate::actions::action::ActionType;
use crate::error::ActionError;

/// Runs commands through the host's native shell: PowerShell on Windows,
/// zsh on macOS when present, bash elsewhere.
#[derive(Debug, Default)]
pub struct ShellHandler;

impl ShellHandler {
    /// Display name of the interpreter commands run under.
    pub fn shell_name() -> &'static str {
        if cfg!(windows) {
            "PowerShell"
        } else if cfg!(target_os = "macos") && Path::new("/bin/zsh").exists() {
            "zsh"
        } else {
            "bash"
        }
    }

    fn command(payload: &str) -> Command {
        if cfg!(windows) {
            let mut command = Command::new("powershell");
            command
                .args(["-NoProfile", "-NonInteractive", "-Command"])
                .arg(payload);
            command
        } else {
            let shell = match Self::shell_name() {
                "zsh" => "/bin/zsh",
                _ => "/bin/bash",
            };
            let mut command = Command::new(shell);
            command.arg("-c").arg(payload);
            command
        }
    }
}

#[async_trait]
impl ActionHandler for ShellHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Shell
    }

    async fn execute(&self, payload: &str) -> Result<String, ActionError> {
        run_process(Self::command(payload), "Shell", Failure::Execution).await
    }

    async fn validate(&self, payload: &str) -> Result<(), ActionError> {
        if payload.trim().is_empty() {
            return Err(ActionError::Validation("Shell command is empty".to_string()));
        }
        if payload.contains('\0') {
            return Err(ActionError::Validation(
                "Shell command contains NUL bytes".to_string(),
            ));
        }
        if cfg!(windows) {
            return Ok(());
        }

        // bash -n parses without executing
        let mut command = Command::new("/bin/bash");
        command.args(["-n", "-c"]).arg(payload);
        match run_process(command, "Shell syntax", Failure::Validation).await {
            Ok(_) => Ok(()),
            Err(ActionError::Execution(reason)) => {
                log::debug!("Skipping shell syntax check: {}", reason);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn is_supported(&self) -> bool {
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_returns_trimmed_stdout() {
        let out = ShellHandler.execute("echo hello").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_failure_carries_stderr() {
        let err = ShellHandler
            .execute("echo broken >&2; exit 3")
            .await
            .unwrap_err();
        match err {
            ActionError::Execution(msg) => assert!(msg.contains("broken")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_validate() {
        assert!(ShellHandler.validate("   ").await.is_err());
        assert!(ShellHandler.validate("echo a\0b").await.is_err());
        assert!(ShellHandler.validate("if then fi (").await.is_err());
        assert!(ShellHandler.validate("echo ok && ls").await.is_ok());
    }

    #[test]
    fn test_shell_name_is_unix_shell() {
        assert!(matches!(ShellHandler::shell_name(), "bash" | "zsh"));
    }
}

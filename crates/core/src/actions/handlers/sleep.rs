use std::time::Duration;

use async_trait::async_trait;

use super::ActionHandler;
use crate::actions::action::ActionType;
use crate::error::ActionError;

/// Pauses the running sequence. Payload is a seconds literal such as `1.5`.
#[derive(Debug, Default)]
pub struct SleepHandler;

impl SleepHandler {
    /// Parse a seconds literal into a sleepable duration.
    pub fn parse_duration(payload: &str) -> Result<Duration, ActionError> {
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(ActionError::Validation("Empty duration".to_string()));
        }

        let seconds: f64 = payload
            .parse()
            .map_err(|_| ActionError::Validation(format!("Invalid number: {}", payload)))?;

        if !seconds.is_finite() {
            return Err(ActionError::Validation(format!("Invalid number: {}", payload)));
        }
        if seconds < 0.0 {
            return Err(ActionError::Validation(
                "Duration cannot be negative".to_string(),
            ));
        }
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| ActionError::Validation(format!("Invalid duration: {}", e)))
    }
}

#[async_trait]
impl ActionHandler for SleepHandler {
    fn action_type(&self) -> ActionType {
        ActionType::Sleep
    }

    async fn execute(&self, payload: &str) -> Result<String, ActionError> {
        let duration = Self::parse_duration(payload)?;
        tokio::time::sleep(duration).await;
        Ok(format!("Slept for {:.2} seconds", duration.as_secs_f64()))
    }

    async fn validate(&self, payload: &str) -> Result<(), ActionError> {
        Self::parse_duration(payload).map(|_| ())
    }

    fn is_supported(&self) -> bool {
        true
    }
}

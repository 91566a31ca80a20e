use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ActionHandler;
use crate::actions::action::ActionType;
use crate::error::ActionError;
use crate::midi::midi::{MessageSender, MidiMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidiSendKind {
    #[default]
    NoteOn,
    NoteOff,
    Cc,
    Pc,
    Sysex,
}

impl fmt::Display for MidiSendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MidiSendKind::NoteOn => "note_on",
            MidiSendKind::NoteOff => "note_off",
            MidiSendKind::Cc => "cc",
            MidiSendKind::Pc => "pc",
            MidiSendKind::Sysex => "sysex",
        };
        f.write_str(name)
    }
}

/// JSON payload of a MIDI-send action.
///
/// `note` and `velocity` double as controller number and value for `cc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiSendPayload {
    /// Output port name
    pub device_name: String,
    pub msg_type: MidiSendKind,
    /// One-based, 1-16
    pub channel: i64,
    pub note: i64,
    pub velocity: i64,
    pub program: i64,
    /// Space-separated hex bytes. Not sendable yet.
    pub sysex: String,
}

impl Default for MidiSendPayload {
    fn default() -> Self {
        Self {
            device_name: String::new(),
            msg_type: MidiSendKind::NoteOn,
            channel: 1,
            note: 60,
            velocity: 127,
            program: 0,
            sysex: String::new(),
        }
    }
}

fn data_byte(field: &str, value: i64) -> Result<u8, ActionError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= 127)
        .ok_or_else(|| ActionError::Validation(format!("{} must be 0-127, got {}", field, value)))
}

impl MidiSendPayload {
    pub fn parse(payload: &str) -> Result<Self, ActionError> {
        serde_json::from_str(payload)
            .map_err(|e| ActionError::Validation(format!("Invalid MIDI action data: {}", e)))
    }

    pub fn to_json(&self) -> String {
        // Plain struct of strings and integers; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Build the wire message, checking every field's range.
    pub fn to_message(&self) -> Result<MidiMessage, ActionError> {
        if self.device_name.trim().is_empty() {
            return Err(ActionError::Validation("No device specified".to_string()));
        }
        if !(1..=16).contains(&self.channel) {
            return Err(ActionError::Validation(format!(
                "Channel must be 1-16, got {}",
                self.channel
            )));
        }
        let channel = (self.channel - 1) as u8;

        match self.msg_type {
            MidiSendKind::NoteOn => Ok(MidiMessage::note_on(
                channel,
                data_byte("note", self.note)?,
                data_byte("velocity", self.velocity)?,
            )),
            MidiSendKind::NoteOff => Ok(MidiMessage::note_off(
                channel,
                data_byte("note", self.note)?,
            )),
            MidiSendKind::Cc => Ok(MidiMessage::control_change(
                channel,
                data_byte("controller", self.note)?,
                data_byte("value", self.velocity)?,
            )),
            MidiSendKind::Pc => Ok(MidiMessage::program_change(
                channel,
                data_byte("program", self.program)?,
            )),
            MidiSendKind::Sysex => Err(ActionError::Unsupported(
                "SysEx sending is not implemented".to_string(),
            )),
        }
    }
}

/// Emits one MIDI message through a [`MessageSender`].
pub struct MidiSendHandler {
    sender: Arc<dyn MessageSender>,
}

impl MidiSendHandler {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl ActionHandler for MidiSendHandler {
    fn action_type(&self) -> ActionType {
        ActionType::MidiSend
    }

    async fn execute(&self, payload: &str) -> Result<String, ActionError> {
        let data = MidiSendPayload::parse(payload)?;
        let message = data.to_message()?;

        log::debug!("Sending {} [{}] to {}", data.msg_type, message, data.device_name);
        self.sender.send(&data.device_name, &message)?;

        Ok(format!("Sent {} to {}", data.msg_type, data.device_name))
    }

    async fn validate(&self, payload: &str) -> Result<(), ActionError> {
        MidiSendPayload::parse(payload)?.to_message().map(|_| ())
    }

    fn is_supported(&self) -> bool {
        true
    }
}

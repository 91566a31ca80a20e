use serde::{Deserialize, Serialize};

use super::midi::MidiMessage;

/// Channel value meaning "match any channel".
pub const ANY_CHANNEL: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Note,
    Cc,
    ProgramChange,
}

/// Maps an inbound MIDI message from a generic device to an action or group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMapping {
    pub id: String,
    pub name: String,
    pub message_type: MappingKind,
    /// Zero-based channel, or [`ANY_CHANNEL`].
    pub channel: i32,
    pub number: i32,
    #[serde(default)]
    pub action_id: String,
}

impl MessageMapping {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: "New Mapping".to_string(),
            message_type: MappingKind::Note,
            channel: ANY_CHANNEL,
            number: 60,
            action_id: String::new(),
        }
    }

    /// Whether this mapping fires for `message`.
    ///
    /// Note-offs and zero-velocity/zero-value messages never match; they are
    /// releases, not triggers.
    pub fn matches(&self, message: &MidiMessage) -> bool {
        let (kind, channel, number) = match *message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } if velocity > 0 => (MappingKind::Note, channel, note),
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } if value > 0 => (MappingKind::Cc, channel, controller),
            MidiMessage::ProgramChange { channel, program } => {
                (MappingKind::ProgramChange, channel, program)
            }
            _ => return false,
        };

        kind == self.message_type
            && (self.channel == ANY_CHANNEL || self.channel == channel as i32)
            && self.number == number as i32
    }
}

impl Default for MessageMapping {
    fn default() -> Self {
        Self::new()
    }
}

/// Action ids of every mapping that fires for `message`, in mapping order.
pub fn matching_actions<'a>(
    mappings: &'a [MessageMapping],
    message: &'a MidiMessage,
) -> impl Iterator<Item = &'a str> + 'a {
    mappings
        .iter()
        .filter(move |m| !m.action_id.is_empty() && m.matches(message))
        .map(|m| m.action_id.as_str())
}

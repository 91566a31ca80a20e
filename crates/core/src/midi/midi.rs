use std::fmt;

use crate::error::PortError;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;

/// A single MIDI wire message.
///
/// Channels are zero-based (0-15). System-exclusive payloads are stored
/// without the surrounding `F0`/`F7` framing bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    SysEx(Vec<u8>),
}

impl MidiMessage {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        MidiMessage::NoteOn {
            channel: channel & 0x0F,
            note: note & 0x7F,
            velocity: velocity & 0x7F,
        }
    }

    pub fn note_off(channel: u8, note: u8) -> Self {
        MidiMessage::NoteOff {
            channel: channel & 0x0F,
            note: note & 0x7F,
            velocity: 0,
        }
    }

    pub fn control_change(channel: u8, controller: u8, value: u8) -> Self {
        MidiMessage::ControlChange {
            channel: channel & 0x0F,
            controller: controller & 0x7F,
            value: value & 0x7F,
        }
    }

    pub fn program_change(channel: u8, program: u8) -> Self {
        MidiMessage::ProgramChange {
            channel: channel & 0x0F,
            program: program & 0x7F,
        }
    }

    pub fn sysex(data: impl Into<Vec<u8>>) -> Self {
        MidiMessage::SysEx(data.into())
    }

    /// Parse raw bytes as delivered by a MIDI input callback.
    ///
    /// Returns `None` for truncated messages and for message kinds this
    /// crate does not care about (clock, aftertouch, pitch bend, ...).
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;

        if status == SYSEX_START {
            let body = &bytes[1..];
            let body = match body.last() {
                Some(&SYSEX_END) => &body[..body.len() - 1],
                _ => body,
            };
            return Some(MidiMessage::SysEx(body.to_vec()));
        }

        let channel = status & 0x0F;
        match status & 0xF0 {
            NOTE_ON if bytes.len() >= 3 => Some(MidiMessage::NoteOn {
                channel,
                note: bytes[1],
                velocity: bytes[2],
            }),
            NOTE_OFF if bytes.len() >= 3 => Some(MidiMessage::NoteOff {
                channel,
                note: bytes[1],
                velocity: bytes[2],
            }),
            CONTROL_CHANGE if bytes.len() >= 3 => Some(MidiMessage::ControlChange {
                channel,
                controller: bytes[1],
                value: bytes[2],
            }),
            PROGRAM_CHANGE if bytes.len() >= 2 => Some(MidiMessage::ProgramChange {
                channel,
                program: bytes[1],
            }),
            _ => None,
        }
    }

    /// Serialize to the exact bytes sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![NOTE_ON | channel, *note, *velocity],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![NOTE_OFF | channel, *note, *velocity],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![CONTROL_CHANGE | channel, *controller, *value],
            MidiMessage::ProgramChange { channel, program } => {
                vec![PROGRAM_CHANGE | channel, *program]
            }
            MidiMessage::SysEx(data) => {
                let mut bytes = Vec::with_capacity(data.len() + 2);
                bytes.push(SYSEX_START);
                bytes.extend_from_slice(data);
                bytes.push(SYSEX_END);
                bytes
            }
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. } => Some(*channel),
            MidiMessage::SysEx(_) => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "{}", hex.join(" "))
    }
}

/// Anything that can deliver a wire message to a named output port.
///
/// The port manager implements this; action handlers only see the trait.
pub trait MessageSender: Send + Sync {
    fn send(&self, port_name: &str, message: &MidiMessage) -> Result<(), PortError>;
}

//! Device-neutral grid model and per-generation dispatch.

use std::fmt;

use padctl_core::{MidiMessage, PadColor};

use super::{classic, colorful};

/// How a grid cell is addressed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Note,
    ControlChange,
    /// SysEx LED index
    LedIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadMapping {
    pub kind: AddressKind,
    pub number: u8,
    /// False for cells the hardware does not have.
    pub exists: bool,
}

impl PadMapping {
    pub const fn new(kind: AddressKind, number: u8) -> Self {
        Self {
            kind,
            number,
            exists: true,
        }
    }

    pub const fn missing() -> Self {
        Self {
            kind: AddressKind::Note,
            number: 0,
            exists: false,
        }
    }
}

/// A decoded press or release at a grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEvent {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
}

impl GridEvent {
    pub const fn new(row: u8, col: u8, pressed: bool) -> Self {
        Self { row, col, pressed }
    }
}

/// The supported hardware generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Red/green pads, note and CC addressing.
    Classic,
    /// RGB pads driven by SysEx in programmer mode.
    Colorful,
    /// No grid; driven only by message mappings.
    Generic,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Classic => "classic",
            DeviceKind::Colorful => "colorful",
            DeviceKind::Generic => "generic",
        }
    }

    pub fn is_classic(&self) -> bool {
        matches!(self, DeviceKind::Classic)
    }

    pub fn has_grid(&self) -> bool {
        !matches!(self, DeviceKind::Generic)
    }

    pub fn address(&self, row: u8, col: u8) -> PadMapping {
        match self {
            DeviceKind::Classic => classic::address(row, col),
            DeviceKind::Colorful => colorful::address(row, col),
            DeviceKind::Generic => PadMapping::missing(),
        }
    }

    /// Messages that put the device under host control.
    pub fn activation(&self) -> Vec<MidiMessage> {
        match self {
            DeviceKind::Classic => vec![classic::reset()],
            DeviceKind::Colorful => vec![colorful::programmer_mode()],
            DeviceKind::Generic => Vec::new(),
        }
    }

    /// The message painting one cell, or `None` if there is nothing to send.
    pub fn set_pad_color(&self, row: u8, col: u8, color: PadColor) -> Option<MidiMessage> {
        match self {
            DeviceKind::Classic => classic::set_pad_color(row, col, color),
            DeviceKind::Colorful => colorful::set_pad_color(row, col, color),
            DeviceKind::Generic => None,
        }
    }

    pub fn clear_all(&self) -> Vec<MidiMessage> {
        match self {
            DeviceKind::Classic => vec![classic::reset()],
            DeviceKind::Colorful => vec![colorful::clear_all()],
            DeviceKind::Generic => Vec::new(),
        }
    }

    pub fn decode(&self, message: &MidiMessage) -> Option<GridEvent> {
        match self {
            DeviceKind::Classic => classic::decode(message),
            DeviceKind::Colorful => colorful::decode(message),
            DeviceKind::Generic => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

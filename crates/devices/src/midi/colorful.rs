//! RGB generation grid (Launchpad Mini MK3 family) in programmer mode.
//!
//! LEDs are addressed by index, `(8-row)*10 + col + 11`: the top row is
//! 91-99, the bottom row 11-19.

use padctl_core::{MidiMessage, PadColor};

use super::mapping::{AddressKind, GridEvent, PadMapping};

/// Novation SysEx header for this model, without the command byte.
const HEADER: [u8; 5] = [0x00, 0x20, 0x29, 0x02, 0x0D];
const CMD_LED: u8 = 0x03;
const CMD_MODE: u8 = 0x0E;
const LED_RGB: u8 = 0x03;
const LED_STATIC: u8 = 0x00;

const FIRST_LED: u8 = 11;
const LAST_LED: u8 = 99;
const TOP_ROW_CC: u8 = 91;

pub fn led_index(row: u8, col: u8) -> Option<u8> {
    (row <= 8 && col <= 8).then(|| (8 - row) * 10 + col + FIRST_LED)
}

pub fn address(row: u8, col: u8) -> PadMapping {
    led_index(row, col)
        .map(|index| PadMapping::new(AddressKind::LedIndex, index))
        .unwrap_or_else(PadMapping::missing)
}

/// Square-law brightness curve. Non-zero input never maps to zero.
pub fn scale_color(value: u8) -> u8 {
    if value == 0 {
        return 0;
    }
    let f = value.min(127) as f64 / 127.0;
    let scaled = f * f * 127.0;
    if scaled < 1.0 {
        1
    } else {
        scaled as u8
    }
}

pub fn programmer_mode() -> MidiMessage {
    let mut body = HEADER.to_vec();
    body.extend_from_slice(&[CMD_MODE, 0x01]);
    MidiMessage::sysex(body)
}

pub fn set_pad_color(row: u8, col: u8, color: PadColor) -> Option<MidiMessage> {
    let index = led_index(row, col)?;

    let mut body = HEADER.to_vec();
    body.extend_from_slice(&[
        CMD_LED,
        LED_RGB,
        index,
        scale_color(color.r) & 0x7F,
        scale_color(color.g) & 0x7F,
        scale_color(color.b) & 0x7F,
    ]);
    Some(MidiMessage::sysex(body))
}

/// One message setting every LED index to static palette color 0.
pub fn clear_all() -> MidiMessage {
    let mut body = HEADER.to_vec();
    body.push(CMD_LED);
    for index in FIRST_LED..=LAST_LED {
        if index % 10 != 0 {
            body.extend_from_slice(&[LED_STATIC, index, 0x00]);
        }
    }
    MidiMessage::sysex(body)
}

fn note_to_grid(note: u8) -> Option<(u8, u8)> {
    if !(FIRST_LED..=LAST_LED).contains(&note) {
        return None;
    }
    let offset = note - FIRST_LED;
    let row = 8u8.checked_sub(offset / 10)?;
    let col = offset % 10;
    (col <= 8).then_some((row, col))
}

pub fn decode(message: &MidiMessage) -> Option<GridEvent> {
    match *message {
        MidiMessage::NoteOn { note, velocity, .. } => {
            note_to_grid(note).map(|(row, col)| GridEvent::new(row, col, velocity > 0))
        }
        MidiMessage::NoteOff { note, .. } => {
            note_to_grid(note).map(|(row, col)| GridEvent::new(row, col, false))
        }
        MidiMessage::ControlChange {
            controller, value, ..
        } => {
            if (TOP_ROW_CC..TOP_ROW_CC + 8).contains(&controller) {
                Some(GridEvent::new(0, controller - TOP_ROW_CC, value > 0))
            } else if controller % 10 == 9 && (19..=89).contains(&controller) {
                Some(GridEvent::new(8 - (controller - 19) / 10, 8, value > 0))
            } else {
                None
            }
        }
        _ => None,
    }
}

//! Red/green generation grid (Launchpad S family).
//!
//! ```text
//! Row 0:     CC 104-111 (no cell at column 8)
//! Rows 1-8:  notes (row-1)*16 + col, column 8 is the side button
//! ```
//!
//! Colors are a single velocity byte `0bGG11RR`: two bits of green, two bits
//! of red and the `0x0C` flags selecting immediate (unbuffered) update.

use padctl_core::{classic_levels, MidiMessage, PadColor, NEAR_BLACK};

use super::mapping::{AddressKind, GridEvent, PadMapping};

pub const TOP_ROW_CC: u8 = 104;
const FLAGS: u8 = 0x0C;

/// Velocity that turns a pad off.
pub const OFF_VELOCITY: u8 = FLAGS;

pub fn address(row: u8, col: u8) -> PadMapping {
    match (row, col) {
        (0, 0..=7) => PadMapping::new(AddressKind::ControlChange, TOP_ROW_CC + col),
        (1..=8, 0..=8) => PadMapping::new(AddressKind::Note, (row - 1) * 16 + col),
        _ => PadMapping::missing(),
    }
}

pub fn velocity(color: PadColor) -> u8 {
    if color.r < NEAR_BLACK && color.g < NEAR_BLACK && color.b < NEAR_BLACK {
        return OFF_VELOCITY;
    }
    let (red, green) = classic_levels(color);
    (green << 4) | FLAGS | red
}

/// Resets the device, which also turns every LED off.
pub fn reset() -> MidiMessage {
    MidiMessage::control_change(0, 0, 0)
}

pub fn set_pad_color(row: u8, col: u8, color: PadColor) -> Option<MidiMessage> {
    let mapping = address(row, col);
    if !mapping.exists {
        return None;
    }

    let velocity = velocity(color);
    Some(match mapping.kind {
        AddressKind::ControlChange => MidiMessage::control_change(0, mapping.number, velocity),
        _ => MidiMessage::note_on(0, mapping.number, velocity),
    })
}

fn note_to_grid(key: u8) -> Option<(u8, u8)> {
    let row = key / 16 + 1;
    let col = key % 16;
    ((1..=8).contains(&row) && col <= 8).then_some((row, col))
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
        } if (TOP_ROW_CC..TOP_ROW_CC + 8).contains(&controller) => {
            Some(GridEvent::new(0, controller - TOP_ROW_CC, value > 0))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_row_is_cc_and_corner_is_missing() {
        assert_eq!(
            address(0, 0),
            PadMapping::new(AddressKind::ControlChange, 104)
        );
        assert_eq!(
            address(0, 7),
            PadMapping::new(AddressKind::ControlChange, 111)
        );
        assert!(!address(0, 8).exists);
        assert!(set_pad_color(0, 8, PadColor::new(127, 0, 0)).is_none());
    }

    #[test]
    fn test_grid_notes() {
        assert_eq!(address(1, 0), PadMapping::new(AddressKind::Note, 0));
        assert_eq!(address(1, 8), PadMapping::new(AddressKind::Note, 8));
        assert_eq!(address(8, 8), PadMapping::new(AddressKind::Note, 120));
        assert!(!address(9, 0).exists);
    }

    #[test]
    fn test_velocity_packing() {
        assert_eq!(velocity(PadColor::new(4, 4, 4)), OFF_VELOCITY);
        assert_eq!(velocity(PadColor::new(127, 0, 0)), 0x0C | 0x03);
        assert_eq!(velocity(PadColor::new(0, 127, 0)), 0x3C);
        assert_eq!(velocity(PadColor::new(127, 127, 0)), 0x3F);
        // Low but not near-black still uses the quantized levels
        assert_eq!(velocity(PadColor::new(10, 0, 0)), 0x0C);
    }

    #[test]
    fn test_top_left_green() {
        let msg = set_pad_color(0, 0, PadColor::new(0, 127, 0)).unwrap();
        assert_eq!(msg.to_bytes(), vec![0xB0, 104, 0x3C]);
    }

    #[test]
    fn test_decode() {
        assert_eq!(
            decode(&MidiMessage::note_on(0, 0x13, 127)),
            Some(GridEvent::new(2, 3, true))
        );
        assert_eq!(
            decode(&MidiMessage::note_on(0, 0x13, 0)),
            Some(GridEvent::new(2, 3, false))
        );
        assert_eq!(
            decode(&MidiMessage::note_off(0, 8)),
            Some(GridEvent::new(1, 8, false))
        );
        assert_eq!(
            decode(&MidiMessage::control_change(0, 111, 127)),
            Some(GridEvent::new(0, 7, true))
        );
        // Columns 9-15 of the note layout are not wired
        assert_eq!(decode(&MidiMessage::note_on(0, 9, 127)), None);
        assert_eq!(decode(&MidiMessage::control_change(0, 112, 127)), None);
        assert_eq!(decode(&MidiMessage::note_on(0, 0x7F, 127)), None);
    }
}

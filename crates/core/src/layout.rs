use serde::{Deserialize, Serialize};

/// Grid dimension shared by every supported surface (including the top row
/// and right column of function buttons).
pub const GRID_SIZE: usize = 9;

/// Channel values below this count as black on red/green-only hardware.
pub const NEAR_BLACK: u8 = 5;

/// An RGB pad color with each channel in `0..=127`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PadColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PadColor {
    pub const OFF: PadColor = PadColor { r: 0, g: 0, b: 0 };

    /// Build a color, clamping every channel to the 7-bit range.
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r.min(127),
            g: g.min(127),
            b: b.min(127),
        }
    }

    pub fn is_off(&self) -> bool {
        self.r == 0 && self.g == 0 && self.b == 0
    }
}

/// Quantize a 7-bit intensity to the four brightness steps of a red/green pad.
pub fn intensity_level(value: u8) -> u8 {
    match value {
        0..=31 => 0,
        32..=63 => 1,
        64..=95 => 2,
        _ => 3,
    }
}

/// Red and green brightness levels (0-3) for a red/green-only pad.
///
/// Blue has no LED of its own, so a quarter of it is folded into red and the
/// rest into green.
pub fn classic_levels(color: PadColor) -> (u8, u8) {
    let r = color.r as u16 + color.b as u16 / 4;
    let g = color.g as u16 + (color.b as u16 * 3) / 4;
    (
        intensity_level(r.min(127) as u8),
        intensity_level(g.min(127) as u8),
    )
}

pub fn level_to_127(level: u8) -> u8 {
    match level {
        0 => 0,
        1 => 42,
        2 => 85,
        _ => 127,
    }
}

/// Inverse of [`level_to_127`], splitting at the midpoints.
pub fn level_127_to_4(value: u8) -> u8 {
    match value {
        0..=20 => 0,
        21..=63 => 1,
        64..=105 => 2,
        _ => 3,
    }
}

/// What `color` will look like once shown on red/green hardware.
pub fn classic_preview(color: PadColor) -> PadColor {
    let (r, g) = classic_levels(color);
    PadColor::new(level_to_127(r), level_to_127(g), 0)
}

/// Colors and assignment for one grid cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadColorConfig {
    pub r: u8,
    pub g: u8,
    pub b: u8,

    pub classic_r: u8,
    pub classic_g: u8,
    pub classic_b: u8,

    pub pressed_r: u8,
    pub pressed_g: u8,
    pub pressed_b: u8,

    pub classic_pressed_r: u8,
    pub classic_pressed_g: u8,
    pub classic_pressed_b: u8,

    /// Classic colors follow the button colors.
    pub link_button_classic: bool,
    pub link_pressed_classic: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub action_id: String,
}

impl PadColorConfig {
    pub fn button(&self) -> PadColor {
        PadColor::new(self.r, self.g, self.b)
    }

    pub fn pressed(&self) -> PadColor {
        PadColor::new(self.pressed_r, self.pressed_g, self.pressed_b)
    }

    pub fn classic(&self) -> PadColor {
        PadColor::new(self.classic_r, self.classic_g, self.classic_b)
    }

    pub fn classic_pressed(&self) -> PadColor {
        PadColor::new(
            self.classic_pressed_r,
            self.classic_pressed_g,
            self.classic_pressed_b,
        )
    }

    /// The color to paint for a device generation and press state.
    pub fn color_for(&self, classic: bool, pressed: bool) -> PadColor {
        match (classic, pressed) {
            (false, false) => self.button(),
            (false, true) => self.pressed(),
            (true, false) => self.classic(),
            (true, true) => self.classic_pressed(),
        }
    }

    pub fn set_button(&mut self, color: PadColor) {
        self.r = color.r;
        self.g = color.g;
        self.b = color.b;
        if self.link_button_classic {
            self.sync_classic_from_button();
        }
    }

    pub fn set_pressed(&mut self, color: PadColor) {
        self.pressed_r = color.r;
        self.pressed_g = color.g;
        self.pressed_b = color.b;
        if self.link_pressed_classic {
            self.sync_classic_pressed_from_pressed();
        }
    }

    pub fn sync_classic_from_button(&mut self) {
        let preview = classic_preview(self.button());
        self.classic_r = preview.r;
        self.classic_g = preview.g;
        self.classic_b = 0;
    }

    pub fn sync_classic_pressed_from_pressed(&mut self) {
        let preview = classic_preview(self.pressed());
        self.classic_pressed_r = preview.r;
        self.classic_pressed_g = preview.g;
        self.classic_pressed_b = 0;
    }

    /// Derive unset classic colors from their full-color counterparts and
    /// turn the link on. Returns true if anything changed.
    pub fn ensure_default_linking(&mut self) -> bool {
        let mut changed = false;

        if !self.button().is_off() && self.classic().is_off() {
            self.link_button_classic = true;
            self.sync_classic_from_button();
            changed = true;
        }

        if !self.pressed().is_off() && self.classic_pressed().is_off() {
            self.link_pressed_classic = true;
            self.sync_classic_pressed_from_pressed();
            changed = true;
        }

        changed
    }
}

/// A named 9x9 page of pad colors and action assignments, indexed `[row][col]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuLayout {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub colors: [[PadColorConfig; GRID_SIZE]; GRID_SIZE],
}

impl MenuLayout {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            colors: Default::default(),
        }
    }

    pub fn pad(&self, row: usize, col: usize) -> Option<&PadColorConfig> {
        self.colors.get(row)?.get(col)
    }

    pub fn pad_mut(&mut self, row: usize, col: usize) -> Option<&mut PadColorConfig> {
        self.colors.get_mut(row)?.get_mut(col)
    }

    /// Every cell as `(row, col, config)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &PadColorConfig)> {
        self.colors
            .iter()
            .enumerate()
            .flat_map(|(row, cols)| cols.iter().enumerate().map(move |(col, c)| (row, col, c)))
    }

    /// Run [`PadColorConfig::ensure_default_linking`] on every cell.
    pub fn ensure_default_linking(&mut self) -> usize {
        self.colors
            .iter_mut()
            .flat_map(|cols| cols.iter_mut())
            .map(PadColorConfig::ensure_default_linking)
            .filter(|changed| *changed)
            .count()
    }
}

impl Default for MenuLayout {
    fn default() -> Self {
        Self::new("Main Menu")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_levels_fold_blue() {
        assert_eq!(classic_levels(PadColor::new(127, 0, 0)), (3, 0));
        assert_eq!(classic_levels(PadColor::new(0, 127, 0)), (0, 3));
        // 0 + 127/4 = 31 red, 95 green
        assert_eq!(classic_levels(PadColor::new(0, 0, 127)), (0, 2));
        assert_eq!(classic_levels(PadColor::new(127, 127, 127)), (3, 3));
    }

    #[test]
    fn test_level_conversions() {
        for level in 0..4 {
            assert_eq!(level_127_to_4(level_to_127(level)), level);
        }
        assert_eq!(level_127_to_4(20), 0);
        assert_eq!(level_127_to_4(21), 1);
        assert_eq!(level_127_to_4(105), 2);
        assert_eq!(level_127_to_4(106), 3);
    }

    #[test]
    fn test_classic_preview_has_no_blue() {
        let preview = classic_preview(PadColor::new(50, 100, 127));
        assert_eq!(preview.b, 0);
        assert_eq!(preview, PadColor::new(85, 127, 0));
    }

    #[test]
    fn test_pad_color_clamps() {
        assert_eq!(PadColor::new(200, 128, 5), PadColor { r: 127, g: 127, b: 5 });
    }

    #[test]
    fn test_default_linking_only_fills_black_classics() {
        let mut pad = PadColorConfig {
            r: 127,
            pressed_g: 127,
            classic_pressed_r: 42,
            ..Default::default()
        };
        assert!(pad.ensure_default_linking());
        assert!(pad.link_button_classic);
        assert_eq!(pad.classic(), PadColor::new(127, 0, 0));
        // Pressed classic was already set by hand
        assert!(!pad.link_pressed_classic);
        assert_eq!(pad.classic_pressed(), PadColor::new(42, 0, 0));

        assert!(!pad.ensure_default_linking());
    }

    #[test]
    fn test_linked_button_updates_classic() {
        let mut pad = PadColorConfig {
            link_button_classic: true,
            ..Default::default()
        };
        pad.set_button(PadColor::new(0, 70, 0));
        assert_eq!(pad.classic(), PadColor::new(0, 85, 0));
        assert_eq!(pad.color_for(true, false), pad.classic());
        assert_eq!(pad.color_for(false, false), PadColor::new(0, 70, 0));
    }

    #[test]
    fn test_layout_json_defaults() {
        let layout: MenuLayout = serde_json::from_str(r#"{"id":"m","name":"Main"}"#).unwrap();
        assert_eq!(layout.cells().count(), GRID_SIZE * GRID_SIZE);
        assert!(layout.pad(8, 8).unwrap().button().is_off());
        assert!(layout.pad(9, 0).is_none());
    }
}

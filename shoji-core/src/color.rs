//! Cell color representation
//!
//! A cell's foreground or background is either the terminal default, an
//! index into the 256-entry palette, or a direct 24-bit value. Indexed and
//! true color are mutually exclusive by construction.

use serde::{Deserialize, Serialize};

/// Color of a cell's foreground or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// The terminal default for the channel
    #[default]
    Default,
    /// Palette index: 0-7 normal, 8-15 bright, 16-231 cube, 232-255 gray ramp
    Indexed(u8),
    /// Direct 24-bit color from SGR 38;2 / 48;2
    Rgb { r: u8, g: u8, b: u8 },
}

impl Color {
    pub const BLACK: u8 = 0;
    pub const RED: u8 = 1;
    pub const GREEN: u8 = 2;
    pub const YELLOW: u8 = 3;
    pub const BLUE: u8 = 4;
    pub const MAGENTA: u8 = 5;
    pub const CYAN: u8 = 6;
    pub const WHITE: u8 = 7;

    pub fn indexed(index: u8) -> Self {
        Color::Indexed(index)
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }
}

/// A palette entry with 16-bit channels, as used by the XTerm 256-color
/// table and OSC 4 color specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RgbColor16 {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

impl RgbColor16 {
    pub fn new(red: u16, green: u16, blue: u16) -> Self {
        Self { red, green, blue }
    }

    /// Widen 8-bit channels by replication (0xAB becomes 0xABAB).
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            red: u16::from(r) * 0x101,
            green: u16::from(g) * 0x101,
            blue: u16::from(b) * 0x101,
        }
    }

    /// Truncate to 8-bit channels.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        ((self.red >> 8) as u8, (self.green >> 8) as u8, (self.blue >> 8) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_default() {
        assert_eq!(Color::default(), Color::Default);
    }

    #[test]
    fn test_channel_widening() {
        let c = RgbColor16::from_rgb8(0xFF, 0x80, 0x00);
        assert_eq!(c, RgbColor16::new(0xFFFF, 0x8080, 0x0000));
    }

    #[test]
    fn test_channel_truncation() {
        let c = RgbColor16::new(0xFFFF, 0x8080, 0x1234);
        assert_eq!(c.to_rgb8(), (0xFF, 0x80, 0x12));
    }
}

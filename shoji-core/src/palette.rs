//! The XTerm 256-color table
//!
//! One mutable palette per screen. Entries 0-15 are fixed by the emulator
//! variant and cannot be changed through OSC 4; entries 16-255 may be
//! reassigned and reset. Channels are 16-bit, matching X11 color
//! specifications.

use serde::{Deserialize, Serialize};

use crate::color::RgbColor16;
use crate::error::{Error, Result};

/// First palette index that OSC 4 may modify.
pub const FIRST_MUTABLE_INDEX: u16 = 16;

/// A 256-entry indexed color table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XtermPalette {
    entries: Vec<RgbColor16>,
}

impl XtermPalette {
    pub fn new() -> Self {
        Self {
            entries: (0..=255u16).map(default_entry).collect(),
        }
    }

    pub fn entry(&self, index: u16) -> Result<RgbColor16> {
        self.entries
            .get(usize::from(index))
            .copied()
            .ok_or(Error::ParameterError)
    }

    /// Assign a mutable entry. Indices below 16 belong to the emulator
    /// variant and are rejected.
    pub fn set_entry(&mut self, index: u16, color: RgbColor16) -> Result<()> {
        if !(FIRST_MUTABLE_INDEX..=255).contains(&index) {
            return Err(Error::ParameterError);
        }
        self.entries[usize::from(index)] = color;
        Ok(())
    }

    /// Restore one mutable entry to its default value.
    pub fn reset_entry(&mut self, index: u16) -> Result<()> {
        if !(FIRST_MUTABLE_INDEX..=255).contains(&index) {
            return Err(Error::ParameterError);
        }
        self.entries[usize::from(index)] = default_entry(index);
        Ok(())
    }

    /// Restore every mutable entry.
    pub fn reset_all(&mut self) {
        for index in FIRST_MUTABLE_INDEX..=255 {
            self.entries[usize::from(index)] = default_entry(index);
        }
    }
}

impl Default for XtermPalette {
    fn default() -> Self {
        Self::new()
    }
}

/// The stock xterm value of a palette entry.
pub fn default_entry(index: u16) -> RgbColor16 {
    match index {
        0 => RgbColor16::from_rgb8(0, 0, 0),
        1 => RgbColor16::from_rgb8(205, 0, 0),
        2 => RgbColor16::from_rgb8(0, 205, 0),
        3 => RgbColor16::from_rgb8(205, 205, 0),
        4 => RgbColor16::from_rgb8(0, 0, 238),
        5 => RgbColor16::from_rgb8(205, 0, 205),
        6 => RgbColor16::from_rgb8(0, 205, 205),
        7 => RgbColor16::from_rgb8(229, 229, 229),
        8 => RgbColor16::from_rgb8(127, 127, 127),
        9 => RgbColor16::from_rgb8(255, 0, 0),
        10 => RgbColor16::from_rgb8(0, 255, 0),
        11 => RgbColor16::from_rgb8(255, 255, 0),
        12 => RgbColor16::from_rgb8(92, 92, 255),
        13 => RgbColor16::from_rgb8(255, 0, 255),
        14 => RgbColor16::from_rgb8(0, 255, 255),
        15 => RgbColor16::from_rgb8(255, 255, 255),
        16..=231 => {
            // 6x6x6 cube
            let offset = index - 16;
            let level = |v: u16| -> u8 {
                if v == 0 {
                    0
                } else {
                    (55 + v * 40) as u8
                }
            };
            RgbColor16::from_rgb8(
                level(offset / 36),
                level((offset % 36) / 6),
                level(offset % 6),
            )
        }
        232..=255 => {
            let gray = (8 + (index - 232) * 10) as u8;
            RgbColor16::from_rgb8(gray, gray, gray)
        }
        _ => RgbColor16::default(),
    }
}

/// Parse an X11-style color specification as used by OSC 4: either
/// `rgb:<r>/<g>/<b>` with 1-4 hex digits per channel, or `#RRGGBB` /
/// `#RRRRGGGGBBBB`. Shorter channels scale to the full 16-bit range, so
/// `ff` means 0xFFFF, not 0xFF00.
pub fn parse_color_spec(spec: &str) -> Option<RgbColor16> {
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut channels = rest.split('/');
        let red = scale_channel(channels.next()?)?;
        let green = scale_channel(channels.next()?)?;
        let blue = scale_channel(channels.next()?)?;
        if channels.next().is_some() {
            return None;
        }
        return Some(RgbColor16::new(red, green, blue));
    }
    if let Some(hex) = spec.strip_prefix('#') {
        let per_channel = match hex.len() {
            6 => 2,
            12 => 4,
            _ => return None,
        };
        let red = scale_channel(&hex[..per_channel])?;
        let green = scale_channel(&hex[per_channel..2 * per_channel])?;
        let blue = scale_channel(&hex[2 * per_channel..])?;
        return Some(RgbColor16::new(red, green, blue));
    }
    None
}

fn scale_channel(digits: &str) -> Option<u16> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len() as u32)) - 1;
    Some((value * 0xFFFF / max) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_primaries() {
        let palette = XtermPalette::new();
        assert_eq!(palette.entry(1).unwrap(), RgbColor16::from_rgb8(205, 0, 0));
        assert_eq!(palette.entry(15).unwrap(), RgbColor16::from_rgb8(255, 255, 255));
    }

    #[test]
    fn test_default_cube_and_grays() {
        let palette = XtermPalette::new();
        assert_eq!(palette.entry(16).unwrap(), RgbColor16::from_rgb8(0, 0, 0));
        assert_eq!(palette.entry(196).unwrap(), RgbColor16::from_rgb8(255, 0, 0));
        assert_eq!(palette.entry(232).unwrap(), RgbColor16::from_rgb8(8, 8, 8));
        assert_eq!(palette.entry(255).unwrap(), RgbColor16::from_rgb8(238, 238, 238));
    }

    #[test]
    fn test_set_entry_rejects_fixed_range() {
        let mut palette = XtermPalette::new();
        let color = RgbColor16::new(1, 2, 3);
        assert_eq!(palette.set_entry(7, color), Err(Error::ParameterError));
        assert!(palette.set_entry(16, color).is_ok());
        assert_eq!(palette.entry(16).unwrap(), color);
    }

    #[test]
    fn test_reset_entry() {
        let mut palette = XtermPalette::new();
        palette.set_entry(40, RgbColor16::new(9, 9, 9)).unwrap();
        palette.reset_entry(40).unwrap();
        assert_eq!(palette.entry(40).unwrap(), default_entry(40));
    }

    #[test]
    fn test_parse_rgb_spec_two_digit_scaling() {
        let c = parse_color_spec("rgb:ff/80/00").unwrap();
        assert_eq!(c, RgbColor16::new(0xFFFF, 0x8080, 0x0000));
    }

    #[test]
    fn test_parse_rgb_spec_one_and_four_digits() {
        assert_eq!(
            parse_color_spec("rgb:f/0/0").unwrap(),
            RgbColor16::new(0xFFFF, 0, 0)
        );
        assert_eq!(
            parse_color_spec("rgb:1234/5678/9abc").unwrap(),
            RgbColor16::new(0x1234, 0x5678, 0x9abc)
        );
    }

    #[test]
    fn test_parse_hash_spec() {
        assert_eq!(
            parse_color_spec("#ff8000").unwrap(),
            RgbColor16::new(0xFFFF, 0x8080, 0x0000)
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_color_spec("").is_none());
        assert!(parse_color_spec("rgb:ff/80").is_none());
        assert!(parse_color_spec("#ff80").is_none());
        assert!(parse_color_spec("cornflower").is_none());
    }
}

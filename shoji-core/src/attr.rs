//! Cell and line attributes
//!
//! An `AttributeWord` describes the rendition of one cell: colors plus the
//! boolean styles from SGR, the DEC protected bit, and the search-highlight
//! bit maintained by the find machinery. The double-size classes apply to a
//! whole line and live in `LineAttr`.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Rendition of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeWord {
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Bold (SGR 1)
    pub bold: bool,
    /// Faint (SGR 2)
    pub faint: bool,
    /// Italic (SGR 3)
    pub italic: bool,
    /// Underline (SGR 4)
    pub underline: bool,
    /// Blink (SGR 5)
    pub blink: bool,
    /// Inverse video (SGR 7)
    pub inverse: bool,
    /// Concealed (SGR 8)
    pub concealed: bool,
    /// DECSCA protected bit; orthogonal to the SGR styles
    pub protected: bool,
    /// Set on cells inside a search result
    pub highlighted: bool,
}

impl AttributeWord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The rendition of an erased cell: current background, nothing else.
    pub fn with_background(bg: Color) -> Self {
        Self {
            bg,
            ..Self::default()
        }
    }

    /// Reset the SGR-controlled parts, leaving protected/highlight intact.
    pub fn reset_rendition(&mut self) {
        let protected = self.protected;
        let highlighted = self.highlighted;
        *self = Self {
            protected,
            highlighted,
            ..Self::default()
        };
    }

    /// Apply set/clear masks over the boolean attributes. Colors are not
    /// part of the flag set and are unaffected.
    pub fn apply(&mut self, set: AttributeFlags, clear: AttributeFlags) {
        for (flag, field) in self.flag_fields() {
            let current = *field;
            *field = (current || set.contains(flag)) && !clear.contains(flag);
        }
    }

    /// Current boolean attributes as a flag set.
    pub fn flags(&self) -> AttributeFlags {
        let mut flags = AttributeFlags::empty();
        let mut copy = *self;
        for (flag, field) in copy.flag_fields() {
            if *field {
                flags = flags.union(flag);
            }
        }
        flags
    }

    fn flag_fields(&mut self) -> [(AttributeFlags, &mut bool); 9] {
        [
            (AttributeFlags::BOLD, &mut self.bold),
            (AttributeFlags::FAINT, &mut self.faint),
            (AttributeFlags::ITALIC, &mut self.italic),
            (AttributeFlags::UNDERLINE, &mut self.underline),
            (AttributeFlags::BLINK, &mut self.blink),
            (AttributeFlags::INVERSE, &mut self.inverse),
            (AttributeFlags::CONCEALED, &mut self.concealed),
            (AttributeFlags::PROTECTED, &mut self.protected),
            (AttributeFlags::HIGHLIGHTED, &mut self.highlighted),
        ]
    }
}

/// Mask over the boolean attributes, used by the set/clear range APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeFlags(u16);

impl AttributeFlags {
    pub const BOLD: Self = Self(1 << 0);
    pub const FAINT: Self = Self(1 << 1);
    pub const ITALIC: Self = Self(1 << 2);
    pub const UNDERLINE: Self = Self(1 << 3);
    pub const BLINK: Self = Self(1 << 4);
    pub const INVERSE: Self = Self(1 << 5);
    pub const CONCEALED: Self = Self(1 << 6);
    pub const PROTECTED: Self = Self(1 << 7);
    pub const HIGHLIGHTED: Self = Self(1 << 8);

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for AttributeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Per-line double-size class (DECDWL/DECDHL), plus the normal case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineAttr {
    #[default]
    Single,
    DoubleWidth,
    DoubleHeightTop,
    DoubleHeightBottom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_only_erase() {
        let erased = AttributeWord::with_background(Color::Indexed(4));
        assert_eq!(erased.bg, Color::Indexed(4));
        assert_eq!(erased.fg, Color::Default);
        assert!(!erased.bold && !erased.underline && !erased.protected);
    }

    #[test]
    fn test_reset_rendition_keeps_orthogonal_bits() {
        let mut attrs = AttributeWord {
            bold: true,
            fg: Color::Indexed(1),
            protected: true,
            highlighted: true,
            ..AttributeWord::default()
        };
        attrs.reset_rendition();
        assert!(!attrs.bold);
        assert_eq!(attrs.fg, Color::Default);
        assert!(attrs.protected);
        assert!(attrs.highlighted);
    }

    #[test]
    fn test_apply_set_and_clear() {
        let mut attrs = AttributeWord {
            bold: true,
            ..AttributeWord::default()
        };
        attrs.apply(
            AttributeFlags::HIGHLIGHTED | AttributeFlags::ITALIC,
            AttributeFlags::BOLD,
        );
        assert!(attrs.highlighted);
        assert!(attrs.italic);
        assert!(!attrs.bold);
    }

    #[test]
    fn test_flags_round_trip() {
        let attrs = AttributeWord {
            bold: true,
            inverse: true,
            protected: true,
            ..AttributeWord::default()
        };
        let flags = attrs.flags();
        assert!(flags.contains(AttributeFlags::BOLD));
        assert!(flags.contains(AttributeFlags::INVERSE));
        assert!(flags.contains(AttributeFlags::PROTECTED));
        assert!(!flags.contains(AttributeFlags::ITALIC));
    }
}

//! One character position of the grid
//!
//! A cell pairs a Unicode scalar with an `AttributeWord`. Wide (East-Asian
//! width W) characters occupy two adjacent cells: the first carries the
//! character with width 2, the second is a continuation with width 0.

use serde::{Deserialize, Serialize};

use crate::attr::AttributeWord;
use crate::color::Color;

/// A single character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The stored scalar; blank cells hold a space
    ch: char,
    /// Rendition of this cell
    pub attrs: AttributeWord,
    /// Columns occupied: 1 normal, 2 wide lead, 0 continuation
    width: u8,
}

impl Cell {
    /// A blank cell with default attributes.
    pub fn blank() -> Self {
        Self {
            ch: ' ',
            attrs: AttributeWord::default(),
            width: 1,
        }
    }

    /// A blank cell carrying only a background color (the erase rendition).
    pub fn erased(bg: Color) -> Self {
        Self {
            ch: ' ',
            attrs: AttributeWord::with_background(bg),
            width: 1,
        }
    }

    pub fn with_char(ch: char, attrs: AttributeWord) -> Self {
        Self {
            ch,
            attrs,
            width: display_width(ch),
        }
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn set_char(&mut self, ch: char) {
        self.ch = ch;
        self.width = display_width(ch);
    }

    /// Columns this cell occupies.
    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn is_wide_lead(&self) -> bool {
        self.width == 2
    }

    /// True for the trailing half of a wide character.
    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    /// Turn this cell into the trailing half of a wide character.
    pub fn make_continuation(&mut self, attrs: AttributeWord) {
        self.ch = ' ';
        self.attrs = attrs;
        self.width = 0;
    }

    /// True when the cell shows nothing (space or continuation).
    pub fn is_blank(&self) -> bool {
        self.ch == ' ' || self.width == 0
    }

    /// Erase in place, keeping only the given background.
    pub fn erase(&mut self, bg: Color) {
        *self = Self::erased(bg);
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank()
    }
}

/// Columns a scalar occupies on screen. Zero-width combining marks are
/// folded into width 1 here; the screen model does not merge clusters.
pub fn display_width(ch: char) -> u8 {
    use unicode_width::UnicodeWidthChar;
    match ch.width() {
        Some(2) => 2,
        Some(0) | None => 1,
        Some(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cell() {
        let cell = Cell::blank();
        assert!(cell.is_blank());
        assert_eq!(cell.width(), 1);
        assert_eq!(cell.ch(), ' ');
    }

    #[test]
    fn test_narrow_char() {
        let cell = Cell::with_char('A', AttributeWord::default());
        assert_eq!(cell.ch(), 'A');
        assert_eq!(cell.width(), 1);
        assert!(!cell.is_blank());
    }

    #[test]
    fn test_wide_char() {
        let cell = Cell::with_char('中', AttributeWord::default());
        assert_eq!(cell.width(), 2);
        assert!(cell.is_wide_lead());
    }

    #[test]
    fn test_continuation() {
        let mut cell = Cell::with_char('x', AttributeWord::default());
        cell.make_continuation(AttributeWord::default());
        assert!(cell.is_continuation());
        assert!(cell.is_blank());
    }

    #[test]
    fn test_erase_keeps_background() {
        let mut cell = Cell::with_char('Q', AttributeWord::default());
        cell.attrs.bold = true;
        cell.erase(Color::Indexed(2));
        assert!(cell.is_blank());
        assert!(!cell.attrs.bold);
        assert_eq!(cell.attrs.bg, Color::Indexed(2));
    }
}

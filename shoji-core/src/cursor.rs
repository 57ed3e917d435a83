//! Cursor position, rendition, and the save/restore slot
//!
//! The cursor stores screen-absolute coordinates even in origin mode;
//! region-relative addressing is applied at the dispatch layer. The
//! wrap-pending sentinel is a separate flag: when set, the cursor reports
//! column `visible_columns` and the next printable character wraps first.

use serde::{Deserialize, Serialize};

use crate::attr::AttributeWord;
use crate::charset::CharsetState;

/// Visual shape selected by DECSCUSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorStyle {
    #[default]
    Block,
    Underline,
    Bar,
}

/// Cursor state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Row, 0-based, screen-absolute
    pub row: usize,
    /// Column, 0-based; the sentinel is encoded by `pending_wrap`
    pub col: usize,
    /// Rendition applied to newly written cells
    pub attrs: AttributeWord,
    /// Cursor shown or hidden (DECTCEM)
    pub visible: bool,
    /// Visual shape (DECSCUSR)
    pub style: CursorStyle,
    /// At the right margin with wrap delayed until the next printable
    pub pending_wrap: bool,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            row: 0,
            col: 0,
            attrs: AttributeWord::default(),
            visible: true,
            style: CursorStyle::Block,
            pending_wrap: false,
        }
    }

    /// Column as reported: `visible_columns` while the wrap sentinel holds.
    pub fn reported_col(&self) -> usize {
        self.col + usize::from(self.pending_wrap)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot taken by DECSC and restored by DECRC: position, rendition,
/// character-set map, and the origin-mode bit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub row: usize,
    pub col: usize,
    pub attrs: AttributeWord,
    pub pending_wrap: bool,
    pub origin_mode: bool,
    pub charset: CharsetState,
}

impl SavedCursor {
    pub fn capture(cursor: &Cursor, origin_mode: bool, charset: &CharsetState) -> Self {
        Self {
            row: cursor.row,
            col: cursor.col,
            attrs: cursor.attrs,
            pending_wrap: cursor.pending_wrap,
            origin_mode,
            charset: charset.clone(),
        }
    }

    pub fn restore(&self, cursor: &mut Cursor, origin_mode: &mut bool, charset: &mut CharsetState) {
        cursor.row = self.row;
        cursor.col = self.col;
        cursor.attrs = self.attrs;
        cursor.pending_wrap = self.pending_wrap;
        *origin_mode = self.origin_mode;
        *charset = self.charset.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;

    #[test]
    fn test_new_cursor_home_and_visible() {
        let c = Cursor::new();
        assert_eq!((c.row, c.col), (0, 0));
        assert!(c.visible);
        assert!(!c.pending_wrap);
    }

    #[test]
    fn test_reported_col_with_sentinel() {
        let mut c = Cursor::new();
        c.col = 79;
        c.pending_wrap = true;
        assert_eq!(c.reported_col(), 80);
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut cursor = Cursor::new();
        cursor.row = 5;
        cursor.col = 10;
        cursor.attrs.bold = true;
        let mut origin = true;
        let mut charset = CharsetState::default();
        charset.designate(1, Charset::DecSpecialGraphics);

        let saved = SavedCursor::capture(&cursor, origin, &charset);

        cursor.reset();
        origin = false;
        charset = CharsetState::default();

        saved.restore(&mut cursor, &mut origin, &mut charset);
        assert_eq!((cursor.row, cursor.col), (5, 10));
        assert!(cursor.attrs.bold);
        assert!(origin);
        assert_eq!(charset.slot(1), Charset::DecSpecialGraphics);
    }
}

//! One row of the screen or scrollback
//!
//! Every line owns exactly `ALLOCATED_COLUMNS` cells regardless of the
//! visible width, so narrowing or widening the screen inside that bound
//! never reallocates a row. Each line carries a monotonically increasing id
//! that is never reused within a screen's lifetime; iterators and event
//! ranges refer to lines by id so they survive scrolling.

use serde::{Deserialize, Serialize};

use crate::attr::{AttributeFlags, AttributeWord, LineAttr};
use crate::cell::Cell;
use crate::color::Color;

/// Fixed per-line cell allocation; the visible width never exceeds this.
pub const ALLOCATED_COLUMNS: usize = 256;

/// Identity of one allocated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub u64);

/// Hands out line ids for one screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineIdAllocator {
    next: u64,
}

impl LineIdAllocator {
    pub fn next_id(&mut self) -> LineId {
        let id = LineId(self.next);
        self.next += 1;
        id
    }
}

/// A row of cells plus per-line state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    id: LineId,
    cells: Vec<Cell>,
    /// Soft-wrap continuation of the previous line
    pub wrapped: bool,
    /// Double-size class applying to the whole line
    pub attr: LineAttr,
}

impl Line {
    pub fn new(id: LineId) -> Self {
        Self {
            id,
            cells: vec![Cell::blank(); ALLOCATED_COLUMNS],
            wrapped: false,
            attr: LineAttr::Single,
        }
    }

    /// A fresh line erased to the given background.
    pub fn erased(id: LineId, bg: Color) -> Self {
        Self {
            id,
            cells: vec![Cell::erased(bg); ALLOCATED_COLUMNS],
            wrapped: false,
            attr: LineAttr::Single,
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn cell(&self, col: usize) -> &Cell {
        &self.cells[col]
    }

    pub fn cell_mut(&mut self, col: usize) -> &mut Cell {
        &mut self.cells[col]
    }

    pub fn get(&self, col: usize) -> Option<&Cell> {
        self.cells.get(col)
    }

    /// Write one character, repairing any wide-character halves that the
    /// write would orphan. Writes a continuation cell for wide characters;
    /// the caller guarantees `col + width <= visible`.
    pub fn put_char(&mut self, col: usize, ch: char, attrs: AttributeWord, visible: usize) {
        let cell = Cell::with_char(ch, attrs);
        let width = usize::from(cell.width().max(1));
        for target in col..(col + width).min(visible) {
            self.repair_orphan_halves(target);
        }
        self.cells[col] = cell;
        if width == 2 && col + 1 < visible {
            self.cells[col + 1].make_continuation(attrs);
        }
    }

    /// If `col` holds half of a wide character, erase the other half.
    fn repair_orphan_halves(&mut self, col: usize) {
        if self.cells[col].is_continuation() && col > 0 && self.cells[col - 1].is_wide_lead() {
            let bg = self.cells[col - 1].attrs.bg;
            self.cells[col - 1].erase(bg);
        }
        if self.cells[col].is_wide_lead() && col + 1 < self.cells.len() {
            let bg = self.cells[col].attrs.bg;
            self.cells[col + 1].erase(bg);
        }
    }

    /// Erase every cell, clearing line-level state.
    pub fn clear(&mut self, bg: Color) {
        for cell in &mut self.cells {
            cell.erase(bg);
        }
        self.wrapped = false;
        self.attr = LineAttr::Single;
    }

    /// Erase from `col` to the end of the line.
    pub fn clear_from(&mut self, col: usize, bg: Color) {
        for cell in self.cells.iter_mut().skip(col) {
            cell.erase(bg);
        }
    }

    /// Erase from the start of the line through `col`.
    pub fn clear_to(&mut self, col: usize, bg: Color) {
        for cell in self.cells.iter_mut().take(col + 1) {
            cell.erase(bg);
        }
    }

    /// Erase `n` cells starting at `col` without shifting (ECH).
    pub fn erase_cells(&mut self, col: usize, n: usize, bg: Color) {
        let end = col.saturating_add(n).min(self.cells.len());
        for cell in &mut self.cells[col..end] {
            cell.erase(bg);
        }
    }

    /// Insert `n` blank cells at `col`, shifting toward the right margin
    /// (`visible`); cells pushed past the margin are discarded (ICH).
    pub fn insert_cells(&mut self, col: usize, n: usize, bg: Color, visible: usize) {
        if col >= visible {
            return;
        }
        let n = n.min(visible - col);
        self.cells[col..visible].rotate_right(n);
        for cell in &mut self.cells[col..col + n] {
            cell.erase(bg);
        }
    }

    /// Delete `n` cells at `col`, shifting the remainder left and exposing
    /// erased cells at the right margin (DCH).
    pub fn delete_cells(&mut self, col: usize, n: usize, bg: Color, visible: usize) {
        if col >= visible {
            return;
        }
        let n = n.min(visible - col);
        self.cells[col..visible].rotate_left(n);
        for cell in &mut self.cells[visible - n..visible] {
            cell.erase(bg);
        }
    }

    /// Apply attribute set/clear masks over `[start, end)` columns.
    pub fn apply_attributes(
        &mut self,
        start: usize,
        end: usize,
        set: AttributeFlags,
        clear: AttributeFlags,
    ) {
        let end = end.min(self.cells.len());
        for cell in &mut self.cells[start.min(end)..end] {
            cell.attrs.apply(set, clear);
        }
    }

    /// Columns in use: one past the last cell that differs from a fully
    /// default blank. Trailing erased-but-colored cells count as in use.
    pub fn occupied_columns(&self, visible: usize) -> usize {
        let limit = visible.min(self.cells.len());
        self.cells[..limit]
            .iter()
            .rposition(|c| c.ch() != ' ' || c.attrs != AttributeWord::default())
            .map_or(0, |i| i + 1)
    }

    /// Cells of the occupied prefix, used by reflow.
    pub fn occupied_cells(&self, visible: usize) -> &[Cell] {
        &self.cells[..self.occupied_columns(visible)]
    }

    /// The first `n` cells.
    pub fn cells_prefix(&self, n: usize) -> &[Cell] {
        &self.cells[..n.min(self.cells.len())]
    }

    /// Visible text with trailing blanks trimmed; continuation cells are
    /// skipped so wide characters appear once.
    pub fn text(&self, visible: usize) -> String {
        let mut out = String::new();
        for cell in self.cells.iter().take(visible.min(self.cells.len())) {
            if cell.is_continuation() {
                continue;
            }
            out.push(cell.ch());
        }
        out.truncate(out.trim_end_matches(' ').len());
        out
    }

    /// True when every visible cell is blank.
    pub fn is_blank(&self, visible: usize) -> bool {
        self.cells
            .iter()
            .take(visible.min(self.cells.len()))
            .all(Cell::is_blank)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}

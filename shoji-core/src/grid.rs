//! The main screen: a deque of exactly `rows` lines
//!
//! All vertical structure changes (scrolling, line insertion and deletion)
//! go through this type so that newly exposed rows always receive fresh
//! line ids and the erase rendition. Scroll regions are half-open row
//! ranges `top..bottom`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::line::{Line, LineId, LineIdAllocator};

/// The visible grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    lines: VecDeque<Line>,
}

impl Grid {
    pub fn new(rows: usize, ids: &mut LineIdAllocator) -> Self {
        let lines = (0..rows).map(|_| Line::new(ids.next_id())).collect();
        Self { lines }
    }

    pub fn rows(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, row: usize) -> &Line {
        &self.lines[row]
    }

    pub fn line_mut(&mut self, row: usize) -> &mut Line {
        &mut self.lines[row]
    }

    pub fn get_line(&self, row: usize) -> Option<&Line> {
        self.lines.get(row)
    }

    /// Row index of the line with the given id.
    pub fn row_of(&self, id: LineId) -> Option<usize> {
        self.lines.iter().position(|l| l.id() == id)
    }

    /// Erase every cell of every line in place; ids are kept.
    pub fn clear_all(&mut self, bg: Color) {
        for line in &mut self.lines {
            line.clear(bg);
        }
    }

    /// Erase from `(row, col)` to the end of the screen.
    pub fn clear_below(&mut self, row: usize, col: usize, bg: Color) {
        if row >= self.rows() {
            return;
        }
        self.lines[row].clear_from(col, bg);
        for line in self.lines.iter_mut().skip(row + 1) {
            line.clear(bg);
        }
    }

    /// Erase from the top of the screen through `(row, col)`.
    pub fn clear_above(&mut self, row: usize, col: usize, bg: Color) {
        if row >= self.rows() {
            return;
        }
        for line in self.lines.iter_mut().take(row) {
            line.clear(bg);
        }
        self.lines[row].clear_to(col, bg);
    }

    /// Scroll `region = top..bottom` up by `n`. Returns the lines that left
    /// the top of the region, oldest first, for the caller to route into
    /// the scrollback or drop.
    pub fn scroll_up_region(
        &mut self,
        top: usize,
        bottom: usize,
        n: usize,
        bg: Color,
        ids: &mut LineIdAllocator,
    ) -> Vec<Line> {
        if top >= bottom || bottom > self.rows() {
            return Vec::new();
        }
        let n = n.min(bottom - top);
        let mut removed = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(line) = self.lines.remove(top) {
                removed.push(line);
            }
            self.lines.insert(bottom - 1, Line::erased(ids.next_id(), bg));
        }
        removed
    }

    /// Scroll `region = top..bottom` down by `n`; lines leaving the bottom
    /// of the region are discarded.
    pub fn scroll_down_region(
        &mut self,
        top: usize,
        bottom: usize,
        n: usize,
        bg: Color,
        ids: &mut LineIdAllocator,
    ) {
        if top >= bottom || bottom > self.rows() {
            return;
        }
        let n = n.min(bottom - top);
        for _ in 0..n {
            self.lines.remove(bottom - 1);
            self.lines.insert(top, Line::erased(ids.next_id(), bg));
        }
    }

    /// Insert `n` blank lines at `row` (IL), pushing rows toward the bottom
    /// margin; rows pushed out of the region are discarded.
    pub fn insert_lines(
        &mut self,
        row: usize,
        n: usize,
        bottom: usize,
        bg: Color,
        ids: &mut LineIdAllocator,
    ) {
        if row >= bottom || bottom > self.rows() {
            return;
        }
        let n = n.min(bottom - row);
        for _ in 0..n {
            self.lines.remove(bottom - 1);
            self.lines.insert(row, Line::erased(ids.next_id(), bg));
        }
    }

    /// Delete `n` lines at `row` (DL), pulling rows up from the bottom
    /// margin and exposing blanks at the bottom of the region.
    pub fn delete_lines(
        &mut self,
        row: usize,
        n: usize,
        bottom: usize,
        bg: Color,
        ids: &mut LineIdAllocator,
    ) {
        if row >= bottom || bottom > self.rows() {
            return;
        }
        let n = n.min(bottom - row);
        for _ in 0..n {
            self.lines.remove(row);
            self.lines.insert(bottom - 1, Line::erased(ids.next_id(), bg));
        }
    }

    /// Remove and return the top line (used when shrinking rows).
    pub fn pop_top(&mut self) -> Option<Line> {
        self.lines.pop_front()
    }

    /// Remove and return the bottom line.
    pub fn pop_bottom(&mut self) -> Option<Line> {
        self.lines.pop_back()
    }

    /// Put a line back on top (used when growing rows from scrollback).
    pub fn push_top(&mut self, line: Line) {
        self.lines.push_front(line);
    }

    /// Append a line at the bottom.
    pub fn push_bottom(&mut self, line: Line) {
        self.lines.push_back(line);
    }

    /// Replace the whole row set (reflow).
    pub fn replace_lines(&mut self, lines: VecDeque<Line>) {
        self.lines = lines;
    }

    /// Take the whole row set, leaving the grid empty (reflow).
    pub fn take_lines(&mut self) -> VecDeque<Line> {
        std::mem::take(&mut self.lines)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Line> {
        self.lines.iter_mut()
    }
}

//! The terminal screen
//!
//! A `Screen` owns the visible grid, the alternate grid, the scrollback,
//! cursor and mode state, the listener bus, and the parser/emulator pair
//! that mutates all of it. Every public operation runs on the owner
//! thread; the only cross-screen state is the optional Distributed
//! scrollback budget.
//!
//! All buffer mutations funnel through a small set of primitives in this
//! file so that edit ranges are recorded for listeners and newly exposed
//! cells always take the current background.

use std::collections::HashMap;

use log::debug;

use shoji_parser::{Parser, TextEncoding};

use crate::attr::{AttributeFlags, AttributeWord, LineAttr};
use crate::cell::display_width;
use crate::charset::CharsetState;
use crate::cursor::{Cursor, SavedCursor};
use crate::emulator::{dumb_rendering, Emulator, EmulatorFamily};
use crate::error::{Error, Result};
use crate::event::{
    Change, ChangeListener, Event, ListenerBus, ListenerToken, RangeDescription, ScrollDescription,
    XtermColorDescription,
};
use crate::grid::Grid;
use crate::iterator::{LineRef, Region};
use crate::line::{Line, LineId, LineIdAllocator, ALLOCATED_COLUMNS};
use crate::modes::Modes;
use crate::palette::XtermPalette;
use crate::scrollback::{Scrollback, ScrollbackType};
use crate::snapshot::Snapshot;
use crate::talkback::{SessionSink, Talkback};

/// Default scrollback depth for `ScrollbackType::Fixed` configurations.
pub const DEFAULT_SCROLLBACK_LINES: usize = 10_000;

/// Tab stops start every eight columns.
const DEFAULT_TAB_WIDTH: usize = 8;

/// Malformed-sequence count at which `ExcessiveErrors` fires.
const EXCESSIVE_ERROR_THRESHOLD: u32 = 256;

/// Reset scope for [`Screen::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Reset only the character-set state, for recovering a screen left in
    /// the graphics set
    GraphicsCharacters,
    /// Full reset (RIS)
    All,
}

/// Creation-time configuration, consumed once by [`Screen::new`].
#[derive(Default)]
pub struct ScreenConfig {
    pub columns: usize,
    pub rows: usize,
    pub emulator: Emulator,
    pub scrollback: ScrollbackType,
    pub encoding: TextEncoding,
    pub save_lines_on_clear: bool,
    /// OSC 52 handling; denied unless explicitly enabled
    pub allow_clipboard_write: bool,
    /// Shared pool for `ScrollbackType::Distributed`
    pub scrollback_budget: Option<std::sync::Arc<crate::scrollback::ScrollbackBudget>>,
}

impl ScreenConfig {
    /// 80x24 xterm-256color with a fixed scrollback.
    pub fn standard() -> Self {
        Self {
            columns: 80,
            rows: 24,
            emulator: Emulator::XTerm256Color,
            scrollback: ScrollbackType::Fixed(DEFAULT_SCROLLBACK_LINES),
            encoding: TextEncoding::Utf8,
            save_lines_on_clear: false,
            allow_clipboard_write: false,
            scrollback_budget: None,
        }
    }
}

/// Edits accumulated during one `process_bytes` call, flushed as one
/// bounding range per region.
#[derive(Debug, Default)]
struct PendingEvents {
    /// min row, max row, min col, max col on the active grid
    edit: Option<(usize, usize, usize, usize)>,
    /// lines pushed into the scrollback
    scrollback_pushed: usize,
    scroll_delta: i32,
    cursor_moved: bool,
    cursor_visibility: Option<bool>,
}

/// One terminal screen: buffer plus emulator.
pub struct Screen {
    pub(crate) emulator: Emulator,
    encoding: TextEncoding,
    pub(crate) allow_clipboard_write: bool,

    visible_cols: usize,
    rows: usize,
    pub(crate) primary: Grid,
    pub(crate) alternate: Grid,
    pub(crate) using_alternate: bool,
    pub(crate) scrollback: Scrollback,

    pub(crate) cursor: Cursor,
    saved_primary: SavedCursor,
    saved_alternate: SavedCursor,
    pub(crate) modes: Modes,
    /// Scroll region rows `top..bottom`, always inside `0..rows`
    region: (usize, usize),
    tab_stops: Vec<bool>,
    pub(crate) charset: CharsetState,

    pub(crate) palette: XtermPalette,
    leds: [bool; 4],
    window_title: String,
    icon_title: String,
    minimize_requested: bool,
    bell_enabled: bool,

    listeners: ListenerBus,
    pub(crate) talkback: Talkback,
    parser: Parser,
    ids: LineIdAllocator,

    pub(crate) error_count: u32,
    excessive_fired: bool,
    pub(crate) udk: HashMap<u16, Vec<u8>>,
    clipboard_write: Option<String>,

    pending: PendingEvents,
    pending_error: Option<Error>,
}

impl Screen {
    /// Create a screen from a configuration context. Dimensions must be
    /// nonzero; columns are clamped to [`ALLOCATED_COLUMNS`].
    pub fn new(config: ScreenConfig) -> Result<Self> {
        if config.columns == 0 || config.rows == 0 {
            return Err(Error::ParameterError);
        }
        let cols = config.columns.min(ALLOCATED_COLUMNS);
        let rows = config.rows;
        let mut ids = LineIdAllocator::default();
        let primary = Grid::new(rows, &mut ids);
        let alternate = Grid::new(rows, &mut ids);
        let mut modes = Modes::new();
        modes.save_lines_on_clear = config.save_lines_on_clear;

        Ok(Self {
            emulator: config.emulator,
            encoding: config.encoding,
            allow_clipboard_write: config.allow_clipboard_write,
            visible_cols: cols,
            rows,
            primary,
            alternate,
            using_alternate: false,
            scrollback: Scrollback::new(config.scrollback, config.scrollback_budget),
            cursor: Cursor::new(),
            saved_primary: SavedCursor::default(),
            saved_alternate: SavedCursor::default(),
            modes,
            region: (0, rows),
            tab_stops: default_tab_stops(),
            charset: CharsetState::new(),
            palette: XtermPalette::new(),
            leds: [false; 4],
            window_title: String::new(),
            icon_title: String::new(),
            minimize_requested: false,
            bell_enabled: true,
            listeners: ListenerBus::new(),
            talkback: Talkback::new(),
            parser: Parser::with_encoding(config.encoding),
            ids,
            error_count: 0,
            excessive_fired: false,
            udk: HashMap::new(),
            clipboard_write: None,
            pending: PendingEvents::default(),
            pending_error: None,
        })
    }

    // ---- geometry and simple queries -------------------------------------

    pub fn columns(&self) -> usize {
        self.visible_cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Rows currently held in the scrollback.
    pub fn scrollback_rows(&self) -> usize {
        self.scrollback.len()
    }

    /// The fixed per-line allocation shared by every screen.
    pub fn allocated_columns() -> usize {
        ALLOCATED_COLUMNS
    }

    pub fn emulator(&self) -> Emulator {
        self.emulator
    }

    pub fn text_encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn modes(&self) -> &Modes {
        &self.modes
    }

    /// The scroll region as a half-open row range.
    pub fn scroll_region(&self) -> (usize, usize) {
        self.region
    }

    /// Cursor position; the column reports `columns()` while the wrap
    /// sentinel is pending.
    pub fn cursor_location(&self) -> (usize, usize) {
        (self.cursor.row, self.cursor.reported_col())
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor.visible && self.modes.cursor_visible
    }

    pub fn cursor_attributes(&self) -> AttributeWord {
        self.cursor.attrs
    }

    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    /// True after the application requested minimization (XTerm CSI 2 t).
    pub fn window_minimize_requested(&self) -> bool {
        self.minimize_requested
    }

    pub fn led(&self, number: u8) -> Result<bool> {
        match number {
            1..=4 => Ok(self.leds[usize::from(number - 1)]),
            _ => Err(Error::ParameterError),
        }
    }

    pub fn bell_enabled(&self) -> bool {
        self.bell_enabled
    }

    pub fn line_feed_new_line_mode(&self) -> bool {
        self.modes.line_feed_new_line
    }

    pub fn line_wrap_enabled(&self) -> bool {
        self.modes.autowrap
    }

    pub fn reverse_video_enabled(&self) -> bool {
        self.modes.reverse_video
    }

    pub fn save_lines_on_clear(&self) -> bool {
        self.modes.save_lines_on_clear
    }

    pub fn palette(&self) -> &XtermPalette {
        &self.palette
    }

    /// Protocol anomalies absorbed so far.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// The payload of the last permitted OSC 52 write, if any.
    pub fn take_clipboard_write(&mut self) -> Option<String> {
        self.clipboard_write.take()
    }

    // ---- configuration mutators ------------------------------------------

    pub fn set_bell_enabled(&mut self, enabled: bool) {
        if self.bell_enabled != enabled {
            self.bell_enabled = enabled;
            self.fire(Event::AudioState { enabled });
        }
    }

    pub fn set_line_wrap_enabled(&mut self, enabled: bool) {
        self.modes.autowrap = enabled;
        if !enabled {
            self.cursor.pending_wrap = false;
        }
    }

    pub fn set_save_lines_on_clear(&mut self, enabled: bool) {
        self.modes.save_lines_on_clear = enabled;
    }

    pub fn set_led(&mut self, number: u8, on: bool) -> Result<()> {
        match number {
            1..=4 => {
                self.leds[usize::from(number - 1)] = on;
                self.fire(Event::NewLedState { leds: self.leds });
                Ok(())
            }
            _ => Err(Error::ParameterError),
        }
    }

    /// Switch emulators in place; buffer contents are untouched.
    pub fn set_emulator(&mut self, emulator: Emulator) {
        self.emulator = emulator;
        self.parser.reset();
    }

    /// Install or remove the session that receives replies.
    pub fn set_listening_session(&mut self, session: Option<Box<dyn SessionSink>>) {
        self.talkback.set_session(session);
    }

    // ---- listener registration -------------------------------------------

    pub fn start_monitoring(
        &mut self,
        change: Change,
        listener: Box<dyn ChangeListener>,
    ) -> ListenerToken {
        self.listeners.subscribe(change, listener)
    }

    /// True when the token named a live registration.
    pub fn stop_monitoring(&mut self, token: ListenerToken) -> bool {
        self.listeners.unsubscribe(token)
    }

    // ---- input -----------------------------------------------------------

    /// Feed raw session bytes through the emulator. The whole slice is
    /// always consumed; the error, if any, reports the first reply that
    /// had to be dropped or allocation that failed along the way.
    pub fn process_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        self.pending_error = None;
        if self.emulator.family() == EmulatorFamily::Dumb {
            self.process_dumb(bytes);
        } else {
            let mut parser = std::mem::take(&mut self.parser);
            parser.parse(bytes, |action| self.apply_action(action));
            let dropped = parser.take_dropped();
            self.parser = parser;
            for _ in 0..dropped {
                self.note_error();
            }
        }
        self.flush_events();
        match self.pending_error.take() {
            Some(error) => Err(error),
            None => Ok(bytes.len()),
        }
    }

    /// Like [`Screen::process_bytes`], stopping at the first NUL.
    pub fn process_cstring(&mut self, bytes: &[u8]) -> Result<usize> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.process_bytes(&bytes[..end])
    }

    fn process_dumb(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            for ch in dumb_rendering(byte).chars() {
                self.print_char_raw(ch);
            }
        }
    }

    // ---- line references -------------------------------------------------

    /// Reference to a visible row, 0 = top.
    pub fn main_screen_line(&self, row: usize) -> Result<LineRef> {
        let line = self.grid().get_line(row).ok_or(Error::ParameterError)?;
        Ok(LineRef::new(Region::MainScreen, line.id(), row))
    }

    /// Reference to a saved row, 0 = newest.
    pub fn scrollback_line(&self, newest_index: usize) -> Result<LineRef> {
        let line = self
            .scrollback
            .line(newest_index)
            .ok_or(Error::ParameterError)?;
        Ok(LineRef::new(Region::Scrollback, line.id(), newest_index))
    }

    /// Reference to the line with a known id, wherever it now lives.
    pub fn line_for_id(&self, id: LineId) -> Result<LineRef> {
        if let Some(row) = self.grid().row_of(id) {
            return Ok(LineRef::new(Region::MainScreen, id, row));
        }
        if let Some(pos) = self.scrollback.position_of(id) {
            return Ok(LineRef::new(Region::Scrollback, id, pos));
        }
        Err(Error::InvalidId)
    }

    /// Move a reference forward (positive, toward the bottom of the main
    /// screen) or backward (negative, toward the oldest scrollback line).
    /// The reference is unchanged when the walk would leave the buffers.
    pub fn advance_line(&self, line_ref: &mut LineRef, delta: isize) -> Result<()> {
        let (region, index) = self.resolve_ref(line_ref)?;
        let sb_len = self.scrollback.len();
        let global = match region {
            Region::Scrollback => sb_len as isize - 1 - index as isize,
            Region::MainScreen => sb_len as isize + index as isize,
        };
        let target = global + delta;
        if target < 0 || target >= (sb_len + self.rows) as isize {
            return Err(Error::IteratorCannotAdvance);
        }
        let target = target as usize;
        *line_ref = if target < sb_len {
            let pos = sb_len - 1 - target;
            LineRef::new(
                Region::Scrollback,
                self.scrollback.line(pos).expect("in range").id(),
                pos,
            )
        } else {
            let row = target - sb_len;
            LineRef::new(Region::MainScreen, self.grid().line(row).id(), row)
        };
        Ok(())
    }

    /// Re-locate a reference by id, tolerating any scrolling since it was
    /// created. The hint makes the common case O(1).
    pub(crate) fn resolve_ref(&self, line_ref: &LineRef) -> Result<(Region, usize)> {
        match line_ref.region {
            Region::MainScreen => {
                if let Some(line) = self.grid().get_line(line_ref.hint) {
                    if line.id() == line_ref.id {
                        return Ok((Region::MainScreen, line_ref.hint));
                    }
                }
            }
            Region::Scrollback => {
                if let Some(line) = self.scrollback.line(line_ref.hint) {
                    if line.id() == line_ref.id {
                        return Ok((Region::Scrollback, line_ref.hint));
                    }
                }
            }
        }
        if let Some(row) = self.grid().row_of(line_ref.id) {
            return Ok((Region::MainScreen, row));
        }
        if let Some(pos) = self.scrollback.position_of(line_ref.id) {
            return Ok((Region::Scrollback, pos));
        }
        Err(Error::InvalidIterator)
    }

    pub(crate) fn line_at(&self, region: Region, index: usize) -> &Line {
        match region {
            Region::MainScreen => self.grid().line(index),
            Region::Scrollback => self.scrollback.line(index).expect("resolved index"),
        }
    }

    fn line_at_mut(&mut self, region: Region, index: usize) -> &mut Line {
        match region {
            Region::MainScreen => {
                if self.using_alternate {
                    self.alternate.line_mut(index)
                } else {
                    self.primary.line_mut(index)
                }
            }
            Region::Scrollback => self.scrollback.line_mut(index).expect("resolved index"),
        }
    }

    // ---- row text and runs -----------------------------------------------

    /// The visible text of a row, trailing blanks trimmed.
    pub fn line_text(&self, line_ref: &LineRef) -> Result<String> {
        let (region, index) = self.resolve_ref(line_ref)?;
        Ok(self.line_at(region, index).text(self.visible_cols))
    }

    /// Iterate contiguous runs of cells on one row sharing an identical
    /// attribute word. Runs inside the occupied part of the row pass their
    /// text; the trailing blank area passes `None` with its length.
    pub fn for_each_like_attribute_run<F>(&self, line_ref: &LineRef, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<&str>, usize, usize, &AttributeWord),
    {
        let (region, index) = self.resolve_ref(line_ref)?;
        let line = self.line_at(region, index);
        let occupied = line.occupied_columns(self.visible_cols);

        let mut run_start = 0usize;
        let mut run_text = String::new();
        let mut run_attrs: Option<AttributeWord> = None;
        let mut col = 0usize;
        while col < occupied {
            let cell = line.cell(col);
            let span = usize::from(cell.width().max(1));
            match run_attrs {
                Some(attrs) if attrs == cell.attrs => {}
                Some(attrs) => {
                    callback(Some(&run_text), run_start, col - run_start, &attrs);
                    run_start = col;
                    run_text.clear();
                }
                None => {}
            }
            run_attrs = Some(cell.attrs);
            if !cell.is_continuation() {
                run_text.push(cell.ch());
            }
            col += span;
        }
        if let Some(attrs) = run_attrs {
            callback(Some(&run_text), run_start, occupied - run_start, &attrs);
        }
        if occupied < self.visible_cols {
            callback(
                None,
                occupied,
                self.visible_cols - occupied,
                &AttributeWord::default(),
            );
        }
        Ok(())
    }

    /// The line-global attribute (double-size class) of a row.
    pub fn line_global_attributes(&self, line_ref: &LineRef) -> Result<LineAttr> {
        let (region, index) = self.resolve_ref(line_ref)?;
        Ok(self.line_at(region, index).attr)
    }

    // ---- attribute mutation (find highlighting) --------------------------

    /// Set and clear attribute flags across one whole row.
    pub fn change_line_attributes(
        &mut self,
        line_ref: &LineRef,
        set: AttributeFlags,
        clear: AttributeFlags,
    ) -> Result<()> {
        let cols = self.visible_cols;
        self.change_line_range_attributes(line_ref, 0, Some(cols), set, clear)
    }

    /// Set and clear attribute flags over `[start, end)` columns of a row;
    /// `None` means through the last column.
    pub fn change_line_range_attributes(
        &mut self,
        line_ref: &LineRef,
        start: usize,
        end: Option<usize>,
        set: AttributeFlags,
        clear: AttributeFlags,
    ) -> Result<()> {
        let (region, index) = self.resolve_ref(line_ref)?;
        let end = end.unwrap_or(self.visible_cols).min(self.visible_cols);
        if start > end {
            return Err(Error::ParameterError);
        }
        let line = self.line_at_mut(region, index);
        line.apply_attributes(start, end, set, clear);
        let id = line.id();
        self.fire(Event::TextEdited(RangeDescription {
            region,
            first_row: id,
            last_row: id,
            first_column: start,
            last_column: end.saturating_sub(1),
            rectangular: false,
        }));
        Ok(())
    }

    /// Set and clear attribute flags over a multi-row range; rectangular
    /// constrains every row to the column span.
    pub fn change_range_attributes(
        &mut self,
        start_ref: &LineRef,
        row_count: usize,
        start_column: usize,
        past_end_column: usize,
        rectangular: bool,
        set: AttributeFlags,
        clear: AttributeFlags,
    ) -> Result<()> {
        if row_count == 0 {
            return Ok(());
        }
        let mut cursor_ref = *start_ref;
        for row_index in 0..row_count {
            let (first, last) = if rectangular {
                (start_column, past_end_column)
            } else if row_index == 0 {
                (start_column, self.visible_cols)
            } else if row_index + 1 == row_count {
                (0, past_end_column)
            } else {
                (0, self.visible_cols)
            };
            self.change_line_range_attributes(&cursor_ref, first, Some(last), set, clear)?;
            if row_index + 1 < row_count {
                match self.advance_line(&mut cursor_ref, 1) {
                    Ok(()) => {}
                    Err(Error::IteratorCannotAdvance) => break,
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    // ---- scrollback management -------------------------------------------

    /// Destroy every saved line, firing `TextRemoved` first.
    pub fn delete_all_saved_lines(&mut self) {
        if self.scrollback.is_empty() {
            return;
        }
        let newest = self.scrollback.line(0).expect("nonempty").id();
        let oldest = self
            .scrollback
            .line(self.scrollback.len() - 1)
            .expect("nonempty")
            .id();
        self.fire(Event::TextRemoved(RangeDescription {
            region: Region::Scrollback,
            first_row: oldest,
            last_row: newest,
            first_column: 0,
            last_column: self.visible_cols.saturating_sub(1),
            rectangular: false,
        }));
        self.scrollback.clear();
        self.fire(Event::ScrollActivity(ScrollDescription { row_delta: 0 }));
    }

    // ---- reset -----------------------------------------------------------

    /// Reset the screen. `GraphicsCharacters` only restores the character
    /// sets; `All` is a full RIS.
    pub fn reset(&mut self, scope: ResetScope) {
        match scope {
            ResetScope::GraphicsCharacters => {
                self.charset.reset();
            }
            ResetScope::All => {
                self.full_reset();
            }
        }
        self.fire(Event::Reset);
        self.flush_events();
    }

    pub(crate) fn full_reset(&mut self) {
        self.using_alternate = false;
        self.primary.clear_all(crate::color::Color::Default);
        self.alternate.clear_all(crate::color::Color::Default);
        self.cursor.reset();
        self.saved_primary = SavedCursor::default();
        self.saved_alternate = SavedCursor::default();
        self.modes.reset();
        self.region = (0, self.rows);
        self.tab_stops = default_tab_stops();
        self.charset.reset();
        self.palette.reset_all();
        self.leds = [false; 4];
        self.parser.reset();
        self.udk.clear();
        self.note_full_screen_edit();
    }

    /// DECSTR: a gentler reset that keeps the buffers.
    pub(crate) fn soft_reset(&mut self) {
        self.modes.reset();
        self.region = (0, self.rows);
        self.cursor.attrs = AttributeWord::default();
        self.cursor.pending_wrap = false;
        self.cursor.visible = true;
        self.charset.reset();
    }

    // ---- resize ----------------------------------------------------------

    /// Change the visible dimensions. Width changes reflow soft-wrapped
    /// paragraphs; height changes exchange rows with the scrollback.
    pub fn set_visible_dimensions(&mut self, columns: usize, rows: usize) -> Result<()> {
        if columns == 0 || rows == 0 {
            return Err(Error::ParameterError);
        }
        let columns = columns.min(ALLOCATED_COLUMNS);
        if columns == self.visible_cols && rows == self.rows {
            return Ok(());
        }

        if columns != self.visible_cols {
            let old = self.visible_cols;
            self.visible_cols = columns;
            self.reflow_width(old);
        }

        if rows != self.rows {
            self.resize_rows(rows);
            self.rows = rows;
        }

        self.region = (0, self.rows);
        self.cursor.row = self.cursor.row.min(self.rows - 1);
        self.cursor.col = self.cursor.col.min(self.visible_cols - 1);
        self.cursor.pending_wrap = false;
        self.note_full_screen_edit();
        self.fire(Event::ScreenSize {
            columns: self.visible_cols,
            rows: self.rows,
        });
        self.flush_events();
        Ok(())
    }

    /// Reflow the primary screen and scrollback to the current width. The
    /// unit of reflow is the logical paragraph: a line plus every
    /// following line flagged as its continuation. Untouched single-line
    /// paragraphs keep their line ids.
    fn reflow_width(&mut self, old_cols: usize) {
        let new_cols = self.visible_cols;
        let grid_rows = self.primary.rows();
        let bg = crate::color::Color::Default;

        let mut all: Vec<Line> = self.scrollback.take_lines_oldest_first();
        all.extend(self.primary.take_lines());

        let mut rebuilt: Vec<Line> = Vec::with_capacity(all.len());
        let mut start = 0;
        while start < all.len() {
            let mut end = start + 1;
            while end < all.len() && all[end].wrapped {
                end += 1;
            }
            let single = end - start == 1;
            if single && all[start].occupied_columns(ALLOCATED_COLUMNS) <= new_cols {
                rebuilt.push(all[start].clone());
            } else {
                self.rewrap_paragraph(&all[start..end], old_cols, new_cols, &mut rebuilt);
            }
            start = end;
        }

        // Last rows stay visible; everything older returns to scrollback.
        let visible_count = grid_rows.min(rebuilt.len());
        let mut history = rebuilt;
        let visible: Vec<Line> = history.split_off(history.len() - visible_count);
        let mut grid_lines: std::collections::VecDeque<Line> = visible.into();
        while grid_lines.len() < grid_rows {
            grid_lines.push_back(Line::erased(self.ids.next_id(), bg));
        }
        if let Some(front) = grid_lines.front_mut() {
            if history.is_empty() {
                front.wrapped = false;
            }
        }
        self.primary.replace_lines(grid_lines);

        let mut saved: std::collections::VecDeque<Line> = history.into_iter().rev().collect();
        if let ScrollbackType::Fixed(capacity) = self.scrollback.policy() {
            while saved.len() > capacity {
                saved.pop_back();
            }
        }
        if self.scrollback.policy() == ScrollbackType::Disabled {
            saved.clear();
        }
        self.scrollback.replace_lines(saved);
    }

    fn rewrap_paragraph(
        &mut self,
        paragraph: &[Line],
        old_cols: usize,
        new_cols: usize,
        out: &mut Vec<Line>,
    ) {
        // Logical content: every cell of interior rows, the occupied
        // prefix of the final row. Continuation halves are re-created at
        // placement time.
        let mut content: Vec<(char, AttributeWord)> = Vec::new();
        for (index, line) in paragraph.iter().enumerate() {
            let limit = if index + 1 < paragraph.len() {
                old_cols.max(line.occupied_columns(ALLOCATED_COLUMNS))
            } else {
                line.occupied_columns(ALLOCATED_COLUMNS)
            };
            for cell in line.cells_prefix(limit) {
                if !cell.is_continuation() {
                    content.push((cell.ch(), cell.attrs));
                }
            }
        }
        while content
            .last()
            .is_some_and(|(ch, attrs)| *ch == ' ' && *attrs == AttributeWord::default())
        {
            content.pop();
        }

        let line_attr = paragraph[0].attr;
        let mut current = Line::new(self.ids.next_id());
        current.attr = line_attr;
        current.wrapped = paragraph[0].wrapped;
        let mut col = 0usize;
        for (ch, attrs) in content {
            let width = usize::from(display_width(ch));
            if col + width > new_cols {
                let mut next = Line::new(self.ids.next_id());
                next.attr = line_attr;
                next.wrapped = true;
                out.push(std::mem::replace(&mut current, next));
                col = 0;
            }
            current.put_char(col, ch, attrs, new_cols);
            col += width;
        }
        out.push(current);
    }

    fn resize_rows(&mut self, new_rows: usize) {
        let bg = self.cursor.attrs.bg;
        // Alternate screen: grow and shrink at the bottom only.
        while self.alternate.rows() > new_rows {
            self.alternate.pop_bottom();
        }
        while self.alternate.rows() < new_rows {
            self.alternate.push_bottom(Line::erased(self.ids.next_id(), bg));
        }

        while self.primary.rows() > new_rows {
            let last = self.primary.rows() - 1;
            if self.cursor.row < last && self.primary.line(last).is_blank(self.visible_cols) {
                self.primary.pop_bottom();
            } else if let Some(line) = self.primary.pop_top() {
                match self.scrollback.push(line) {
                    Ok(_) => {
                        self.pending.scrollback_pushed += 1;
                        self.pending.scroll_delta -= 1;
                    }
                    Err(error) => self.note_memory_error(error),
                }
                self.cursor.row = self.cursor.row.saturating_sub(1);
            }
        }
        while self.primary.rows() < new_rows {
            if let Some(line) = self.scrollback.pop_newest() {
                self.primary.push_top(line);
                self.cursor.row = (self.cursor.row + 1).min(new_rows - 1);
                self.pending.scroll_delta += 1;
            } else {
                self.primary.push_bottom(Line::erased(self.ids.next_id(), bg));
            }
        }
    }

    // ---- search and copy -------------------------------------------------

    /// Find every occurrence of `query`, main screen first, then the
    /// scrollback newest to oldest (reversed by the backwards flag).
    pub fn search(
        &self,
        query: &str,
        flags: crate::search::SearchFlags,
    ) -> Result<Vec<RangeDescription>> {
        crate::search::search(self, query, flags, None)
    }

    /// Like [`Screen::search`], checking `stop` between paragraphs so a
    /// long scrollback scan can be abandoned.
    pub fn search_with_stop(
        &self,
        query: &str,
        flags: crate::search::SearchFlags,
        stop: &std::sync::atomic::AtomicBool,
    ) -> Result<Vec<RangeDescription>> {
        crate::search::search(self, query, flags, Some(stop))
    }

    /// Extract text from `row_count` rows starting at `start`.
    pub fn copy_range(
        &self,
        start: &LineRef,
        row_count: usize,
        start_column: usize,
        end_column: usize,
        options: &crate::copy::CopyOptions,
    ) -> Result<String> {
        crate::copy::copy_range(self, start, row_count, start_column, end_column, options)
    }

    // ---- snapshot --------------------------------------------------------

    /// Serializable capture of the current state.
    pub fn snapshot(&self, include_scrollback: bool) -> Snapshot {
        Snapshot::capture(self, include_scrollback)
    }

    /// Human-readable dump of the screen and scrollback for debugging.
    pub fn detailed_dump(&self) -> String {
        crate::snapshot::detailed_dump(self)
    }

    // ---- internal accessors shared with the emulator ---------------------

    pub(crate) fn grid(&self) -> &Grid {
        if self.using_alternate {
            &self.alternate
        } else {
            &self.primary
        }
    }

    fn grid_and_ids(&mut self) -> (&mut Grid, &mut LineIdAllocator) {
        let grid = if self.using_alternate {
            &mut self.alternate
        } else {
            &mut self.primary
        };
        (grid, &mut self.ids)
    }

    pub(crate) fn visible_columns(&self) -> usize {
        self.visible_cols
    }

    // ---- event plumbing --------------------------------------------------

    /// Fire a non-coalesced event immediately.
    pub(crate) fn fire(&mut self, event: Event) {
        self.listeners.fire(&event);
    }

    /// Record a cell-range edit on the active grid for coalescing.
    pub(crate) fn note_edit(&mut self, row: usize, first_col: usize, last_col: usize) {
        let entry = self.pending.edit.get_or_insert((row, row, first_col, last_col));
        entry.0 = entry.0.min(row);
        entry.1 = entry.1.max(row);
        entry.2 = entry.2.min(first_col);
        entry.3 = entry.3.max(last_col);
    }

    pub(crate) fn note_row_edit(&mut self, first_row: usize, last_row: usize) {
        self.note_edit(first_row, 0, self.visible_cols.saturating_sub(1));
        self.note_edit(last_row, 0, self.visible_cols.saturating_sub(1));
    }

    pub(crate) fn note_full_screen_edit(&mut self) {
        let last = self.rows - 1;
        self.note_row_edit(0, last);
    }

    pub(crate) fn note_cursor_moved(&mut self) {
        self.pending.cursor_moved = true;
    }

    pub(crate) fn note_cursor_visibility(&mut self, visible: bool) {
        self.pending.cursor_visibility = Some(visible);
    }

    pub(crate) fn note_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
        if self.error_count >= EXCESSIVE_ERROR_THRESHOLD && !self.excessive_fired {
            self.excessive_fired = true;
            self.fire(Event::ExcessiveErrors);
        }
    }

    pub(crate) fn note_memory_error(&mut self, error: Error) {
        debug!("scrollback allocation failed; line dropped");
        self.pending_error.get_or_insert(error);
    }

    /// Send reply bytes to the session, degrading to an error report when
    /// nothing is listening.
    pub(crate) fn send_reply(&mut self, bytes: &[u8]) {
        if let Err(error) = self.talkback.reply(bytes) {
            self.note_error();
            self.pending_error.get_or_insert(error);
        }
    }

    /// Deliver everything accumulated since the last flush.
    fn flush_events(&mut self) {
        if let Some((first_row, last_row, first_col, last_col)) = self.pending.edit.take() {
            let grid = self.grid();
            let last_row = last_row.min(grid.rows() - 1);
            let first_row = first_row.min(last_row);
            let event = Event::TextEdited(RangeDescription {
                region: Region::MainScreen,
                first_row: grid.line(first_row).id(),
                last_row: grid.line(last_row).id(),
                first_column: first_col,
                last_column: last_col.min(self.visible_cols.saturating_sub(1)),
                rectangular: false,
            });
            self.fire(event);
        }
        let pushed = std::mem::take(&mut self.pending.scrollback_pushed);
        if pushed > 0 && !self.scrollback.is_empty() {
            let newest = self.scrollback.line(0).expect("nonempty").id();
            let oldest_new = self
                .scrollback
                .line((pushed - 1).min(self.scrollback.len() - 1))
                .expect("in range")
                .id();
            let event = Event::TextEdited(RangeDescription {
                region: Region::Scrollback,
                first_row: oldest_new,
                last_row: newest,
                first_column: 0,
                last_column: self.visible_cols.saturating_sub(1),
                rectangular: false,
            });
            self.fire(event);
        }
        let delta = std::mem::take(&mut self.pending.scroll_delta);
        if delta != 0 {
            self.fire(Event::ScrollActivity(ScrollDescription { row_delta: delta }));
        }
        if let Some(visible) = self.pending.cursor_visibility.take() {
            self.fire(Event::CursorState { visible });
        }
        if std::mem::take(&mut self.pending.cursor_moved) {
            let (row, column) = self.cursor_location();
            self.fire(Event::CursorLocation { row, column });
        }
    }

    // ---- write primitives ------------------------------------------------

    /// Print one character through the charset map at the cursor.
    pub(crate) fn print_char(&mut self, raw: char) {
        let ch = self.charset.translate_next(raw);
        self.print_char_raw(ch);
    }

    /// Print a character that has already been translated.
    pub(crate) fn print_char_raw(&mut self, ch: char) {
        let cols = self.visible_cols;
        let width = usize::from(display_width(ch));

        if self.cursor.pending_wrap {
            if self.modes.autowrap {
                self.wrap_to_next_line();
            } else {
                self.cursor.pending_wrap = false;
            }
        }

        // A wide character never straddles the right margin.
        if width == 2 && self.cursor.col + 2 > cols {
            if self.modes.autowrap {
                self.wrap_to_next_line();
            } else {
                self.cursor.col = cols.saturating_sub(2);
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let attrs = self.cursor.attrs;

        if self.modes.insert {
            let bg = attrs.bg;
            let (grid, _) = self.grid_and_ids();
            grid.line_mut(row).insert_cells(col, width, bg, cols);
        }

        {
            let (grid, _) = self.grid_and_ids();
            grid.line_mut(row).put_char(col, ch, attrs, cols);
        }
        self.note_edit(row, col, (col + width - 1).min(cols - 1));

        let next = col + width;
        if next >= cols {
            self.cursor.col = cols - 1;
            if self.modes.autowrap {
                self.cursor.pending_wrap = true;
            }
        } else {
            self.cursor.col = next;
        }
        self.note_cursor_moved();
    }

    /// Resolve a pending wrap: move to column 0 of the next row, scrolling
    /// at the bottom margin, and flag the new row as a continuation.
    fn wrap_to_next_line(&mut self) {
        self.cursor.pending_wrap = false;
        self.cursor.col = 0;
        let (_, bottom) = self.region;
        if self.cursor.row + 1 >= bottom {
            self.scroll_up_in_region(1);
        } else {
            self.cursor.row += 1;
        }
        let row = self.cursor.row;
        let (grid, _) = self.grid_and_ids();
        grid.line_mut(row).wrapped = true;
    }

    pub(crate) fn bell(&mut self) {
        if self.bell_enabled {
            self.fire(Event::AudioEvent);
        }
    }

    pub(crate) fn backspace(&mut self) {
        if self.cursor.pending_wrap {
            self.cursor.pending_wrap = false;
        } else if self.cursor.col > 0 {
            self.cursor.col -= 1;
        }
        self.note_cursor_moved();
    }

    pub(crate) fn tab(&mut self) {
        let cols = self.visible_cols;
        let mut col = self.cursor.col + 1;
        while col < cols && !self.tab_stops.get(col).copied().unwrap_or(false) {
            col += 1;
        }
        self.cursor.col = col.min(cols - 1);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn carriage_return(&mut self) {
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    /// IND: down one row, scrolling at the bottom margin.
    pub(crate) fn index(&mut self) {
        let (_, bottom) = self.region;
        if self.cursor.row + 1 >= bottom {
            self.scroll_up_in_region(1);
        } else {
            self.cursor.row += 1;
        }
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    /// LF (also VT and FF); in new-line mode it implies a carriage return.
    pub(crate) fn linefeed(&mut self) {
        self.index();
        if self.modes.line_feed_new_line {
            self.cursor.col = 0;
        }
    }

    /// RI: up one row, scrolling down at the top margin.
    pub(crate) fn reverse_index(&mut self) {
        let (top, _) = self.region;
        if self.cursor.row <= top {
            self.scroll_down_in_region(1);
        } else {
            self.cursor.row -= 1;
        }
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    /// NEL: to column 0 of the next row.
    pub(crate) fn next_line(&mut self) {
        self.linefeed();
        self.cursor.col = 0;
        self.note_cursor_moved();
    }

    /// Scroll the region up; full-screen scrolls on the primary screen
    /// feed the scrollback.
    pub(crate) fn scroll_up_in_region(&mut self, count: usize) {
        let (top, bottom) = self.region;
        let bg = self.cursor.attrs.bg;
        let full_screen = top == 0 && bottom == self.rows;
        let removed = {
            let (grid, ids) = self.grid_and_ids();
            grid.scroll_up_region(top, bottom, count, bg, ids)
        };
        let scrolled = removed.len() as i32;
        if full_screen && !self.using_alternate {
            // The departing lines stay adjacent in the scrollback, so any
            // soft-wrap continuity across the boundary is preserved.
            for line in removed {
                match self.scrollback.push(line) {
                    Ok(_) => self.pending.scrollback_pushed += 1,
                    Err(error) => self.note_memory_error(error),
                }
            }
        } else if scrolled > 0 && top < bottom {
            // The removed predecessors are gone; the new top of the region
            // no longer continues anything.
            let (grid, _) = self.grid_and_ids();
            grid.line_mut(top).wrapped = false;
        }
        self.pending.scroll_delta -= scrolled;
        self.note_row_edit(top, bottom - 1);
    }

    /// Scroll the region down; lines leaving the bottom are discarded.
    pub(crate) fn scroll_down_in_region(&mut self, count: usize) {
        let (top, bottom) = self.region;
        let bg = self.cursor.attrs.bg;
        {
            let (grid, ids) = self.grid_and_ids();
            grid.scroll_down_region(top, bottom, count, bg, ids);
        }
        self.pending.scroll_delta += count as i32;
        self.note_row_edit(top, bottom - 1);
    }

    // ---- cursor movement -------------------------------------------------

    /// CUP: 0-based logical coordinates, region-relative in origin mode.
    pub(crate) fn move_cursor_to(&mut self, row: usize, col: usize) {
        let (top, bottom) = self.region;
        self.cursor.col = col.min(self.visible_cols - 1);
        self.cursor.row = if self.modes.origin {
            (top + row).min(bottom - 1)
        } else {
            row.min(self.rows - 1)
        };
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn move_cursor_up(&mut self, count: usize) {
        let (top, _) = self.region;
        // Stop at the top margin when starting inside the region
        let floor = if self.cursor.row >= top { top } else { 0 };
        self.cursor.row = self.cursor.row.saturating_sub(count).max(floor);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn move_cursor_down(&mut self, count: usize) {
        let (_, bottom) = self.region;
        let ceiling = if self.cursor.row < bottom {
            bottom - 1
        } else {
            self.rows - 1
        };
        self.cursor.row = (self.cursor.row + count).min(ceiling);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn move_cursor_left(&mut self, count: usize) {
        self.cursor.col = self.cursor.col.saturating_sub(count);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn move_cursor_right(&mut self, count: usize) {
        self.cursor.col = (self.cursor.col + count).min(self.visible_cols - 1);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    /// CHA: absolute column on the current row.
    pub(crate) fn move_cursor_to_column(&mut self, col: usize) {
        self.cursor.col = col.min(self.visible_cols - 1);
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    /// VPA: absolute row, region-relative in origin mode.
    pub(crate) fn move_cursor_to_row(&mut self, row: usize) {
        let (top, bottom) = self.region;
        self.cursor.row = if self.modes.origin {
            (top + row).min(bottom - 1)
        } else {
            row.min(self.rows - 1)
        };
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    // ---- erase and edit --------------------------------------------------

    /// ED. Erased cells take the current background only.
    pub(crate) fn erase_display(&mut self, mode: u16) {
        let bg = self.cursor.attrs.bg;
        let row = self.cursor.row;
        let col = self.cursor.col;
        match mode {
            0 => {
                let (grid, _) = self.grid_and_ids();
                grid.clear_below(row, col, bg);
                let last = self.rows - 1;
                self.note_edit(row, col, self.visible_cols - 1);
                self.note_row_edit(row.min(last), last);
            }
            1 => {
                let (grid, _) = self.grid_and_ids();
                grid.clear_above(row, col, bg);
                self.note_row_edit(0, row);
            }
            2 => {
                if !self.using_alternate && self.modes.save_lines_on_clear {
                    // Cleared content survives in the scrollback.
                    let rows = self.rows;
                    let removed = {
                        let (grid, ids) = self.grid_and_ids();
                        grid.scroll_up_region(0, rows, rows, bg, ids)
                    };
                    let scrolled = removed.len() as i32;
                    for line in removed {
                        match self.scrollback.push(line) {
                            Ok(_) => self.pending.scrollback_pushed += 1,
                            Err(error) => self.note_memory_error(error),
                        }
                    }
                    self.pending.scroll_delta -= scrolled;
                } else {
                    let (grid, _) = self.grid_and_ids();
                    grid.clear_all(bg);
                }
                self.note_full_screen_edit();
            }
            3 => {
                let (grid, _) = self.grid_and_ids();
                grid.clear_all(bg);
                self.note_full_screen_edit();
                self.delete_all_saved_lines();
            }
            _ => self.note_error(),
        }
    }

    /// EL.
    pub(crate) fn erase_line(&mut self, mode: u16) {
        let bg = self.cursor.attrs.bg;
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.visible_cols;
        let (grid, _) = self.grid_and_ids();
        match mode {
            0 => {
                grid.line_mut(row).clear_from(col, bg);
                self.note_edit(row, col, cols - 1);
            }
            1 => {
                grid.line_mut(row).clear_to(col, bg);
                self.note_edit(row, 0, col);
            }
            2 => {
                grid.line_mut(row).clear_from(0, bg);
                self.note_edit(row, 0, cols - 1);
            }
            _ => self.note_error(),
        }
    }

    /// ECH.
    pub(crate) fn erase_chars(&mut self, count: usize) {
        let bg = self.cursor.attrs.bg;
        let row = self.cursor.row;
        let col = self.cursor.col;
        let last = (col + count.max(1) - 1).min(self.visible_cols - 1);
        let (grid, _) = self.grid_and_ids();
        grid.line_mut(row).erase_cells(col, count, bg);
        self.note_edit(row, col, last);
    }

    /// IL: only inside the scroll region.
    pub(crate) fn insert_lines(&mut self, count: usize) {
        let (top, bottom) = self.region;
        let row = self.cursor.row;
        if row < top || row >= bottom {
            return;
        }
        let bg = self.cursor.attrs.bg;
        {
            let (grid, ids) = self.grid_and_ids();
            grid.insert_lines(row, count, bottom, bg, ids);
        }
        self.note_row_edit(row, bottom - 1);
    }

    /// DL: only inside the scroll region.
    pub(crate) fn delete_lines(&mut self, count: usize) {
        let (top, bottom) = self.region;
        let row = self.cursor.row;
        if row < top || row >= bottom {
            return;
        }
        let bg = self.cursor.attrs.bg;
        {
            let (grid, ids) = self.grid_and_ids();
            grid.delete_lines(row, count, bottom, bg, ids);
        }
        self.note_row_edit(row, bottom - 1);
    }

    /// ICH.
    pub(crate) fn insert_chars(&mut self, count: usize) {
        let bg = self.cursor.attrs.bg;
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.visible_cols;
        let (grid, _) = self.grid_and_ids();
        grid.line_mut(row).insert_cells(col, count, bg, cols);
        self.note_edit(row, col, cols - 1);
    }

    /// DCH.
    pub(crate) fn delete_chars(&mut self, count: usize) {
        let bg = self.cursor.attrs.bg;
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.visible_cols;
        let (grid, _) = self.grid_and_ids();
        grid.line_mut(row).delete_cells(col, count, bg, cols);
        self.note_edit(row, col, cols - 1);
    }

    // ---- scroll region, tabs, saved cursor -------------------------------

    /// DECSTBM with 1-based inclusive parameters; resets to the full
    /// screen when the range is degenerate. The cursor homes.
    pub(crate) fn set_scroll_region(&mut self, top_1based: u16, bottom_1based: u16) {
        let top = usize::from(top_1based.max(1)) - 1;
        let bottom = usize::from(bottom_1based).min(self.rows);
        if top < bottom {
            self.region = (top, bottom);
        } else {
            self.region = (0, self.rows);
        }
        let home_row = if self.modes.origin { self.region.0 } else { 0 };
        self.cursor.row = home_row;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.note_cursor_moved();
    }

    pub(crate) fn set_tab_stop(&mut self) {
        let col = self.cursor.col;
        if col < self.tab_stops.len() {
            self.tab_stops[col] = true;
        }
    }

    /// TBC 0 and 3.
    pub(crate) fn clear_tab_stop(&mut self, mode: u16) {
        match mode {
            0 => {
                let col = self.cursor.col;
                if col < self.tab_stops.len() {
                    self.tab_stops[col] = false;
                }
            }
            3 => self.tab_stops.iter_mut().for_each(|stop| *stop = false),
            _ => self.note_error(),
        }
    }

    /// DECSC.
    pub(crate) fn save_cursor(&mut self) {
        let snapshot = SavedCursor::capture(&self.cursor, self.modes.origin, &self.charset);
        if self.using_alternate {
            self.saved_alternate = snapshot;
        } else {
            self.saved_primary = snapshot;
        }
    }

    /// DECRC.
    pub(crate) fn restore_cursor(&mut self) {
        let snapshot = if self.using_alternate {
            self.saved_alternate.clone()
        } else {
            self.saved_primary.clone()
        };
        snapshot.restore(&mut self.cursor, &mut self.modes.origin, &mut self.charset);
        self.cursor.row = self.cursor.row.min(self.rows - 1);
        self.cursor.col = self.cursor.col.min(self.visible_cols - 1);
        self.note_cursor_moved();
    }

    // ---- alternate screen ------------------------------------------------

    pub(crate) fn enter_alternate_screen(&mut self, clear: bool) {
        if !self.using_alternate {
            self.using_alternate = true;
            self.modes.alternate_screen = true;
        }
        if clear {
            self.cursor.reset();
            self.alternate.clear_all(crate::color::Color::Default);
        }
        self.note_full_screen_edit();
    }

    pub(crate) fn exit_alternate_screen(&mut self) {
        if self.using_alternate {
            self.using_alternate = false;
            self.modes.alternate_screen = false;
        }
        self.note_full_screen_edit();
        self.note_cursor_moved();
    }

    // ---- line attributes, titles, DECALN ---------------------------------

    /// DECDWL / DECDHL / DECSWL on the cursor row.
    pub(crate) fn set_line_attr(&mut self, attr: LineAttr) {
        let row = self.cursor.row;
        let cols = self.visible_cols;
        let (grid, _) = self.grid_and_ids();
        grid.line_mut(row).attr = attr;
        self.note_edit(row, 0, cols - 1);
    }

    /// DECALN: fill with E, reset region and cursor.
    pub(crate) fn alignment_test(&mut self) {
        let cols = self.visible_cols;
        let rows = self.rows;
        {
            let (grid, _) = self.grid_and_ids();
            for line in grid.iter_mut() {
                for col in 0..cols {
                    line.put_char(col, 'E', AttributeWord::default(), cols);
                }
            }
        }
        self.region = (0, rows);
        self.cursor.row = 0;
        self.cursor.col = 0;
        self.cursor.pending_wrap = false;
        self.note_full_screen_edit();
        self.note_cursor_moved();
    }

    pub(crate) fn set_window_title(&mut self, title: &str) {
        self.window_title = title.chars().take(4096).collect();
        let title = self.window_title.clone();
        self.fire(Event::WindowFrameTitle { title });
    }

    pub(crate) fn set_icon_title(&mut self, title: &str) {
        self.icon_title = title.chars().take(4096).collect();
        let title = self.icon_title.clone();
        self.fire(Event::WindowIconTitle { title });
    }

    pub(crate) fn request_minimize(&mut self, minimize: bool) {
        self.minimize_requested = minimize;
        self.fire(Event::WindowMinimization { minimize });
    }

    /// Assign a palette entry (already gated by variant) and notify.
    pub(crate) fn set_palette_color(
        &mut self,
        index: u16,
        color: crate::color::RgbColor16,
    ) -> Result<()> {
        self.palette.set_entry(index, color)?;
        self.fire(Event::XtermColor(XtermColorDescription { index, color }));
        Ok(())
    }

    /// DECLL: parameter 0 clears all four, 1-4 light one.
    pub(crate) fn load_leds(&mut self, param: u16) {
        match param {
            0 => self.leds = [false; 4],
            1..=4 => self.leds[usize::from(param - 1)] = true,
            _ => {
                self.note_error();
                return;
            }
        }
        self.fire(Event::NewLedState { leds: self.leds });
    }

    // ---- user input synthesis --------------------------------------------

    /// Send cursor-key sequences for a relative cursor offset, honoring
    /// application cursor key mode.
    pub fn user_input_offset_cursor(&mut self, column_delta: i16, row_delta: i16) -> Result<()> {
        let mut send = |screen: &mut Self, letter: u8, count: u16| -> Result<()> {
            let prefix: &[u8] = if screen.modes.application_cursor_keys {
                b"\x1bO"
            } else {
                b"\x1b["
            };
            for _ in 0..count {
                let mut bytes = prefix.to_vec();
                bytes.push(letter);
                screen.talkback.reply(&bytes)?;
            }
            Ok(())
        };
        if row_delta < 0 {
            send(self, b'A', row_delta.unsigned_abs())?;
        } else if row_delta > 0 {
            send(self, b'B', row_delta.unsigned_abs())?;
        }
        if column_delta > 0 {
            send(self, b'C', column_delta.unsigned_abs())?;
        } else if column_delta < 0 {
            send(self, b'D', column_delta.unsigned_abs())?;
        }
        Ok(())
    }

    /// Send the byte sequence for a VT function key (1-12).
    pub fn user_input_function_key(&mut self, key: u8) -> Result<()> {
        let bytes: Vec<u8> = match key {
            1 => b"\x1bOP".to_vec(),
            2 => b"\x1bOQ".to_vec(),
            3 => b"\x1bOR".to_vec(),
            4 => b"\x1bOS".to_vec(),
            5 => b"\x1b[15~".to_vec(),
            6 => b"\x1b[17~".to_vec(),
            7 => b"\x1b[18~".to_vec(),
            8 => b"\x1b[19~".to_vec(),
            9 => b"\x1b[20~".to_vec(),
            10 => b"\x1b[21~".to_vec(),
            11 => b"\x1b[23~".to_vec(),
            12 => b"\x1b[24~".to_vec(),
            _ => return Err(Error::ParameterError),
        };
        self.talkback.reply(&bytes)
    }

    pub(crate) fn store_clipboard_write(&mut self, payload: String) {
        self.clipboard_write = Some(payload);
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("emulator", &self.emulator)
            .field("columns", &self.visible_cols)
            .field("rows", &self.rows)
            .field("scrollback_rows", &self.scrollback.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

fn default_tab_stops() -> Vec<bool> {
    let mut stops = vec![false; ALLOCATED_COLUMNS];
    for col in (0..ALLOCATED_COLUMNS).step_by(DEFAULT_TAB_WIDTH) {
        stops[col] = true;
    }
    stops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Screen {
        Screen::new(ScreenConfig::standard()).unwrap()
    }

    fn small(cols: usize, rows: usize) -> Screen {
        Screen::new(ScreenConfig {
            columns: cols,
            rows,
            ..ScreenConfig::standard()
        })
        .unwrap()
    }

    fn row_text(screen: &Screen, row: usize) -> String {
        screen.grid().line(row).text(screen.columns())
    }

    #[test]
    fn test_new_screen_dimensions() {
        let s = screen();
        assert_eq!(s.columns(), 80);
        assert_eq!(s.rows(), 24);
        assert_eq!(s.cursor_location(), (0, 0));
        assert_eq!(s.scroll_region(), (0, 24));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let result = Screen::new(ScreenConfig {
            columns: 0,
            rows: 24,
            ..ScreenConfig::standard()
        });
        assert!(matches!(result, Err(Error::ParameterError)));
    }

    #[test]
    fn test_columns_clamped_to_allocation() {
        let s = Screen::new(ScreenConfig {
            columns: 1000,
            rows: 24,
            ..ScreenConfig::standard()
        })
        .unwrap();
        assert_eq!(s.columns(), ALLOCATED_COLUMNS);
    }

    #[test]
    fn test_print_and_advance() {
        let mut s = screen();
        s.print_char('H');
        s.print_char('i');
        assert_eq!(row_text(&s, 0), "Hi");
        assert_eq!(s.cursor_location(), (0, 2));
    }

    #[test]
    fn test_wrap_pending_sentinel() {
        let mut s = small(5, 3);
        for _ in 0..5 {
            s.print_char('X');
        }
        assert_eq!(s.cursor_location(), (0, 5));
        s.print_char('Y');
        assert_eq!(s.cursor_location(), (1, 1));
        assert_eq!(row_text(&s, 1), "Y");
        assert!(s.grid().line(1).wrapped);
    }

    #[test]
    fn test_no_wrap_when_autowrap_off(){
        let mut s = small(5, 3);
        s.set_line_wrap_enabled(false);
        for ch in "ABCDEFG".chars() {
            s.print_char(ch);
        }
        assert_eq!(s.cursor_location(), (0, 4));
        assert_eq!(row_text(&s, 0), "ABCDG");
    }

    #[test]
    fn test_wide_char_does_not_split_at_margin() {
        let mut s = small(5, 3);
        for ch in "abcd".chars() {
            s.print_char(ch);
        }
        s.print_char('中');
        assert_eq!(row_text(&s, 0), "abcd");
        assert_eq!(row_text(&s, 1), "中");
        assert!(s.grid().line(1).cell(0).is_wide_lead());
        assert!(s.grid().line(1).cell(1).is_continuation());
    }

    #[test]
    fn test_linefeed_scrolls_into_scrollback() {
        let mut s = small(10, 3);
        for (i, ch) in "ABC".chars().enumerate() {
            s.print_char(ch);
            if i < 2 {
                s.linefeed();
                s.carriage_return();
            }
        }
        s.linefeed();
        s.print_char('D');
        assert_eq!(row_text(&s, 0), "B");
        assert_eq!(s.scrollback_rows(), 1);
        assert_eq!(s.scrollback.line(0).unwrap().text(10), "A");
    }

    #[test]
    fn test_scroll_region_confines_scrolling() {
        let mut s = small(10, 5);
        for row in 0..5 {
            s.move_cursor_to(row, 0);
            s.print_char((b'A' + row as u8) as char);
        }
        s.set_scroll_region(2, 4);
        s.move_cursor_to(3, 0);
        s.linefeed();
        assert_eq!(row_text(&s, 0), "A");
        assert_eq!(row_text(&s, 1), "C");
        assert_eq!(row_text(&s, 2), "D");
        assert_eq!(row_text(&s, 3), "");
        assert_eq!(row_text(&s, 4), "E");
        // Inner-region scrolling never reaches the scrollback
        assert_eq!(s.scrollback_rows(), 0);
    }

    #[test]
    fn test_origin_mode_addressing() {
        let mut s = small(10, 10);
        s.set_scroll_region(3, 8);
        s.modes.origin = true;
        s.move_cursor_to(0, 0);
        assert_eq!(s.cursor_location(), (2, 0));
        s.move_cursor_to(99, 0);
        assert_eq!(s.cursor_location(), (7, 0));
    }

    #[test]
    fn test_save_restore_cursor_round_trip() {
        let mut s = screen();
        s.move_cursor_to(9, 19);
        s.cursor.attrs.bold = true;
        s.modes.origin = true;
        s.charset
            .designate(1, crate::charset::Charset::DecSpecialGraphics);
        s.save_cursor();

        s.move_cursor_to(0, 0);
        s.cursor.attrs.bold = false;
        s.modes.origin = false;
        s.charset.reset();
        s.restore_cursor();

        assert_eq!(s.cursor_location(), (9, 19));
        assert!(s.cursor.attrs.bold);
        assert!(s.modes.origin);
        assert_eq!(
            s.charset.slot(1),
            crate::charset::Charset::DecSpecialGraphics
        );
    }

    #[test]
    fn test_alternate_screen_preserves_primary() {
        let mut s = screen();
        s.print_char('A');
        s.save_cursor();
        s.enter_alternate_screen(true);
        assert_eq!(row_text(&s, 0), "");
        s.print_char('B');
        assert_eq!(row_text(&s, 0), "B");
        s.exit_alternate_screen();
        s.restore_cursor();
        assert_eq!(row_text(&s, 0), "A");
    }

    #[test]
    fn test_erase_display_uses_background_only() {
        let mut s = small(10, 3);
        s.cursor.attrs.bold = true;
        s.cursor.attrs.bg = crate::color::Color::Indexed(4);
        s.print_char('X');
        s.erase_display(2);
        let cell = s.grid().line(0).cell(0);
        assert!(cell.is_blank());
        assert!(!cell.attrs.bold);
        assert_eq!(cell.attrs.bg, crate::color::Color::Indexed(4));
    }

    #[test]
    fn test_erase_display_save_lines_on_clear() {
        let mut s = small(10, 3);
        s.set_save_lines_on_clear(true);
        s.print_char('A');
        s.erase_display(2);
        assert_eq!(row_text(&s, 0), "");
        assert_eq!(s.scrollback_rows(), 3);
        assert_eq!(s.scrollback.line(2).unwrap().text(10), "A");
    }

    #[test]
    fn test_erase_scrollback() {
        let mut s = small(10, 2);
        s.print_char('A');
        s.linefeed();
        s.linefeed();
        assert_eq!(s.scrollback_rows(), 1);
        s.erase_display(3);
        assert_eq!(s.scrollback_rows(), 0);
    }

    #[test]
    fn test_tab_stops() {
        let mut s = screen();
        s.tab();
        assert_eq!(s.cursor_location(), (0, 8));
        s.tab();
        assert_eq!(s.cursor_location(), (0, 16));
        s.move_cursor_to(0, 3);
        s.set_tab_stop();
        s.move_cursor_to(0, 0);
        s.tab();
        assert_eq!(s.cursor_location(), (0, 3));
        s.clear_tab_stop(3);
        s.move_cursor_to(0, 0);
        s.tab();
        assert_eq!(s.cursor_location(), (0, 79));
    }

    #[test]
    fn test_insert_delete_lines_respect_region() {
        let mut s = small(10, 5);
        for row in 0..5 {
            s.move_cursor_to(row, 0);
            s.print_char((b'A' + row as u8) as char);
        }
        s.move_cursor_to(1, 0);
        s.insert_lines(2);
        assert_eq!(
            (0..5).map(|r| row_text(&s, r)).collect::<Vec<_>>(),
            vec!["A", "", "", "B", "C"]
        );
    }

    #[test]
    fn test_line_ref_follows_line_into_scrollback() {
        let mut s = small(10, 2);
        s.print_char('A');
        let line_ref = s.main_screen_line(0).unwrap();
        s.linefeed();
        s.linefeed(); // row 0 scrolls out
        let (region, index) = s.resolve_ref(&line_ref).unwrap();
        assert_eq!(region, Region::Scrollback);
        assert_eq!(index, 0);
        assert_eq!(s.line_text(&line_ref).unwrap(), "A");
    }

    #[test]
    fn test_advance_line_across_boundary() {
        let mut s = small(10, 2);
        s.print_char('A');
        s.linefeed();
        s.linefeed();
        s.print_char('B');
        // scrollback: ["A"], screen rows: ["", "B"]? (A scrolled, then blank)
        let mut line_ref = s.main_screen_line(0).unwrap();
        s.advance_line(&mut line_ref, -1).unwrap();
        assert_eq!(line_ref.region(), Region::Scrollback);
        assert_eq!(s.line_text(&line_ref).unwrap(), "A");
        s.advance_line(&mut line_ref, 2).unwrap();
        assert_eq!(line_ref.region(), Region::MainScreen);
        assert!(matches!(
            s.advance_line(&mut line_ref, 5),
            Err(Error::IteratorCannotAdvance)
        ));
    }

    #[test]
    fn test_line_for_id_after_eviction() {
        let mut s = Screen::new(ScreenConfig {
            columns: 10,
            rows: 2,
            scrollback: ScrollbackType::Fixed(1),
            ..ScreenConfig::standard()
        })
        .unwrap();
        s.print_char('A');
        let id = s.grid().line(0).id();
        s.linefeed();
        s.linefeed();
        assert!(s.line_for_id(id).is_ok());
        s.linefeed(); // pushes another line; capacity 1 evicts "A"
        assert_eq!(s.line_for_id(id), Err(Error::InvalidId));
    }

    #[test]
    fn test_attribute_run_iteration() {
        let mut s = screen();
        s.print_char('A');
        s.cursor.attrs.fg = crate::color::Color::Indexed(1);
        s.print_char('B');
        s.cursor.attrs = AttributeWord::default();
        s.print_char('C');
        let line_ref = s.main_screen_line(0).unwrap();
        let mut runs: Vec<(Option<String>, usize, usize)> = Vec::new();
        s.for_each_like_attribute_run(&line_ref, |text, start, len, _| {
            runs.push((text.map(str::to_string), start, len));
        })
        .unwrap();
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0], (Some("A".into()), 0, 1));
        assert_eq!(runs[1], (Some("B".into()), 1, 1));
        assert_eq!(runs[2], (Some("C".into()), 2, 1));
        assert_eq!(runs[3], (None, 3, 77));
    }

    #[test]
    fn test_run_concatenation_recovers_text() {
        let mut s = screen();
        for ch in "A B".chars() {
            s.print_char(ch);
        }
        let line_ref = s.main_screen_line(0).unwrap();
        let mut collected = String::new();
        s.for_each_like_attribute_run(&line_ref, |text, _, _, _| {
            if let Some(text) = text {
                collected.push_str(text);
            }
        })
        .unwrap();
        assert_eq!(collected, "A B");
    }

    #[test]
    fn test_resize_narrower_reflows_wrapped_text() {
        let mut s = small(8, 4);
        for ch in "ABCDEFGHIJ".chars() {
            s.print_char(ch);
        }
        // 8 wide: "ABCDEFGH" + wrapped "IJ"
        assert_eq!(row_text(&s, 0), "ABCDEFGH");
        assert_eq!(row_text(&s, 1), "IJ");
        s.set_visible_dimensions(5, 4).unwrap();
        assert_eq!(row_text(&s, 0), "ABCDE");
        assert_eq!(row_text(&s, 1), "FGHIJ");
        assert!(s.grid().line(1).wrapped);
    }

    #[test]
    fn test_resize_round_trip_preserves_content() {
        let mut s = small(20, 5);
        for (row, word) in ["alpha", "beta", "gamma"].iter().enumerate() {
            s.move_cursor_to(row, 0);
            for ch in word.chars() {
                s.print_char(ch);
            }
        }
        s.set_visible_dimensions(10, 5).unwrap();
        s.set_visible_dimensions(20, 5).unwrap();
        assert_eq!(row_text(&s, 0), "alpha");
        assert_eq!(row_text(&s, 1), "beta");
        assert_eq!(row_text(&s, 2), "gamma");
    }

    #[test]
    fn test_resize_rows_pulls_from_scrollback() {
        let mut s = small(10, 3);
        for (i, ch) in "ABCD".chars().enumerate() {
            if i > 0 {
                s.linefeed();
                s.carriage_return();
            }
            s.print_char(ch);
        }
        // rows: B C D, scrollback: A
        assert_eq!(s.scrollback_rows(), 1);
        s.set_visible_dimensions(10, 4).unwrap();
        assert_eq!(s.scrollback_rows(), 0);
        assert_eq!(row_text(&s, 0), "A");
        assert_eq!(row_text(&s, 3), "D");
    }

    #[test]
    fn test_resize_rows_shrink_pushes_to_scrollback() {
        let mut s = small(10, 4);
        for (i, ch) in "ABCD".chars().enumerate() {
            s.move_cursor_to(i, 0);
            s.print_char(ch);
        }
        s.move_cursor_to(3, 0);
        s.set_visible_dimensions(10, 2).unwrap();
        assert_eq!(s.scrollback_rows(), 2);
        assert_eq!(row_text(&s, 0), "C");
        assert_eq!(row_text(&s, 1), "D");
    }

    #[test]
    fn test_leds() {
        let mut s = screen();
        assert_eq!(s.led(1), Ok(false));
        s.set_led(2, true).unwrap();
        assert_eq!(s.led(2), Ok(true));
        assert_eq!(s.led(0), Err(Error::ParameterError));
        assert_eq!(s.led(5), Err(Error::ParameterError));
        s.load_leds(0);
        assert_eq!(s.led(2), Ok(false));
    }

    #[test]
    fn test_full_reset_restores_defaults() {
        let mut s = screen();
        s.print_char('X');
        s.modes.origin = true;
        s.set_scroll_region(5, 10);
        s.reset(ResetScope::All);
        assert_eq!(row_text(&s, 0), "");
        assert!(!s.modes.origin);
        assert_eq!(s.scroll_region(), (0, 24));
    }

    #[test]
    fn test_graphics_reset_only_touches_charsets() {
        let mut s = screen();
        s.print_char('X');
        s.charset
            .designate(0, crate::charset::Charset::DecSpecialGraphics);
        s.reset(ResetScope::GraphicsCharacters);
        assert_eq!(row_text(&s, 0), "X");
        assert_eq!(s.charset.slot(0), crate::charset::Charset::Ascii);
    }

    #[test]
    fn test_user_input_requires_session() {
        let mut s = screen();
        assert_eq!(
            s.user_input_offset_cursor(1, 0),
            Err(Error::NoListeningSession)
        );
        let sent = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = sent.clone();
        s.set_listening_session(Some(Box::new(move |bytes: &[u8]| {
            sink.borrow_mut().extend_from_slice(bytes)
        })));
        s.user_input_offset_cursor(2, -1).unwrap();
        assert_eq!(&*sent.borrow(), b"\x1b[A\x1b[C\x1b[C");
    }

    #[test]
    fn test_function_keys() {
        let mut s = screen();
        let sent = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = sent.clone();
        s.set_listening_session(Some(Box::new(move |bytes: &[u8]| {
            sink.borrow_mut().extend_from_slice(bytes)
        })));
        s.user_input_function_key(1).unwrap();
        s.user_input_function_key(5).unwrap();
        assert_eq!(&*sent.borrow(), b"\x1bOP\x1b[15~");
        assert_eq!(s.user_input_function_key(13), Err(Error::ParameterError));
    }
}

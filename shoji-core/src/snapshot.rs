//! Serializable captures of screen state
//!
//! Snapshots support golden tests and debugging: a structured capture of
//! the visible grid (and optionally the scrollback) with attribute spans,
//! plus a plain-text detailed dump.

use serde::{Deserialize, Serialize};

use crate::attr::{AttributeWord, LineAttr};
use crate::color::Color;
use crate::line::Line;
use crate::screen::Screen;

/// A complete capture of one screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub columns: usize,
    pub rows: usize,
    pub cursor: SnapshotCursor,
    pub screen: Vec<SnapshotLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrollback: Option<Vec<SnapshotLine>>,
    pub modes: SnapshotModes,
    /// Half-open scroll region rows
    pub scroll_region: (usize, usize),
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotCursor {
    pub row: usize,
    pub column: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wrapped: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SnapshotSpan>,
}

/// A run of styled cells on one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSpan {
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inverse: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotModes {
    pub origin: bool,
    pub autowrap: bool,
    pub insert: bool,
    pub cursor_visible: bool,
    pub alternate_screen: bool,
    pub bracketed_paste: bool,
    pub reverse_video: bool,
}

impl Snapshot {
    pub(crate) fn capture(screen: &Screen, include_scrollback: bool) -> Self {
        let cols = screen.columns();
        let lines = screen
            .grid()
            .iter()
            .map(|line| snapshot_line(line, cols))
            .collect();
        let scrollback = include_scrollback.then(|| {
            screen
                .scrollback
                .iter()
                .map(|line| snapshot_line(line, cols))
                .collect()
        });
        let (row, column) = screen.cursor_location();
        Self {
            columns: cols,
            rows: screen.rows(),
            cursor: SnapshotCursor {
                row,
                column,
                visible: screen.cursor_visible(),
            },
            screen: lines,
            scrollback,
            modes: SnapshotModes {
                origin: screen.modes().origin,
                autowrap: screen.modes().autowrap,
                insert: screen.modes().insert,
                cursor_visible: screen.modes().cursor_visible,
                alternate_screen: screen.modes().alternate_screen,
                bracketed_paste: screen.modes().bracketed_paste,
                reverse_video: screen.modes().reverse_video,
            },
            scroll_region: screen.scroll_region(),
            title: (!screen.window_title().is_empty()).then(|| screen.window_title().to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The visible rows as one newline-joined string.
    pub fn screen_text(&self) -> String {
        self.screen
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn snapshot_line(line: &Line, cols: usize) -> SnapshotLine {
    SnapshotLine {
        text: line.text(cols),
        wrapped: line.wrapped,
        spans: styled_spans(line, cols),
    }
}

fn styled_spans(line: &Line, cols: usize) -> Vec<SnapshotSpan> {
    let mut spans: Vec<SnapshotSpan> = Vec::new();
    let mut current: Option<(AttributeWord, usize)> = None;
    for col in 0..cols {
        let cell = line.cell(col);
        let styled = cell.attrs != AttributeWord::default();
        if let Some((attrs, start)) = current {
            if styled && attrs == cell.attrs {
                continue;
            }
            spans.push(make_span(attrs, start, col));
            current = None;
        }
        if styled {
            current = Some((cell.attrs, col));
        }
    }
    if let Some((attrs, start)) = current {
        spans.push(make_span(attrs, start, cols));
    }
    spans
}

fn make_span(attrs: AttributeWord, start: usize, end: usize) -> SnapshotSpan {
    SnapshotSpan {
        start,
        end,
        fg: color_name(attrs.fg),
        bg: color_name(attrs.bg),
        bold: attrs.bold,
        underline: attrs.underline,
        inverse: attrs.inverse,
    }
}

fn color_name(color: Color) -> Option<String> {
    match color {
        Color::Default => None,
        Color::Indexed(index) => Some(format!("idx:{index}")),
        Color::Rgb { r, g, b } => Some(format!("#{r:02x}{g:02x}{b:02x}")),
    }
}

/// Multi-line human-readable dump of the whole screen for debugging.
pub(crate) fn detailed_dump(screen: &Screen) -> String {
    use std::fmt::Write;

    let cols = screen.columns();
    let mut out = String::new();
    let (cursor_row, cursor_col) = screen.cursor_location();
    let _ = writeln!(
        out,
        "emulator={} size={}x{} cursor=({cursor_row},{cursor_col}) region={:?}",
        screen.emulator().default_name(),
        cols,
        screen.rows(),
        screen.scroll_region(),
    );
    let _ = writeln!(
        out,
        "modes: origin={} autowrap={} insert={} lnm={} reverse={} alt={}",
        screen.modes().origin,
        screen.modes().autowrap,
        screen.modes().insert,
        screen.modes().line_feed_new_line,
        screen.modes().reverse_video,
        screen.modes().alternate_screen,
    );
    for (row, line) in screen.grid().iter().enumerate() {
        let marker = match line.attr {
            LineAttr::Single => ' ',
            LineAttr::DoubleWidth => 'W',
            LineAttr::DoubleHeightTop => 'T',
            LineAttr::DoubleHeightBottom => 'B',
        };
        let wrap = if line.wrapped { '+' } else { ' ' };
        let _ = writeln!(
            out,
            "{row:3}{wrap}{marker} [{:>6}] |{}|",
            line.id().0,
            line.text(cols)
        );
    }
    if screen.scrollback_rows() > 0 {
        let _ = writeln!(out, "scrollback ({} rows, newest first):", screen.scrollback_rows());
        for (index, line) in screen.scrollback.iter().enumerate() {
            let wrap = if line.wrapped { '+' } else { ' ' };
            let _ = writeln!(out, "S{index:2}{wrap} [{:>6}] |{}|", line.id().0, line.text(cols));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenConfig;

    fn screen_with_text(text: &str) -> Screen {
        let mut screen = Screen::new(ScreenConfig {
            columns: 20,
            rows: 4,
            ..ScreenConfig::standard()
        })
        .unwrap();
        for ch in text.chars() {
            screen.print_char(ch);
        }
        screen
    }

    #[test]
    fn test_capture_basics() {
        let screen = screen_with_text("hello");
        let snapshot = screen.snapshot(false);
        assert_eq!(snapshot.columns, 20);
        assert_eq!(snapshot.rows, 4);
        assert_eq!(snapshot.screen[0].text, "hello");
        assert_eq!(snapshot.cursor.column, 5);
        assert!(snapshot.scrollback.is_none());
    }

    #[test]
    fn test_styled_span_extraction() {
        let mut screen = screen_with_text("ab");
        screen.cursor.attrs.bold = true;
        screen.cursor.attrs.fg = Color::Indexed(1);
        screen.print_char('c');
        let snapshot = screen.snapshot(false);
        let spans = &snapshot.screen[0].spans;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 2);
        assert_eq!(spans[0].end, 3);
        assert!(spans[0].bold);
        assert_eq!(spans[0].fg.as_deref(), Some("idx:1"));
    }

    #[test]
    fn test_json_round_trip() {
        let screen = screen_with_text("round trip");
        let snapshot = screen.snapshot(true);
        let json = snapshot.to_json().unwrap();
        let parsed = Snapshot::from_json(&json).unwrap();
        assert_eq!(parsed.screen_text(), snapshot.screen_text());
        assert_eq!(parsed.columns, snapshot.columns);
    }

    #[test]
    fn test_detailed_dump_contains_content() {
        let screen = screen_with_text("visible");
        let dump = screen.detailed_dump();
        assert!(dump.contains("|visible"));
        assert!(dump.contains("xterm-256color"));
    }
}

//! Text search over the visible screen and scrollback
//!
//! Forward order visits the main screen top to bottom, then the
//! scrollback newest to oldest; backward order is the reverse. Matching
//! happens over logical paragraphs - soft-wrapped rows are joined before
//! matching, and match positions are mapped back to physical rows - so a
//! query can match text that wraps across a row boundary.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::event::RangeDescription;
use crate::iterator::Region;
use crate::line::Line;
use crate::screen::Screen;

/// Search options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchFlags {
    /// Uppercase and lowercase differ
    pub case_sensitive: bool,
    /// Visit the oldest rows first
    pub backwards: bool,
}

/// One physical character position inside a logical paragraph.
#[derive(Clone, Copy)]
struct CharOrigin {
    /// Position in the traversal order (main rows first, then scrollback)
    priority: (u8, usize),
    region: Region,
    row_index: usize,
    column: usize,
}

pub(crate) fn search(
    screen: &Screen,
    query: &str,
    flags: SearchFlags,
    stop: Option<&AtomicBool>,
) -> Result<Vec<RangeDescription>> {
    if query.is_empty() {
        return Err(Error::ParameterError);
    }
    let needle: Vec<char> = if flags.case_sensitive {
        query.chars().collect()
    } else {
        query.chars().map(fold_char).collect()
    };

    // Physical rows in text order: oldest scrollback line first, bottom
    // main-screen row last. Priority reflects the reporting order, which
    // puts the main screen ahead of the scrollback.
    let sb_len = screen.scrollback.len();
    let mut rows: Vec<(CharOrigin, &Line)> = Vec::with_capacity(sb_len + screen.rows());
    for pos in (0..sb_len).rev() {
        let line = screen.scrollback.line(pos).expect("in range");
        rows.push((
            CharOrigin {
                priority: (1, pos),
                region: Region::Scrollback,
                row_index: pos,
                column: 0,
            },
            line,
        ));
    }
    for row in 0..screen.rows() {
        rows.push((
            CharOrigin {
                priority: (0, row),
                region: Region::MainScreen,
                row_index: row,
                column: 0,
            },
            screen.grid().line(row),
        ));
    }

    let visible = screen.visible_columns();
    let mut matches: Vec<(u8, usize, usize, RangeDescription)> = Vec::new();

    let mut start = 0;
    while start < rows.len() {
        if stop.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            break;
        }
        let mut end = start + 1;
        while end < rows.len() && rows[end].1.wrapped {
            end += 1;
        }

        // The joined text of the paragraph with per-character origins.
        let mut text: Vec<char> = Vec::new();
        let mut origins: Vec<CharOrigin> = Vec::new();
        for (index, (origin, line)) in rows[start..end].iter().enumerate() {
            let final_row = start + index + 1 == end;
            let limit = if final_row {
                line.occupied_columns(visible)
            } else {
                visible
            };
            for col in 0..limit {
                let cell = line.cell(col);
                if cell.is_continuation() {
                    continue;
                }
                text.push(if flags.case_sensitive {
                    cell.ch()
                } else {
                    fold_char(cell.ch())
                });
                origins.push(CharOrigin {
                    column: col,
                    ..*origin
                });
            }
        }

        for found in find_all(&text, &needle) {
            let first = origins[found];
            let last = origins[found + needle.len() - 1];
            matches.push((
                first.priority.0,
                first.priority.1,
                first.column,
                RangeDescription {
                    region: first.region,
                    first_row: row_id(screen, first),
                    last_row: row_id(screen, last),
                    first_column: first.column,
                    last_column: last.column,
                    rectangular: false,
                },
            ));
        }

        start = end;
    }

    matches.sort_by_key(|(section, row, col, _)| (*section, *row, *col));
    if flags.backwards {
        matches.reverse();
    }
    Ok(matches.into_iter().map(|(_, _, _, range)| range).collect())
}

fn row_id(screen: &Screen, origin: CharOrigin) -> crate::line::LineId {
    match origin.region {
        Region::MainScreen => screen.grid().line(origin.row_index).id(),
        Region::Scrollback => screen
            .scrollback
            .line(origin.row_index)
            .expect("in range")
            .id(),
    }
}

/// Every starting index where `needle` occurs in `haystack`. Overlapping
/// occurrences are reported.
fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    (0..=haystack.len() - needle.len())
        .filter(|&i| haystack[i..i + needle.len()] == *needle)
        .collect()
}

/// Simple case folding: the single-character lowercase mapping.
fn fold_char(ch: char) -> char {
    ch.to_lowercase().next().unwrap_or(ch)
}

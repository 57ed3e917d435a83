//! Text extraction for copy and capture
//!
//! Walks a row range and produces plain text. Linear extraction takes the
//! interior rows in full; rectangular extraction constrains every row to
//! the column span. The end-of-line sequence between rows follows the
//! right-margin rule: a row whose copy reaches the margin with a
//! non-whitespace character there flows into the next row without a
//! separator, unless the caller forces one.

use crate::error::Result;
use crate::iterator::LineRef;
use crate::screen::Screen;

/// Extraction options.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Constrain every row to `[start_column, end_column]`
    pub rectangular: bool,
    /// Append the end-of-line sequence even when a full row flows into
    /// the next one
    pub always_new_line_at_right_margin: bool,
    /// Expand tab characters to this many spaces; 0 passes tabs through
    pub spaces_per_tab: usize,
    /// Separator appended between rows
    pub end_of_line: String,
    /// Drop trailing whitespace from every row
    pub trim_trailing_whitespace: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            rectangular: false,
            always_new_line_at_right_margin: false,
            spaces_per_tab: 0,
            end_of_line: "\n".to_string(),
            trim_trailing_whitespace: true,
        }
    }
}

/// Copy `row_count` rows starting at `start`, from `start_column` on the
/// first row through `end_column` (inclusive) on the last.
pub(crate) fn copy_range(
    screen: &Screen,
    start: &LineRef,
    row_count: usize,
    start_column: usize,
    end_column: usize,
    options: &CopyOptions,
) -> Result<String> {
    let mut output = String::new();
    if row_count == 0 {
        return Ok(output);
    }
    let last_col = screen.visible_columns().saturating_sub(1);
    let mut cursor = *start;

    for row_index in 0..row_count {
        let (first, last) = if options.rectangular {
            (start_column, end_column.min(last_col))
        } else if row_count == 1 {
            (start_column, end_column.min(last_col))
        } else if row_index == 0 {
            (start_column, last_col)
        } else if row_index + 1 == row_count {
            (0, end_column.min(last_col))
        } else {
            (0, last_col)
        };

        let (region, index) = screen.resolve_ref(&cursor)?;
        let line = screen.line_at(region, index);

        let mut row_text = String::new();
        for col in first..=last.min(last_col) {
            let cell = line.cell(col);
            if cell.is_continuation() {
                continue;
            }
            match cell.ch() {
                '\t' if options.spaces_per_tab > 0 => {
                    for _ in 0..options.spaces_per_tab {
                        row_text.push(' ');
                    }
                }
                ch => row_text.push(ch),
            }
        }
        if options.trim_trailing_whitespace {
            row_text.truncate(row_text.trim_end().len());
        }
        output.push_str(&row_text);

        if row_index + 1 < row_count {
            let reaches_margin = last >= last_col;
            let margin_filled = reaches_margin && !line.cell(last_col).is_blank();
            let suppress = margin_filled && !options.always_new_line_at_right_margin;
            if !suppress {
                output.push_str(&options.end_of_line);
            }
            screen.advance_line(&mut cursor, 1)?;
        }
    }

    Ok(output)
}

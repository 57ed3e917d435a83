//! Shoji Core - terminal screen model and emulator engine
//!
//! This crate owns the addressable grid of attributed cells, the
//! scrollback, and the emulator that mutates them from a session's byte
//! stream:
//! - screen grid and scrollback with stable line ids and policy-driven
//!   history allocation
//! - per-variant emulation (VT100 through VT420, xterm flavors, PC ANSI,
//!   and a dumb renderer) over the `shoji-parser` state machine
//! - typed change notification with coalesced edit ranges
//! - search, copy extraction, attribute-run iteration, and the XTerm
//!   256-color palette
//!
//! Rendering, audio, speech, file capture, and session I/O are external
//! collaborators: they observe the screen through listeners and queries,
//! and supply a [`SessionSink`] for emulator replies.
//!
//! Everything is deterministic: the same byte stream against the same
//! configuration always produces the same screen state.

mod attr;
mod cell;
mod charset;
mod color;
mod copy;
mod cursor;
mod emulator;
mod error;
mod event;
mod grid;
mod iterator;
mod line;
mod modes;
mod palette;
mod scrollback;
mod screen;
mod search;
mod snapshot;
mod talkback;

pub use attr::{AttributeFlags, AttributeWord, LineAttr};
pub use cell::Cell;
pub use charset::{Charset, CharsetState};
pub use color::{Color, RgbColor16};
pub use copy::CopyOptions;
pub use cursor::{Cursor, CursorStyle, SavedCursor};
pub use emulator::{set_dumb_terminal_renderings, Emulator, EmulatorFamily};
pub use error::{Error, Result};
pub use event::{
    Change, ChangeListener, Event, ListenerToken, RangeDescription, ScrollDescription,
    XtermColorDescription,
};
pub use iterator::{LineRef, Region};
pub use line::{LineId, ALLOCATED_COLUMNS};
pub use modes::{Modes, MouseTracking};
pub use palette::{parse_color_spec, XtermPalette, FIRST_MUTABLE_INDEX};
pub use screen::{Screen, ScreenConfig, ResetScope, DEFAULT_SCROLLBACK_LINES};
pub use scrollback::{ScrollbackBudget, ScrollbackType};
pub use search::SearchFlags;
pub use snapshot::{Snapshot, SnapshotCursor, SnapshotLine, SnapshotModes, SnapshotSpan};
pub use talkback::SessionSink;

pub use shoji_parser::TextEncoding;

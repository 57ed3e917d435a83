//! Shoji Parser - escape sequence lexer for terminal byte streams
//!
//! This crate turns raw session bytes into typed actions:
//! - C0/C1 control characters
//! - ESC sequences (cursor save/restore, index, charset designation, ...)
//! - CSI (Control Sequence Introducer) sequences with sub-parameters
//! - OSC (Operating System Command) strings
//! - DCS (Device Control String) sequences with passthrough payloads
//! - APC, PM, SOS strings (consumed, reported as opaque payloads)
//!
//! The state machine follows the VT500 series parser model and is safe to
//! feed with arbitrary chunk boundaries; all state persists across calls.
//! It has no knowledge of the screen - interpretation belongs to the
//! emulator in `shoji-core`.

mod action;
mod encoding;
mod params;
mod parser;
mod utf8;

pub use action::{Action, CsiAction, DcsAction, EscAction, OscAction};
pub use encoding::TextEncoding;
pub use params::Params;
pub use parser::{Parser, ParserState};
pub use utf8::{Utf8Decoder, Utf8Result};

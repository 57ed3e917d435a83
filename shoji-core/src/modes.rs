//! Terminal mode flags
//!
//! ANSI modes (SM/RM) and DEC private modes (DECSET/DECRST) in one word.
//! The alternate-screen and mouse modes are tracked here; the screen acts
//! on the transitions.

use serde::{Deserialize, Serialize};

/// Which mouse events the application asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseTracking {
    #[default]
    None,
    /// DECSET 9: button press only
    X10,
    /// DECSET 1000: press and release
    Vt200,
    /// DECSET 1002: press, release, and drag
    ButtonEvent,
    /// DECSET 1003: all motion
    AnyEvent,
}

/// Mode word for one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modes {
    /// IRM: insert instead of overwrite
    pub insert: bool,
    /// LNM: line feed implies carriage return
    pub line_feed_new_line: bool,
    /// DECOM: cursor addressing relative to the scroll region
    pub origin: bool,
    /// DECAWM: wrap at the right margin
    pub autowrap: bool,
    /// DECSCNM: reverse video for the whole screen
    pub reverse_video: bool,
    /// DECCKM: application cursor keys
    pub application_cursor_keys: bool,
    /// DECKPAM/DECKPNM: application keypad
    pub application_keypad: bool,
    /// DECTCEM: cursor visible
    pub cursor_visible: bool,
    /// Cleared screen contents are pushed into the scrollback first
    pub save_lines_on_clear: bool,
    /// XTerm 2004: wrap pasted text in bracketing sequences
    pub bracketed_paste: bool,
    /// Active mouse protocol
    pub mouse_tracking: MouseTracking,
    /// Alternate screen buffer is active
    pub alternate_screen: bool,
}

impl Modes {
    pub fn new() -> Self {
        Self {
            insert: false,
            line_feed_new_line: false,
            origin: false,
            autowrap: true,
            reverse_video: false,
            application_cursor_keys: false,
            application_keypad: false,
            cursor_visible: true,
            save_lines_on_clear: false,
            bracketed_paste: false,
            mouse_tracking: MouseTracking::None,
            alternate_screen: false,
        }
    }

    /// Reset to power-on defaults, preserving the configured clear policy.
    pub fn reset(&mut self) {
        let save_lines_on_clear = self.save_lines_on_clear;
        *self = Self::new();
        self.save_lines_on_clear = save_lines_on_clear;
    }
}

impl Default for Modes {
    fn default() -> Self {
        Self::new()
    }
}

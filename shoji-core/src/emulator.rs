//! Emulator variants and action dispatch
//!
//! The parser reduces bytes to actions; this module decides what each
//! action means for the screen, gated by the active emulator variant.
//! Unsupported or malformed sequences are absorbed silently and counted;
//! the count drives the one-shot `ExcessiveErrors` notification.

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;

use shoji_parser::{Action, CsiAction, DcsAction, EscAction, OscAction, Params};

use crate::attr::LineAttr;
use crate::charset::Charset;
use crate::color::Color;
use crate::cursor::CursorStyle;
use crate::event::Event;
use crate::palette::parse_color_spec;
use crate::screen::Screen;

/// Terminal family; variants within a family share most dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmulatorFamily {
    Vt,
    XTerm,
    Ansi,
    Dumb,
}

/// The supported emulator variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Emulator {
    Vt100,
    Vt102,
    Vt220,
    Vt320,
    Vt420,
    XTerm,
    XTermColor,
    #[default]
    XTerm256Color,
    AnsiBbs,
    AnsiSco,
    Dumb,
}

impl Emulator {
    pub fn family(self) -> EmulatorFamily {
        match self {
            Emulator::Vt100 | Emulator::Vt102 | Emulator::Vt220 | Emulator::Vt320 | Emulator::Vt420 => {
                EmulatorFamily::Vt
            }
            Emulator::XTerm | Emulator::XTermColor | Emulator::XTerm256Color => EmulatorFamily::XTerm,
            Emulator::AnsiBbs | Emulator::AnsiSco => EmulatorFamily::Ansi,
            Emulator::Dumb => EmulatorFamily::Dumb,
        }
    }

    /// DEC hardware level for the VT family.
    pub fn vt_level(self) -> Option<u16> {
        match self {
            Emulator::Vt100 => Some(100),
            Emulator::Vt102 => Some(102),
            Emulator::Vt220 => Some(220),
            Emulator::Vt320 => Some(320),
            Emulator::Vt420 => Some(420),
            _ => None,
        }
    }

    /// Whether the variant advertises color to applications (terminfo
    /// capability, not an SGR gate - color sequences are always parsed).
    pub fn supports_color(self) -> bool {
        matches!(
            self,
            Emulator::XTermColor | Emulator::XTerm256Color | Emulator::AnsiBbs | Emulator::AnsiSco
        )
    }

    /// Whether OSC 4 palette assignment is honored.
    pub fn supports_palette(self) -> bool {
        self == Emulator::XTerm256Color
    }

    /// VT220-class features: DECSCUSR, DECSCA, DECRQSS, DECUDK.
    pub fn supports_vt220_features(self) -> bool {
        match self.family() {
            EmulatorFamily::XTerm => true,
            EmulatorFamily::Vt => self.vt_level().is_some_and(|level| level >= 220),
            _ => false,
        }
    }

    /// The canonical configuration name.
    pub fn default_name(self) -> &'static str {
        match self {
            Emulator::Vt100 => "vt100",
            Emulator::Vt102 => "vt102",
            Emulator::Vt220 => "vt220",
            Emulator::Vt320 => "vt320",
            Emulator::Vt420 => "vt420",
            Emulator::XTerm => "xterm",
            Emulator::XTermColor => "xterm-color",
            Emulator::XTerm256Color => "xterm-256color",
            Emulator::AnsiBbs => "ansi-bbs",
            Emulator::AnsiSco => "ansi-sco",
            Emulator::Dumb => "dumb",
        }
    }

    /// Look up an emulator by its canonical name.
    pub fn for_name(name: &str) -> Option<Self> {
        let all = [
            Emulator::Vt100,
            Emulator::Vt102,
            Emulator::Vt220,
            Emulator::Vt320,
            Emulator::Vt420,
            Emulator::XTerm,
            Emulator::XTermColor,
            Emulator::XTerm256Color,
            Emulator::AnsiBbs,
            Emulator::AnsiSco,
            Emulator::Dumb,
        ];
        all.into_iter().find(|e| e.default_name() == name)
    }
}

/// Process-wide rendering overrides for the dumb emulator. Installed once
/// before any dumb screen runs; read-only afterwards.
static DUMB_RENDERINGS: OnceLock<HashMap<u8, String>> = OnceLock::new();

/// Install the dumb-terminal byte descriptions. Returns false when the
/// table was already installed (the first installation wins).
pub fn set_dumb_terminal_renderings(overrides: HashMap<u8, String>) -> bool {
    DUMB_RENDERINGS.set(overrides).is_ok()
}

/// Textual description of one byte for dumb-terminal output.
pub(crate) fn dumb_rendering(byte: u8) -> String {
    if let Some(map) = DUMB_RENDERINGS.get() {
        if let Some(text) = map.get(&byte) {
            return text.clone();
        }
    }
    match byte {
        0x20..=0x7E => (byte as char).to_string(),
        0x7F => "^?".to_string(),
        0x00..=0x1F => format!("^{}", (byte + 0x40) as char),
        _ => format!("<{byte:02X}>"),
    }
}

impl Screen {
    /// Interpret one parser action against the current variant.
    pub(crate) fn apply_action(&mut self, action: Action) {
        match action {
            Action::Print(ch) => self.print_char(ch),
            Action::Control(byte) => self.apply_control(byte),
            Action::Esc(esc) => self.apply_esc(esc),
            Action::Csi(csi) => self.apply_csi(csi),
            Action::Osc(osc) => self.apply_osc(osc),
            Action::Dcs(dcs) => self.apply_dcs(dcs),
            Action::Apc(_) | Action::Pm(_) | Action::Sos(_) => {
                // Consumed without effect
            }
        }
    }

    fn apply_control(&mut self, byte: u8) {
        match byte {
            0x07 => self.bell(),
            0x08 => self.backspace(),
            0x09 => self.tab(),
            0x0A | 0x0B | 0x0C => self.linefeed(),
            0x0D => self.carriage_return(),
            0x0E => self.charset.shift_out(),
            0x0F => self.charset.shift_in(),
            _ => {}
        }
    }

    fn apply_esc(&mut self, esc: EscAction) {
        match esc {
            EscAction::SaveCursor => self.save_cursor(),
            EscAction::RestoreCursor => self.restore_cursor(),
            EscAction::Index => self.index(),
            EscAction::ReverseIndex => self.reverse_index(),
            EscAction::NextLine => self.next_line(),
            EscAction::HorizontalTabSet => self.set_tab_stop(),
            EscAction::FullReset => {
                self.full_reset();
                self.fire(Event::Reset);
            }
            EscAction::ApplicationKeypad => self.modes.application_keypad = true,
            EscAction::NormalKeypad => self.modes.application_keypad = false,
            EscAction::SingleShift2 => self.charset.single_shift(2),
            EscAction::SingleShift3 => self.charset.single_shift(3),
            EscAction::LockShiftG2 => self.charset.lock_shift_gl(2),
            EscAction::LockShiftG3 => self.charset.lock_shift_gl(3),
            EscAction::Designate { slot, designation } => {
                match Charset::from_designation(designation) {
                    Some(charset) => self.charset.designate(slot, charset),
                    None => {
                        debug!("unknown charset designation {designation:?}");
                        self.note_error();
                    }
                }
            }
            EscAction::AlignmentTest => self.alignment_test(),
            EscAction::DoubleHeightTop => self.set_line_attr(LineAttr::DoubleHeightTop),
            EscAction::DoubleHeightBottom => self.set_line_attr(LineAttr::DoubleHeightBottom),
            EscAction::SingleWidthLine => self.set_line_attr(LineAttr::Single),
            EscAction::DoubleWidthLine => self.set_line_attr(LineAttr::DoubleWidth),
            EscAction::Unknown(raw) => {
                debug!("unhandled ESC sequence {raw:?}");
                self.note_error();
            }
        }
    }

    fn apply_csi(&mut self, csi: CsiAction) {
        match csi.marker {
            0 => {}
            b'?' => {
                self.apply_csi_private(&csi);
                return;
            }
            b'>' => {
                if csi.final_byte == b'c' {
                    self.secondary_device_attributes();
                } else {
                    debug!("unhandled CSI > final {:?}", csi.final_byte as char);
                    self.note_error();
                }
                return;
            }
            _ => {
                debug!("unhandled CSI marker {:?}", csi.marker as char);
                self.note_error();
                return;
            }
        }
        if !csi.intermediates.is_empty() {
            self.apply_csi_intermediate(&csi);
            return;
        }
        self.apply_csi_standard(&csi);
    }

    fn apply_csi_standard(&mut self, csi: &CsiAction) {
        let count = usize::from(csi.param_or(0, 1));
        match csi.final_byte {
            b'A' => self.move_cursor_up(count),
            b'B' | b'e' => self.move_cursor_down(count),
            b'C' | b'a' => self.move_cursor_right(count),
            b'D' => self.move_cursor_left(count),
            b'E' => {
                self.move_cursor_down(count);
                self.carriage_return();
            }
            b'F' => {
                self.move_cursor_up(count);
                self.carriage_return();
            }
            b'G' | b'`' => self.move_cursor_to_column(count - 1),
            b'd' => self.move_cursor_to_row(count - 1),
            b'H' | b'f' => {
                let row = usize::from(csi.param_or(0, 1)) - 1;
                let col = usize::from(csi.param_or(1, 1)) - 1;
                self.move_cursor_to(row, col);
            }
            b'J' => self.erase_display(csi.params.raw(0)),
            b'K' => self.erase_line(csi.params.raw(0)),
            b'X' => self.erase_chars(count),
            b'@' => self.insert_chars(count),
            b'P' => self.delete_chars(count),
            b'L' => self.insert_lines(count),
            b'M' => self.delete_lines(count),
            b'S' => self.scroll_up_in_region(count),
            b'T' => self.scroll_down_in_region(count),
            b'r' => {
                let top = csi.param_or(0, 1);
                let bottom = csi.param_or(1, self.rows() as u16);
                self.set_scroll_region(top, bottom);
            }
            b'm' => self.apply_sgr(&csi.params),
            b'h' => {
                for param in csi.params.iter() {
                    self.set_ansi_mode(param, true);
                }
            }
            b'l' => {
                for param in csi.params.iter() {
                    self.set_ansi_mode(param, false);
                }
            }
            b's' => self.save_cursor(),
            b'u' => self.restore_cursor(),
            b'g' => self.clear_tab_stop(csi.params.raw(0)),
            b'c' => self.primary_device_attributes(),
            b'n' => self.device_status_report(csi.params.raw(0)),
            b'q' => {
                for param in csi.params.iter() {
                    self.load_leds(param);
                }
                if csi.params.is_empty() {
                    self.load_leds(0);
                }
            }
            b't' => self.window_operation(csi.params.raw(0)),
            _ => {
                debug!(
                    "unhandled CSI final {:?} params {:?}",
                    csi.final_byte as char, csi.params
                );
                self.note_error();
            }
        }
    }

    fn apply_csi_private(&mut self, csi: &CsiAction) {
        let set = match csi.final_byte {
            b'h' => true,
            b'l' => false,
            _ => {
                debug!("unhandled private CSI final {:?}", csi.final_byte as char);
                self.note_error();
                return;
            }
        };
        for param in csi.params.iter() {
            self.set_dec_private_mode(param, set);
        }
    }

    fn apply_csi_intermediate(&mut self, csi: &CsiAction) {
        match (csi.intermediates.as_slice(), csi.final_byte) {
            ([b' '], b'q') => {
                if self.emulator.supports_vt220_features() {
                    self.set_cursor_style(csi.params.raw(0));
                } else {
                    self.note_error();
                }
            }
            ([b'!'], b'p') => self.soft_reset(),
            ([b'"'], b'q') => {
                if self.emulator.supports_vt220_features() {
                    self.cursor.attrs.protected = csi.params.raw(0) == 1;
                } else {
                    self.note_error();
                }
            }
            _ => {
                debug!(
                    "unhandled CSI intermediates {:?} final {:?}",
                    csi.intermediates, csi.final_byte as char
                );
                self.note_error();
            }
        }
    }

    fn set_cursor_style(&mut self, param: u16) {
        self.cursor.style = match param {
            0 | 1 | 2 => CursorStyle::Block,
            3 | 4 => CursorStyle::Underline,
            5 | 6 => CursorStyle::Bar,
            _ => {
                self.note_error();
                return;
            }
        };
    }

    fn set_ansi_mode(&mut self, param: u16, set: bool) {
        match param {
            4 => self.modes.insert = set,
            20 => {
                self.modes.line_feed_new_line = set;
                self.fire(Event::LineFeedNewLineMode { enabled: set });
            }
            _ => {
                debug!("unknown ANSI mode {param}");
                self.note_error();
            }
        }
    }

    fn set_dec_private_mode(&mut self, param: u16, set: bool) {
        use crate::modes::MouseTracking;
        match param {
            1 => self.modes.application_cursor_keys = set,
            5 => {
                if self.modes.reverse_video != set {
                    self.modes.reverse_video = set;
                    self.fire(Event::VideoMode { reverse: set });
                    self.note_full_screen_edit();
                }
            }
            6 => {
                self.modes.origin = set;
                self.move_cursor_to(0, 0);
            }
            7 => self.set_line_wrap_enabled(set),
            9 => {
                self.modes.mouse_tracking = if set {
                    MouseTracking::X10
                } else {
                    MouseTracking::None
                };
            }
            25 => {
                self.modes.cursor_visible = set;
                self.cursor.visible = set;
                self.note_cursor_visibility(set);
            }
            47 => {
                if set {
                    self.enter_alternate_screen(false);
                } else {
                    self.exit_alternate_screen();
                }
            }
            66 => self.modes.application_keypad = set,
            1000 => {
                self.modes.mouse_tracking = if set {
                    MouseTracking::Vt200
                } else {
                    MouseTracking::None
                };
            }
            1002 => {
                self.modes.mouse_tracking = if set {
                    MouseTracking::ButtonEvent
                } else {
                    MouseTracking::None
                };
            }
            1003 => {
                self.modes.mouse_tracking = if set {
                    MouseTracking::AnyEvent
                } else {
                    MouseTracking::None
                };
            }
            1047 => {
                if set {
                    self.enter_alternate_screen(true);
                } else {
                    self.exit_alternate_screen();
                }
            }
            1048 => {
                if set {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            1049 => {
                if set {
                    self.save_cursor();
                    self.enter_alternate_screen(true);
                } else {
                    self.exit_alternate_screen();
                    self.restore_cursor();
                }
            }
            2004 => self.modes.bracketed_paste = set,
            _ => {
                debug!("unknown DEC private mode {param}");
                self.note_error();
            }
        }
    }

    fn window_operation(&mut self, param: u16) {
        if self.emulator.family() != EmulatorFamily::XTerm {
            self.note_error();
            return;
        }
        match param {
            1 => self.request_minimize(false),
            2 => self.request_minimize(true),
            _ => debug!("unhandled window operation {param}"),
        }
    }

    // ---- SGR -------------------------------------------------------------

    fn apply_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.cursor.attrs.reset_rendition();
            return;
        }
        let mut index = 0;
        while index < params.len() {
            let value = params.raw(index);
            let mut consumed = 1;
            match value {
                0 => self.cursor.attrs.reset_rendition(),
                1 => self.cursor.attrs.bold = true,
                2 => self.cursor.attrs.faint = true,
                3 => self.cursor.attrs.italic = true,
                4 => {
                    // 4:0 turns underline off through the subparameter form
                    let off = params.subparams(index).first() == Some(&0);
                    self.cursor.attrs.underline = !off;
                }
                5 | 6 => self.cursor.attrs.blink = true,
                7 => self.cursor.attrs.inverse = true,
                8 => self.cursor.attrs.concealed = true,
                21 | 22 => {
                    self.cursor.attrs.bold = false;
                    self.cursor.attrs.faint = false;
                }
                23 => self.cursor.attrs.italic = false,
                24 => self.cursor.attrs.underline = false,
                25 => self.cursor.attrs.blink = false,
                27 => self.cursor.attrs.inverse = false,
                28 => self.cursor.attrs.concealed = false,
                30..=37 => self.cursor.attrs.fg = Color::Indexed((value - 30) as u8),
                38 => {
                    let (color, used) = extended_color(params, index);
                    if let Some(color) = color {
                        self.cursor.attrs.fg = color;
                    }
                    consumed = used;
                }
                39 => self.cursor.attrs.fg = Color::Default,
                40..=47 => self.cursor.attrs.bg = Color::Indexed((value - 40) as u8),
                48 => {
                    let (color, used) = extended_color(params, index);
                    if let Some(color) = color {
                        self.cursor.attrs.bg = color;
                    }
                    consumed = used;
                }
                49 => self.cursor.attrs.bg = Color::Default,
                90..=97 => self.cursor.attrs.fg = Color::Indexed((value - 90 + 8) as u8),
                100..=107 => self.cursor.attrs.bg = Color::Indexed((value - 100 + 8) as u8),
                _ => debug!("unhandled SGR parameter {value}"),
            }
            index += consumed;
        }
    }

    // ---- talkback replies ------------------------------------------------

    fn primary_device_attributes(&mut self) {
        let reply: &[u8] = match self.emulator {
            Emulator::Vt100 => b"\x1b[?1;2c",
            Emulator::Vt102 => b"\x1b[?6c",
            Emulator::Vt220 => b"\x1b[?62;1;6c",
            Emulator::Vt320 => b"\x1b[?63;1;6c",
            Emulator::Vt420 => b"\x1b[?64;1;6c",
            Emulator::XTerm | Emulator::XTermColor | Emulator::XTerm256Color => b"\x1b[?62;1;6c",
            Emulator::AnsiBbs | Emulator::AnsiSco => b"\x1b[?1;0c",
            Emulator::Dumb => return,
        };
        self.send_reply(reply);
    }

    fn secondary_device_attributes(&mut self) {
        if !self.emulator.supports_vt220_features() {
            self.note_error();
            return;
        }
        let id = match self.emulator.family() {
            EmulatorFamily::XTerm => 0,
            _ => 1,
        };
        let reply = format!("\x1b[>{id};95;0c");
        self.send_reply(reply.as_bytes());
    }

    fn device_status_report(&mut self, param: u16) {
        match param {
            5 => self.send_reply(b"\x1b[0n"),
            6 => {
                let (top, _) = self.scroll_region();
                let row = if self.modes.origin {
                    self.cursor.row.saturating_sub(top) + 1
                } else {
                    self.cursor.row + 1
                };
                let col = self.cursor.col + 1;
                let reply = format!("\x1b[{row};{col}R");
                self.send_reply(reply.as_bytes());
            }
            _ => {
                debug!("unhandled DSR parameter {param}");
                self.note_error();
            }
        }
    }

    // ---- OSC -------------------------------------------------------------

    fn apply_osc(&mut self, osc: OscAction) {
        match osc {
            OscAction::SetWindowAndIconTitle(title) => {
                self.set_icon_title(&title);
                self.set_window_title(&title);
            }
            OscAction::SetIconTitle(title) => self.set_icon_title(&title),
            OscAction::SetWindowTitle(title) => self.set_window_title(&title),
            OscAction::SetPaletteColor { index, spec } => {
                if !self.emulator.supports_palette() {
                    debug!("palette assignment ignored by {:?}", self.emulator);
                    self.note_error();
                    return;
                }
                match parse_color_spec(&spec) {
                    Some(color) => {
                        if self.set_palette_color(index, color).is_err() {
                            self.note_error();
                        }
                    }
                    None => {
                        debug!("unparsable color specification {spec:?}");
                        self.note_error();
                    }
                }
            }
            OscAction::ResetPaletteColor(Some(index)) => {
                if self.emulator.supports_palette() && self.palette.reset_entry(index).is_ok() {
                    let color = self.palette.entry(index).expect("valid index");
                    self.fire(Event::XtermColor(crate::event::XtermColorDescription {
                        index,
                        color,
                    }));
                }
            }
            OscAction::ResetPaletteColor(None) => {
                if self.emulator.supports_palette() {
                    self.palette.reset_all();
                }
            }
            OscAction::Clipboard { payload, .. } => {
                if self.allow_clipboard_write {
                    self.store_clipboard_write(payload);
                } else {
                    debug!("clipboard write denied by policy");
                }
            }
            OscAction::SetForegroundColor(_)
            | OscAction::SetBackgroundColor(_)
            | OscAction::SetCursorColor(_)
            | OscAction::ResetForegroundColor
            | OscAction::ResetBackgroundColor
            | OscAction::ResetCursorColor => {
                // Dynamic colors belong to the view layer
            }
            OscAction::Unknown { selector: 13..=19, .. } => {
                // Remaining dynamic-color selectors, also view-layer
            }
            OscAction::Unknown { selector, payload } => {
                debug!("unhandled OSC {selector}: {payload:?}");
                self.note_error();
            }
        }
    }

    // ---- DCS -------------------------------------------------------------

    fn apply_dcs(&mut self, dcs: DcsAction) {
        if !self.emulator.supports_vt220_features() {
            self.note_error();
            return;
        }
        match (dcs.intermediates.as_slice(), dcs.final_byte) {
            ([b'$'], b'q') => self.status_string_request(&dcs.data),
            ([], b'|') => self.program_user_defined_keys(&dcs.params, &dcs.data),
            _ => {
                debug!(
                    "unhandled DCS intermediates {:?} final {:?}",
                    dcs.intermediates, dcs.final_byte as char
                );
                self.note_error();
            }
        }
    }

    /// DECRQSS: report a setting back as a DCS string.
    fn status_string_request(&mut self, selector: &[u8]) {
        let value = match selector {
            b"m" => Some(format!("{}m", self.current_sgr_parameters())),
            b"r" => {
                let (top, bottom) = self.scroll_region();
                Some(format!("{};{}r", top + 1, bottom))
            }
            b" q" => {
                let style = match self.cursor.style {
                    CursorStyle::Block => 2,
                    CursorStyle::Underline => 4,
                    CursorStyle::Bar => 6,
                };
                Some(format!("{style} q"))
            }
            _ => None,
        };
        let reply = match value {
            Some(value) => format!("\x1bP1$r{value}\x1b\\"),
            None => "\x1bP0$r\x1b\\".to_string(),
        };
        self.send_reply(reply.as_bytes());
    }

    fn current_sgr_parameters(&self) -> String {
        let attrs = self.cursor.attrs;
        let mut parts = vec!["0".to_string()];
        if attrs.bold {
            parts.push("1".into());
        }
        if attrs.faint {
            parts.push("2".into());
        }
        if attrs.italic {
            parts.push("3".into());
        }
        if attrs.underline {
            parts.push("4".into());
        }
        if attrs.blink {
            parts.push("5".into());
        }
        if attrs.inverse {
            parts.push("7".into());
        }
        if attrs.concealed {
            parts.push("8".into());
        }
        match attrs.fg {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push(format!("{}", 30 + u16::from(i))),
            Color::Indexed(i) if i < 16 => parts.push(format!("{}", 90 + u16::from(i) - 8)),
            Color::Indexed(i) => parts.push(format!("38;5;{i}")),
            Color::Rgb { r, g, b } => parts.push(format!("38;2;{r};{g};{b}")),
        }
        match attrs.bg {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push(format!("{}", 40 + u16::from(i))),
            Color::Indexed(i) if i < 16 => parts.push(format!("{}", 100 + u16::from(i) - 8)),
            Color::Indexed(i) => parts.push(format!("48;5;{i}")),
            Color::Rgb { r, g, b } => parts.push(format!("48;2;{r};{g};{b}")),
        }
        parts.join(";")
    }

    /// DECUDK: `clear;lock| key/hex ; key/hex ...`
    fn program_user_defined_keys(&mut self, params: &Params, data: &[u8]) {
        if params.raw(0) == 0 {
            self.udk.clear();
        }
        for entry in data.split(|&b| b == b';') {
            if entry.is_empty() {
                continue;
            }
            let Some(slash) = entry.iter().position(|&b| b == b'/') else {
                self.note_error();
                continue;
            };
            let key = match std::str::from_utf8(&entry[..slash])
                .ok()
                .and_then(|s| s.parse::<u16>().ok())
            {
                Some(key) => key,
                None => {
                    self.note_error();
                    continue;
                }
            };
            match decode_hex(&entry[slash + 1..]) {
                Some(bytes) => {
                    self.udk.insert(key, bytes);
                }
                None => self.note_error(),
            }
        }
    }

    /// Bytes programmed for a user-defined key, if any.
    pub fn user_defined_key(&self, key: u16) -> Option<&[u8]> {
        self.udk.get(&key).map(Vec::as_slice)
    }
}

/// Decode the 38/48 extended color forms, returning the parsed color and
/// the number of parameter positions consumed.
fn extended_color(params: &Params, index: usize) -> (Option<Color>, usize) {
    let subs = params.subparams(index);
    if !subs.is_empty() {
        // Colon form: 38:5:n or 38:2[:colorspace]:r:g:b
        return match subs.first().copied() {
            Some(5) if subs.len() >= 2 => (Some(Color::Indexed(subs[1].min(255) as u8)), 1),
            Some(2) if subs.len() >= 4 => {
                let rgb = &subs[subs.len() - 3..];
                (
                    Some(Color::rgb(
                        rgb[0].min(255) as u8,
                        rgb[1].min(255) as u8,
                        rgb[2].min(255) as u8,
                    )),
                    1,
                )
            }
            _ => (None, 1),
        };
    }
    match params.raw(index + 1) {
        5 if params.len() > index + 2 => (
            Some(Color::Indexed(params.raw(index + 2).min(255) as u8)),
            3,
        ),
        2 if params.len() > index + 4 => (
            Some(Color::rgb(
                params.raw(index + 2).min(255) as u8,
                params.raw(index + 3).min(255) as u8,
                params.raw(index + 4).min(255) as u8,
            )),
            5,
        ),
        _ => (None, 1),
    }
}

fn decode_hex(digits: &[u8]) -> Option<Vec<u8>> {
    if digits.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        let text = std::str::from_utf8(pair).ok()?;
        bytes.push(u8::from_str_radix(text, 16).ok()?);
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulator_names_round_trip() {
        for name in [
            "vt100",
            "vt102",
            "vt220",
            "vt320",
            "vt420",
            "xterm",
            "xterm-color",
            "xterm-256color",
            "ansi-bbs",
            "ansi-sco",
            "dumb",
        ] {
            let emulator = Emulator::for_name(name).unwrap();
            assert_eq!(emulator.default_name(), name);
        }
        assert_eq!(Emulator::for_name("vt52"), None);
    }

    #[test]
    fn test_family_partition() {
        assert_eq!(Emulator::Vt320.family(), EmulatorFamily::Vt);
        assert_eq!(Emulator::XTermColor.family(), EmulatorFamily::XTerm);
        assert_eq!(Emulator::AnsiSco.family(), EmulatorFamily::Ansi);
        assert_eq!(Emulator::Dumb.family(), EmulatorFamily::Dumb);
    }

    #[test]
    fn test_feature_gates() {
        assert!(!Emulator::Vt100.supports_color());
        assert!(Emulator::XTermColor.supports_color());
        assert!(!Emulator::XTermColor.supports_palette());
        assert!(Emulator::XTerm256Color.supports_palette());
        assert!(!Emulator::Vt102.supports_vt220_features());
        assert!(Emulator::Vt220.supports_vt220_features());
        assert!(Emulator::XTerm.supports_vt220_features());
    }

    #[test]
    fn test_default_dumb_renderings() {
        assert_eq!(dumb_rendering(b'A'), "A");
        assert_eq!(dumb_rendering(0x07), "^G");
        assert_eq!(dumb_rendering(0x7F), "^?");
        assert_eq!(dumb_rendering(0xA0), "<A0>");
    }

    #[test]
    fn test_extended_color_semicolon_forms() {
        let params = Params::parse(b"38;5;123");
        assert_eq!(
            extended_color(&params, 0),
            (Some(Color::Indexed(123)), 3)
        );
        let params = Params::parse(b"48;2;10;20;30");
        assert_eq!(extended_color(&params, 0), (Some(Color::rgb(10, 20, 30)), 5));
    }

    #[test]
    fn test_extended_color_colon_forms() {
        let params = Params::parse(b"38:5:99");
        assert_eq!(extended_color(&params, 0), (Some(Color::Indexed(99)), 1));
        let params = Params::parse(b"38:2:1:2:3");
        assert_eq!(extended_color(&params, 0), (Some(Color::rgb(1, 2, 3)), 1));
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex(b"414243"), Some(b"ABC".to_vec()));
        assert_eq!(decode_hex(b"41424"), None);
        assert_eq!(decode_hex(b"zz"), None);
    }
}

//! Escape sequence state machine
//!
//! Follows the VT500 series parser model (see the DEC ANSI parser state
//! diagram): a ground state for printable text, escape and CSI states with
//! parameter/intermediate collection, and string states for OSC/DCS/APC/PM/
//! SOS payloads. CAN and SUB abort any sequence; ESC inside a string
//! terminates the string and begins a new sequence, which makes the
//! two-byte string terminator (ESC \) fall out naturally.

use crate::action::{parse_osc, Action, CsiAction, DcsAction, EscAction};
use crate::encoding::TextEncoding;
use crate::params::Params;
use crate::utf8::{Utf8Decoder, Utf8Result};

/// Cap on collected OSC/DCS payloads, to bound hostile input.
const MAX_STRING_LEN: usize = 65536;
/// Cap on intermediate bytes in a single sequence.
const MAX_INTERMEDIATES: usize = 2;

/// Lexer state, one variant per node of the VT500 diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    ApcString,
    PmString,
    SosString,
}

/// The byte-stream parser. State persists across `parse` calls, so input
/// may be chunked at arbitrary boundaries.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    state: ParserState,
    encoding: TextEncoding,
    utf8: Utf8Decoder,
    param_bytes: Vec<u8>,
    intermediates: Vec<u8>,
    marker: u8,
    string_data: Vec<u8>,
    dcs_final: u8,
    /// Sequences discarded as malformed since the last counter read
    dropped: u32,
}

impl Parser {
    pub fn new() -> Self {
        Self::with_encoding(TextEncoding::Utf8)
    }

    pub fn with_encoding(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Number of malformed or aborted sequences seen, cleared on read.
    pub fn take_dropped(&mut self) -> u32 {
        std::mem::take(&mut self.dropped)
    }

    /// Return to ground and discard any partial sequence.
    pub fn reset(&mut self) {
        let encoding = self.encoding;
        *self = Self::with_encoding(encoding);
    }

    /// Consume `data`, invoking `emit` for every completed action.
    pub fn parse<F>(&mut self, data: &[u8], mut emit: F)
    where
        F: FnMut(Action),
    {
        for &byte in data {
            self.step(byte, &mut emit);
        }
    }

    /// Convenience wrapper collecting actions into a vector.
    pub fn parse_collect(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        self.parse(data, |action| actions.push(action));
        actions
    }

    fn step<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        // String states swallow almost everything until a terminator.
        if self.in_string_state() {
            self.step_string(byte, emit);
            return;
        }

        // C0 controls execute from any non-string state.
        if byte < 0x20 {
            match byte {
                0x1B => self.enter_escape(),
                0x18 | 0x1A => self.abort_sequence(),
                0x07..=0x0F => emit(Action::Control(byte)),
                _ => {}
            }
            return;
        }

        // 8-bit C1 introducers, when they cannot be UTF-8 continuations.
        if (0x80..=0x9F).contains(&byte)
            && (self.encoding != TextEncoding::Utf8 || !self.utf8.in_progress())
        {
            match byte {
                0x90 => self.enter_dcs(),
                0x98 => self.enter_string(ParserState::SosString),
                0x9B => self.enter_csi(),
                0x9D => self.enter_string(ParserState::OscString),
                0x9E => self.enter_string(ParserState::PmString),
                0x9F => self.enter_string(ParserState::ApcString),
                _ => {}
            }
            return;
        }

        match self.state {
            ParserState::Ground => self.step_ground(byte, emit),
            ParserState::Escape => self.step_escape(byte, emit),
            ParserState::EscapeIntermediate => self.step_escape_intermediate(byte, emit),
            ParserState::CsiEntry => self.step_csi_entry(byte, emit),
            ParserState::CsiParam => self.step_csi_param(byte, emit),
            ParserState::CsiIntermediate => self.step_csi_intermediate(byte, emit),
            ParserState::CsiIgnore => {
                if (0x40..=0x7E).contains(&byte) {
                    self.state = ParserState::Ground;
                }
            }
            ParserState::DcsEntry => self.step_dcs_entry(byte),
            ParserState::DcsParam => self.step_dcs_param(byte),
            ParserState::DcsIntermediate => self.step_dcs_intermediate(byte),
            ParserState::DcsIgnore => {}
            // String states handled above
            _ => {}
        }
    }

    fn in_string_state(&self) -> bool {
        matches!(
            self.state,
            ParserState::OscString
                | ParserState::DcsPassthrough
                | ParserState::DcsIgnore
                | ParserState::ApcString
                | ParserState::PmString
                | ParserState::SosString
        )
    }

    fn step_ground<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        if byte < 0x80 {
            // 0x20..=0x7F: printable ASCII (DEL prints nothing useful but is
            // traditionally ignored)
            if byte != 0x7F {
                emit(Action::Print(byte as char));
            }
            return;
        }
        match self.encoding {
            TextEncoding::Utf8 => match self.utf8.push(byte) {
                Utf8Result::Scalar(c) => emit(Action::Print(c)),
                Utf8Result::Malformed => emit(Action::Print(Utf8Decoder::REPLACEMENT)),
                Utf8Result::Pending => {}
            },
            TextEncoding::Latin1 => {
                if byte >= 0xA0 {
                    emit(Action::Print(byte as char));
                }
            }
            TextEncoding::Ascii => emit(Action::Print(Utf8Decoder::REPLACEMENT)),
        }
    }

    fn abort_sequence(&mut self) {
        if self.state != ParserState::Ground {
            self.dropped = self.dropped.saturating_add(1);
        }
        self.state = ParserState::Ground;
        self.string_data.clear();
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.intermediates.clear();
        self.utf8.reset();
    }

    fn step_escape<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'[' => self.enter_csi(),
            b']' => self.enter_string(ParserState::OscString),
            b'P' => self.enter_dcs(),
            b'X' => self.enter_string(ParserState::SosString),
            b'^' => self.enter_string(ParserState::PmString),
            b'_' => self.enter_string(ParserState::ApcString),
            b'\\' => {
                // Stray ST outside a string
                self.state = ParserState::Ground;
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::EscapeIntermediate;
            }
            0x30..=0x7E => {
                self.dispatch_escape(byte, emit);
                self.state = ParserState::Ground;
            }
            _ => {
                self.dropped = self.dropped.saturating_add(1);
                self.state = ParserState::Ground;
            }
        }
    }

    fn step_escape_intermediate<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                }
            }
            0x30..=0x7E => {
                self.dispatch_escape(byte, emit);
                self.state = ParserState::Ground;
            }
            _ => {
                self.dropped = self.dropped.saturating_add(1);
                self.state = ParserState::Ground;
            }
        }
    }

    fn dispatch_escape<F>(&mut self, final_byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        let action = match (self.intermediates.as_slice(), final_byte) {
            ([], b'7') => EscAction::SaveCursor,
            ([], b'8') => EscAction::RestoreCursor,
            ([], b'D') => EscAction::Index,
            ([], b'M') => EscAction::ReverseIndex,
            ([], b'E') => EscAction::NextLine,
            ([], b'H') => EscAction::HorizontalTabSet,
            ([], b'c') => EscAction::FullReset,
            ([], b'=') => EscAction::ApplicationKeypad,
            ([], b'>') => EscAction::NormalKeypad,
            ([], b'N') => EscAction::SingleShift2,
            ([], b'O') => EscAction::SingleShift3,
            ([], b'n') => EscAction::LockShiftG2,
            ([], b'o') => EscAction::LockShiftG3,
            ([b'('], c) => EscAction::Designate {
                slot: 0,
                designation: c as char,
            },
            ([b')'], c) => EscAction::Designate {
                slot: 1,
                designation: c as char,
            },
            ([b'*'], c) => EscAction::Designate {
                slot: 2,
                designation: c as char,
            },
            ([b'+'], c) => EscAction::Designate {
                slot: 3,
                designation: c as char,
            },
            ([b'#'], b'3') => EscAction::DoubleHeightTop,
            ([b'#'], b'4') => EscAction::DoubleHeightBottom,
            ([b'#'], b'5') => EscAction::SingleWidthLine,
            ([b'#'], b'6') => EscAction::DoubleWidthLine,
            ([b'#'], b'8') => EscAction::AlignmentTest,
            _ => {
                let mut raw = self.intermediates.clone();
                raw.push(final_byte);
                EscAction::Unknown(raw)
            }
        };
        emit(Action::Esc(action));
    }

    fn enter_csi(&mut self) {
        self.state = ParserState::CsiEntry;
        self.param_bytes.clear();
        self.intermediates.clear();
        self.marker = 0;
    }

    fn step_csi_entry<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'?' | b'>' | b'<' | b'=' => {
                self.marker = byte;
                self.state = ParserState::CsiParam;
            }
            b'0'..=b'9' | b';' | b':' => {
                self.param_bytes.push(byte);
                self.state = ParserState::CsiParam;
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte, emit);
                self.state = ParserState::Ground;
            }
            _ => {
                self.dropped = self.dropped.saturating_add(1);
                self.state = ParserState::CsiIgnore;
            }
        }
    }

    fn step_csi_param<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            b'0'..=b'9' | b';' | b':' => self.param_bytes.push(byte),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte, emit);
                self.state = ParserState::Ground;
            }
            _ => {
                // Marker bytes are only legal immediately after the CSI
                self.dropped = self.dropped.saturating_add(1);
                self.state = ParserState::CsiIgnore;
            }
        }
    }

    fn step_csi_intermediate<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                } else {
                    self.dropped = self.dropped.saturating_add(1);
                    self.state = ParserState::CsiIgnore;
                }
            }
            0x40..=0x7E => {
                self.dispatch_csi(byte, emit);
                self.state = ParserState::Ground;
            }
            _ => {
                self.dropped = self.dropped.saturating_add(1);
                self.state = ParserState::CsiIgnore;
            }
        }
    }

    fn dispatch_csi<F>(&mut self, final_byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        emit(Action::Csi(CsiAction {
            params: Params::parse(&self.param_bytes),
            intermediates: self.intermediates.clone(),
            final_byte,
            marker: self.marker,
        }));
    }

    fn enter_dcs(&mut self) {
        self.state = ParserState::DcsEntry;
        self.param_bytes.clear();
        self.intermediates.clear();
        self.string_data.clear();
        self.dcs_final = 0;
    }

    fn step_dcs_entry(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' | b';' | b':' => {
                self.param_bytes.push(byte);
                self.state = ParserState::DcsParam;
            }
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::DcsIntermediate;
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.state = ParserState::DcsPassthrough;
            }
            _ => self.state = ParserState::DcsIgnore,
        }
    }

    fn step_dcs_param(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' | b';' | b':' => self.param_bytes.push(byte),
            0x20..=0x2F => {
                self.intermediates.push(byte);
                self.state = ParserState::DcsIntermediate;
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.state = ParserState::DcsPassthrough;
            }
            _ => self.state = ParserState::DcsIgnore,
        }
    }

    fn step_dcs_intermediate(&mut self, byte: u8) {
        match byte {
            0x20..=0x2F => {
                if self.intermediates.len() < MAX_INTERMEDIATES {
                    self.intermediates.push(byte);
                } else {
                    self.state = ParserState::DcsIgnore;
                }
            }
            0x40..=0x7E => {
                self.dcs_final = byte;
                self.state = ParserState::DcsPassthrough;
            }
            _ => self.state = ParserState::DcsIgnore,
        }
    }

    fn enter_string(&mut self, state: ParserState) {
        self.state = state;
        self.string_data.clear();
    }

    fn step_string<F>(&mut self, byte: u8, emit: &mut F)
    where
        F: FnMut(Action),
    {
        match byte {
            0x1B => {
                // Either ST (ESC \) or the start of an unrelated sequence;
                // both end the string. The Escape state sorts out which.
                self.finish_string(emit);
                self.enter_escape();
            }
            0x9C => self.finish_string_to_ground(emit),
            0x07 if self.state == ParserState::OscString => self.finish_string_to_ground(emit),
            0x18 | 0x1A => self.abort_sequence(),
            _ => {
                if self.string_data.len() < MAX_STRING_LEN {
                    self.string_data.push(byte);
                }
            }
        }
    }

    fn finish_string_to_ground<F>(&mut self, emit: &mut F)
    where
        F: FnMut(Action),
    {
        self.finish_string(emit);
        self.state = ParserState::Ground;
    }

    fn finish_string<F>(&mut self, emit: &mut F)
    where
        F: FnMut(Action),
    {
        let data = std::mem::take(&mut self.string_data);
        match self.state {
            ParserState::OscString => emit(Action::Osc(parse_osc(&data))),
            ParserState::DcsPassthrough => emit(Action::Dcs(DcsAction {
                params: Params::parse(&self.param_bytes),
                intermediates: self.intermediates.clone(),
                final_byte: self.dcs_final,
                data,
            })),
            ParserState::DcsIgnore => {
                self.dropped = self.dropped.saturating_add(1);
            }
            ParserState::ApcString => emit(Action::Apc(data)),
            ParserState::PmString => emit(Action::Pm(data)),
            ParserState::SosString => emit(Action::Sos(data)),
            _ => {}
        }
    }
}

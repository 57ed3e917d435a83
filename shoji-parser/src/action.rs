//! Typed output of the parser
//!
//! Actions carry the syntactic content of a sequence; deciding what a
//! sequence *means* for the screen is the emulator's job.

use crate::params::Params;

/// One parsed unit of the input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A printable scalar value
    Print(char),
    /// A C0 control byte (BEL, BS, HT, LF, VT, FF, CR, SO, SI)
    Control(u8),
    /// An ESC sequence other than CSI/OSC/DCS introducers
    Esc(EscAction),
    /// A CSI sequence, final byte included
    Csi(CsiAction),
    /// An OSC string, dispatched by numeric selector
    Osc(OscAction),
    /// A DCS sequence with its passthrough payload
    Dcs(DcsAction),
    /// APC string, consumed and reported opaquely
    Apc(Vec<u8>),
    /// PM string, consumed and reported opaquely
    Pm(Vec<u8>),
    /// SOS string, consumed and reported opaquely
    Sos(Vec<u8>),
}

/// ESC dispatch (final byte with at most two intermediates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscAction {
    /// ESC 7 (DECSC)
    SaveCursor,
    /// ESC 8 (DECRC)
    RestoreCursor,
    /// ESC D (IND)
    Index,
    /// ESC M (RI)
    ReverseIndex,
    /// ESC E (NEL)
    NextLine,
    /// ESC H (HTS)
    HorizontalTabSet,
    /// ESC c (RIS)
    FullReset,
    /// ESC = (DECKPAM)
    ApplicationKeypad,
    /// ESC > (DECKPNM)
    NormalKeypad,
    /// ESC N (SS2)
    SingleShift2,
    /// ESC O (SS3)
    SingleShift3,
    /// ESC n / ESC o - lock G2/G3 into GL
    LockShiftG2,
    LockShiftG3,
    /// ESC ( ) * + with a designation character for slots G0..G3
    Designate { slot: u8, designation: char },
    /// ESC # 8 (DECALN)
    AlignmentTest,
    /// ESC # 3 / # 4 (DECDHL top and bottom halves)
    DoubleHeightTop,
    DoubleHeightBottom,
    /// ESC # 5 (DECSWL)
    SingleWidthLine,
    /// ESC # 6 (DECDWL)
    DoubleWidthLine,
    /// Anything else (intermediates + final byte)
    Unknown(Vec<u8>),
}

/// A complete CSI sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct CsiAction {
    pub params: Params,
    /// Intermediate bytes 0x20..=0x2F
    pub intermediates: Vec<u8>,
    /// Final byte 0x40..=0x7E
    pub final_byte: u8,
    /// Leading marker byte (b'?', b'>', b'<', b'=') or 0
    pub marker: u8,
}

impl CsiAction {
    /// First-position parameter defaulting to `default` when absent/zero.
    pub fn param_or(&self, index: usize, default: u16) -> u16 {
        self.params.get_or(index, default)
    }

    /// True for DEC private sequences (`CSI ?`).
    pub fn is_private(&self) -> bool {
        self.marker == b'?'
    }
}

/// A complete OSC string, split by its numeric selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OscAction {
    /// OSC 0 - window and icon title
    SetWindowAndIconTitle(String),
    /// OSC 1 - icon title
    SetIconTitle(String),
    /// OSC 2 - window title
    SetWindowTitle(String),
    /// OSC 4;index;spec - palette entry
    SetPaletteColor { index: u16, spec: String },
    /// OSC 10/11/12 - dynamic foreground/background/cursor colors
    SetForegroundColor(String),
    SetBackgroundColor(String),
    SetCursorColor(String),
    /// OSC 52;selection;base64 - clipboard write request
    Clipboard { selection: String, payload: String },
    /// OSC 104 - reset one palette entry (or all when absent)
    ResetPaletteColor(Option<u16>),
    /// OSC 110/111/112 - reset dynamic colors
    ResetForegroundColor,
    ResetBackgroundColor,
    ResetCursorColor,
    /// Unrecognized selector
    Unknown { selector: u16, payload: String },
}

/// A complete DCS sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct DcsAction {
    pub params: Params,
    /// Intermediate bytes between parameters and the final byte
    pub intermediates: Vec<u8>,
    /// Final byte that selected the control function
    pub final_byte: u8,
    /// Passthrough payload up to the string terminator
    pub data: Vec<u8>,
}

pub(crate) fn parse_osc(data: &[u8]) -> OscAction {
    let text = String::from_utf8_lossy(data);
    let (selector, payload) = match text.find(';') {
        Some(pos) => (text[..pos].parse::<u16>().unwrap_or(u16::MAX), &text[pos + 1..]),
        None => (text.parse::<u16>().unwrap_or(u16::MAX), ""),
    };

    match selector {
        0 => OscAction::SetWindowAndIconTitle(payload.to_string()),
        1 => OscAction::SetIconTitle(payload.to_string()),
        2 => OscAction::SetWindowTitle(payload.to_string()),
        4 => match payload.split_once(';') {
            Some((index, spec)) => match index.parse::<u16>() {
                Ok(index) => OscAction::SetPaletteColor {
                    index,
                    spec: spec.to_string(),
                },
                Err(_) => OscAction::Unknown {
                    selector,
                    payload: payload.to_string(),
                },
            },
            None => OscAction::Unknown {
                selector,
                payload: payload.to_string(),
            },
        },
        10 => OscAction::SetForegroundColor(payload.to_string()),
        11 => OscAction::SetBackgroundColor(payload.to_string()),
        12 => OscAction::SetCursorColor(payload.to_string()),
        52 => match payload.split_once(';') {
            Some((selection, data)) => OscAction::Clipboard {
                selection: selection.to_string(),
                payload: data.to_string(),
            },
            None => OscAction::Clipboard {
                selection: String::new(),
                payload: payload.to_string(),
            },
        },
        104 => OscAction::ResetPaletteColor(payload.parse::<u16>().ok()),
        110 => OscAction::ResetForegroundColor,
        111 => OscAction::ResetBackgroundColor,
        112 => OscAction::ResetCursorColor,
        _ => OscAction::Unknown {
            selector,
            payload: payload.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csi_param_defaulting() {
        let csi = CsiAction {
            params: Params::from_values(&[10, 0]),
            intermediates: vec![],
            final_byte: b'H',
            marker: 0,
        };
        assert_eq!(csi.param_or(0, 1), 10);
        assert_eq!(csi.param_or(1, 1), 1);
        assert_eq!(csi.param_or(7, 9), 9);
        assert!(!csi.is_private());
    }

    #[test]
    fn test_osc_titles() {
        assert_eq!(
            parse_osc(b"0;hello"),
            OscAction::SetWindowAndIconTitle("hello".into())
        );
        assert_eq!(parse_osc(b"2;title"), OscAction::SetWindowTitle("title".into()));
    }

    #[test]
    fn test_osc_palette() {
        assert_eq!(
            parse_osc(b"4;17;rgb:ff/80/00"),
            OscAction::SetPaletteColor {
                index: 17,
                spec: "rgb:ff/80/00".into()
            }
        );
    }

    #[test]
    fn test_osc_clipboard() {
        assert_eq!(
            parse_osc(b"52;c;aGVsbG8="),
            OscAction::Clipboard {
                selection: "c".into(),
                payload: "aGVsbG8=".into()
            }
        );
    }

    #[test]
    fn test_osc_unknown_selector() {
        assert_eq!(
            parse_osc(b"7;file:///tmp"),
            OscAction::Unknown {
                selector: 7,
                payload: "file:///tmp".into()
            }
        );
    }
}

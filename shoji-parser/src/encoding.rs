//! Byte-to-scalar translation settings
//!
//! The screen decides once, at creation, how incoming bytes above 0x7F are
//! decoded. Everything below 0x80 is handled identically in all encodings.

/// How printable bytes are translated into Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// Streaming UTF-8 decoding (invalid sequences become U+FFFD)
    #[default]
    Utf8,
    /// ISO 8859-1: every byte maps directly to the same scalar value
    Latin1,
    /// 7-bit ASCII: bytes above 0x7F are replaced with U+FFFD
    Ascii,
}

impl TextEncoding {
    /// Parse an encoding name as used in terminal configuration.
    pub fn for_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" => Some(TextEncoding::Latin1),
            "us-ascii" | "ascii" => Some(TextEncoding::Ascii),
            _ => None,
        }
    }

    /// Canonical name for this encoding.
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "UTF-8",
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Ascii => "US-ASCII",
        }
    }
}

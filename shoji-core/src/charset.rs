//! Character set mapping (SCS)
//!
//! Four designation slots G0..G3 hold national or graphics sets. SI/SO and
//! the lock shifts choose which slot translates printable characters; SS2
//! and SS3 borrow G2/G3 for exactly one character.

use serde::{Deserialize, Serialize};

/// A designatable character set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// US-ASCII, the identity mapping
    #[default]
    Ascii,
    /// United Kingdom (# becomes £)
    Uk,
    /// DEC Special Graphics: line drawing
    DecSpecialGraphics,
    /// DEC Supplemental: Latin-1 right half
    DecSupplemental,
    /// DEC Technical: a few mathematical glyphs
    DecTechnical,
}

impl Charset {
    /// Decode the final byte of an SCS designation sequence.
    pub fn from_designation(designation: char) -> Option<Self> {
        match designation {
            'B' | '@' => Some(Charset::Ascii),
            'A' => Some(Charset::Uk),
            '0' | '2' => Some(Charset::DecSpecialGraphics),
            '<' | 'U' => Some(Charset::DecSupplemental),
            '>' => Some(Charset::DecTechnical),
            _ => None,
        }
    }
}

/// The G0..G3 slots plus shift state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharsetState {
    slots: [Charset; 4],
    /// Slot locked into GL (SI/SO, LS2, LS3)
    gl: u8,
    /// Slot locked into GR (LS1R/LS2R/LS3R); used by 8-bit encodings
    gr: u8,
    /// Pending single shift (2 or 3)
    single_shift: Option<u8>,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            slots: [Charset::Ascii; 4],
            gl: 0,
            gr: 1,
            single_shift: None,
        }
    }
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn slot(&self, slot: u8) -> Charset {
        self.slots[usize::from(slot & 3)]
    }

    pub fn designate(&mut self, slot: u8, charset: Charset) {
        self.slots[usize::from(slot & 3)] = charset;
    }

    /// SI: lock G0 into GL.
    pub fn shift_in(&mut self) {
        self.gl = 0;
    }

    /// SO: lock G1 into GL.
    pub fn shift_out(&mut self) {
        self.gl = 1;
    }

    /// LS2 / LS3: lock G2 or G3 into GL.
    pub fn lock_shift_gl(&mut self, slot: u8) {
        self.gl = slot & 3;
    }

    /// LS1R / LS2R / LS3R: lock a slot into GR.
    pub fn lock_shift_gr(&mut self, slot: u8) {
        self.gr = slot & 3;
    }

    /// SS2 / SS3: use G2/G3 for the next printable only.
    pub fn single_shift(&mut self, slot: u8) {
        self.single_shift = Some(slot & 3);
    }

    /// The set that translates the next printable character. Consumes any
    /// pending single shift.
    pub fn advance(&mut self) -> Charset {
        match self.single_shift.take() {
            Some(slot) => self.slot(slot),
            None => self.slot(self.gl),
        }
    }

    /// Translate one character through the active set.
    pub fn translate_next(&mut self, ch: char) -> char {
        translate(ch, self.advance())
    }

    /// The GR set, applied to 0xA0..=0xFF scalars in 8-bit encodings.
    pub fn gr_charset(&self) -> Charset {
        self.slot(self.gr)
    }
}

/// Map a character through a charset.
pub fn translate(ch: char, charset: Charset) -> char {
    match charset {
        Charset::Ascii => ch,
        Charset::Uk => match ch {
            '#' => '£',
            _ => ch,
        },
        Charset::DecSpecialGraphics => translate_special_graphics(ch),
        Charset::DecSupplemental => {
            // The supplemental set mirrors the Latin-1 right half
            match u32::from(ch) {
                0x21..=0x7E => char::from_u32(u32::from(ch) + 0x80).unwrap_or(ch),
                _ => ch,
            }
        }
        Charset::DecTechnical => translate_technical(ch),
    }
}

fn translate_special_graphics(ch: char) -> char {
    match ch {
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        _ => ch,
    }
}

fn translate_technical(ch: char) -> char {
    match ch {
        'a' => 'Σ',
        'b' => '∞',
        'c' => '÷',
        'd' => 'Δ',
        'e' => '∇',
        'f' => 'Φ',
        'g' => 'Γ',
        'h' => '∼',
        'i' => '≃',
        'j' => 'Θ',
        'k' => '×',
        'l' => 'Λ',
        'm' => '⇔',
        'n' => '⇒',
        'o' => '≡',
        'p' => 'Π',
        'q' => 'Ψ',
        's' => '√',
        't' => 'Ω',
        'u' => 'Ξ',
        'v' => 'Υ',
        'w' => '⊂',
        'x' => '⊃',
        'y' => '∩',
        'z' => '∪',
        '{' => '∧',
        '|' => '∨',
        '}' => '¬',
        '~' => 'α',
        _ => ch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_ascii_everywhere() {
        let mut state = CharsetState::new();
        assert_eq!(state.translate_next('q'), 'q');
        assert_eq!(state.slot(0), Charset::Ascii);
    }

    #[test]
    fn test_designation_finals() {
        assert_eq!(Charset::from_designation('B'), Some(Charset::Ascii));
        assert_eq!(Charset::from_designation('0'), Some(Charset::DecSpecialGraphics));
        assert_eq!(Charset::from_designation('A'), Some(Charset::Uk));
        assert_eq!(Charset::from_designation('<'), Some(Charset::DecSupplemental));
        assert_eq!(Charset::from_designation('z'), None);
    }

    #[test]
    fn test_shift_out_selects_g1() {
        let mut state = CharsetState::new();
        state.designate(1, Charset::DecSpecialGraphics);
        assert_eq!(state.translate_next('q'), 'q');
        state.shift_out();
        assert_eq!(state.translate_next('q'), '─');
        state.shift_in();
        assert_eq!(state.translate_next('q'), 'q');
    }

    #[test]
    fn test_single_shift_applies_once() {
        let mut state = CharsetState::new();
        state.designate(2, Charset::DecSpecialGraphics);
        state.single_shift(2);
        assert_eq!(state.translate_next('x'), '│');
        assert_eq!(state.translate_next('x'), 'x');
    }

    #[test]
    fn test_line_drawing_corners() {
        assert_eq!(translate('j', Charset::DecSpecialGraphics), '┘');
        assert_eq!(translate('k', Charset::DecSpecialGraphics), '┐');
        assert_eq!(translate('l', Charset::DecSpecialGraphics), '┌');
        assert_eq!(translate('m', Charset::DecSpecialGraphics), '└');
    }

    #[test]
    fn test_uk_pound() {
        assert_eq!(translate('#', Charset::Uk), '£');
        assert_eq!(translate('A', Charset::Uk), 'A');
    }

    #[test]
    fn test_supplemental_maps_to_latin1() {
        assert_eq!(translate('!', Charset::DecSupplemental), '¡');
    }
}

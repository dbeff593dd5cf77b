//! Character LCD glyph mapping
//!
//! HD44780 controllers with the A00 character ROM hold ASCII in the lower
//! half and JIS X 0201 katakana in the upper half. Text is mapped one
//! character at a time:
//!
//! - Full-width katakana and CJK punctuation from [`KANA_TABLE`]. Voiced
//!   and semi-voiced syllables have no glyph of their own and take two
//!   cells: the base kana followed by a separate mark.
//! - Half-width katakana (U+FF61..=U+FF9F) shift straight into the ROM.
//! - Printable ASCII passes through.
//! - Everything else becomes a space.

/// Cells per display line
pub const LINE_WIDTH: usize = 16;

/// Blank cell
pub const SPACE: u8 = 0x20;

/// Voiced mark (dakuten)
pub const DAKUTEN: u8 = 0xDE;

/// Semi-voiced mark (handakuten)
pub const HANDAKUTEN: u8 = 0xDF;

/// Offset from half-width katakana code points to the ROM
const HALFWIDTH_OFFSET: u32 = 0xFEC0;

/// ROM codes for one input character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Glyph {
    /// One cell
    Single(u8),
    /// Base kana plus a mark, two cells
    Marked(u8, u8),
}

impl Glyph {
    const fn voiced(base: u8) -> Self {
        Glyph::Marked(base, DAKUTEN)
    }

    const fn semi_voiced(base: u8) -> Self {
        Glyph::Marked(base, HANDAKUTEN)
    }

    /// Number of cells this glyph occupies
    pub const fn width(self) -> usize {
        match self {
            Glyph::Single(_) => 1,
            Glyph::Marked(..) => 2,
        }
    }

    /// ROM bytes in display order
    pub fn bytes(self) -> impl Iterator<Item = u8> {
        let (first, second) = match self {
            Glyph::Single(b) => (b, None),
            Glyph::Marked(b, m) => (b, Some(m)),
        };
        core::iter::once(first).chain(second)
    }
}

/// Full-width characters with a ROM mapping
pub const KANA_TABLE: &[(char, Glyph)] = &[
    // Voiced
    ('ガ', Glyph::voiced(0xB6)),
    ('ギ', Glyph::voiced(0xB7)),
    ('グ', Glyph::voiced(0xB8)),
    ('ゲ', Glyph::voiced(0xB9)),
    ('ゴ', Glyph::voiced(0xBA)),
    ('ザ', Glyph::voiced(0xBB)),
    ('ジ', Glyph::voiced(0xBC)),
    ('ズ', Glyph::voiced(0xBD)),
    ('ゼ', Glyph::voiced(0xBE)),
    ('ゾ', Glyph::voiced(0xBF)),
    ('ダ', Glyph::voiced(0xC0)),
    ('ヂ', Glyph::voiced(0xC1)),
    ('ヅ', Glyph::voiced(0xC2)),
    ('デ', Glyph::voiced(0xC3)),
    ('ド', Glyph::voiced(0xC4)),
    ('バ', Glyph::voiced(0xCA)),
    ('ビ', Glyph::voiced(0xCB)),
    ('ブ', Glyph::voiced(0xCC)),
    ('ベ', Glyph::voiced(0xCD)),
    ('ボ', Glyph::voiced(0xCE)),
    // Semi-voiced
    ('パ', Glyph::semi_voiced(0xCA)),
    ('ピ', Glyph::semi_voiced(0xCB)),
    ('プ', Glyph::semi_voiced(0xCC)),
    ('ペ', Glyph::semi_voiced(0xCD)),
    ('ポ', Glyph::semi_voiced(0xCE)),
    // Plain
    ('ア', Glyph::Single(0xB1)),
    ('イ', Glyph::Single(0xB2)),
    ('ウ', Glyph::Single(0xB3)),
    ('エ', Glyph::Single(0xB4)),
    ('オ', Glyph::Single(0xB5)),
    ('カ', Glyph::Single(0xB6)),
    ('キ', Glyph::Single(0xB7)),
    ('ク', Glyph::Single(0xB8)),
    ('ケ', Glyph::Single(0xB9)),
    ('コ', Glyph::Single(0xBA)),
    ('サ', Glyph::Single(0xBB)),
    ('シ', Glyph::Single(0xBC)),
    ('ス', Glyph::Single(0xBD)),
    ('セ', Glyph::Single(0xBE)),
    ('ソ', Glyph::Single(0xBF)),
    ('タ', Glyph::Single(0xC0)),
    ('チ', Glyph::Single(0xC1)),
    ('ツ', Glyph::Single(0xC2)),
    ('テ', Glyph::Single(0xC3)),
    ('ト', Glyph::Single(0xC4)),
    ('ナ', Glyph::Single(0xC5)),
    ('ニ', Glyph::Single(0xC6)),
    ('ヌ', Glyph::Single(0xC7)),
    ('ネ', Glyph::Single(0xC8)),
    ('ノ', Glyph::Single(0xC9)),
    ('ハ', Glyph::Single(0xCA)),
    ('ヒ', Glyph::Single(0xCB)),
    ('フ', Glyph::Single(0xCC)),
    ('ヘ', Glyph::Single(0xCD)),
    ('ホ', Glyph::Single(0xCE)),
    ('マ', Glyph::Single(0xCF)),
    ('ミ', Glyph::Single(0xD0)),
    ('ム', Glyph::Single(0xD1)),
    ('メ', Glyph::Single(0xD2)),
    ('モ', Glyph::Single(0xD3)),
    ('ヤ', Glyph::Single(0xD4)),
    ('ユ', Glyph::Single(0xD5)),
    ('ヨ', Glyph::Single(0xD6)),
    ('ラ', Glyph::Single(0xD7)),
    ('リ', Glyph::Single(0xD8)),
    ('ル', Glyph::Single(0xD9)),
    ('レ', Glyph::Single(0xDA)),
    ('ロ', Glyph::Single(0xDB)),
    ('ワ', Glyph::Single(0xDC)),
    ('ヲ', Glyph::Single(0xA6)),
    ('ン', Glyph::Single(0xDD)),
    // Small kana
    ('ッ', Glyph::Single(0xAF)),
    ('ャ', Glyph::Single(0xAC)),
    ('ュ', Glyph::Single(0xAD)),
    ('ョ', Glyph::Single(0xAE)),
    ('ァ', Glyph::Single(0xA7)),
    ('ィ', Glyph::Single(0xA8)),
    ('ゥ', Glyph::Single(0xA9)),
    ('ェ', Glyph::Single(0xAA)),
    ('ォ', Glyph::Single(0xAB)),
    // Marks and punctuation
    ('ー', Glyph::Single(0xB0)),
    ('゛', Glyph::Single(DAKUTEN)),
    ('゜', Glyph::Single(HANDAKUTEN)),
    ('。', Glyph::Single(0xA1)),
    ('「', Glyph::Single(0xA2)),
    ('」', Glyph::Single(0xA3)),
    ('、', Glyph::Single(0xA4)),
    ('・', Glyph::Single(0xA5)),
];

/// Map one character to ROM codes
pub fn encode_char(c: char) -> Glyph {
    if let Some((_, glyph)) = KANA_TABLE.iter().find(|(k, _)| *k == c) {
        return *glyph;
    }
    match c as u32 {
        code @ 0xFF61..=0xFF9F => Glyph::Single((code - HALFWIDTH_OFFSET) as u8),
        code @ 0x20..=0x7E => Glyph::Single(code as u8),
        _ => Glyph::Single(SPACE),
    }
}

/// Lay out text on one line
///
/// Short text is padded with spaces. Long text is cut at the last cell,
/// which may split a two-cell glyph and keep only its base kana.
pub fn encode_line(text: &str) -> [u8; LINE_WIDTH] {
    let mut line = [SPACE; LINE_WIDTH];
    let bytes = text.chars().flat_map(|c| encode_char(c).bytes());
    for (cell, byte) in line.iter_mut().zip(bytes) {
        *cell = byte;
    }
    line
}

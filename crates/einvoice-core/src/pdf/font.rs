//! TrueType font programs and the text styles used on the invoice.

use std::collections::HashMap;

use ttf_parser::{Face, GlyphId};

use crate::error::ResourceLoadError;

/// Advance used for glyph ids outside the width table (1/1000 em).
const MISSING_WIDTH: u16 = 500;

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Black, used for content.
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Dark red used for labels, rules and borders.
    pub const FIELD: Color = Color::rgb(128, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Components scaled to 0.0 - 1.0 for PDF color operators.
    pub fn components(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

/// The three font programs used on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontKind {
    /// Kai-style font for the title and field labels.
    Field,
    /// Song-style font for field content.
    Content,
    /// Fixed-width font for taxpayer identification numbers.
    IdNumber,
}

impl FontKind {
    /// All font kinds in resource order.
    pub const ALL: [FontKind; 3] = [FontKind::Field, FontKind::Content, FontKind::IdNumber];

    /// Name of the font in the page resource dictionary.
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontKind::Field => "F1",
            FontKind::Content => "F2",
            FontKind::IdNumber => "F3",
        }
    }
}

/// Font, size and color of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontKind,
    pub size: f32,
    pub color: Color,
}

impl TextStyle {
    /// Invoice title.
    pub const TITLE: TextStyle = TextStyle::new(FontKind::Field, 20.5, Color::FIELD);

    /// Field labels such as `名称：`.
    pub const FIELD: TextStyle = TextStyle::new(FontKind::Field, 9.0, Color::FIELD);

    /// Field content.
    pub const CONTENT: TextStyle = TextStyle::new(FontKind::Content, 9.0, Color::BLACK);

    /// Taxpayer identification numbers.
    pub const ID_NUMBER: TextStyle = TextStyle::new(FontKind::IdNumber, 12.0, Color::BLACK);

    pub const fn new(font: FontKind, size: f32, color: Color) -> Self {
        Self { font, size, color }
    }
}

/// A parsed TrueType font ready for measuring text and embedding.
#[derive(Debug, Clone)]
pub struct FontProgram {
    name: String,
    data: Vec<u8>,
    unicode_to_glyph: HashMap<char, u16>,
    /// Advance widths indexed by glyph id, in 1/1000 em.
    glyph_widths: Vec<u16>,
    ascender: i16,
    descender: i16,
    cap_height: i16,
    bbox: [i16; 4],
    flags: u32,
}

impl FontProgram {
    /// Parse a TrueType font from raw data.
    ///
    /// `name` is used in error messages and as fallback PostScript name.
    pub fn from_bytes(name: &str, data: Vec<u8>) -> Result<Self, ResourceLoadError> {
        let font_error = |reason: String| ResourceLoadError::Font {
            name: name.to_string(),
            reason,
        };

        if data.is_empty() {
            return Err(font_error("font file is empty".to_string()));
        }

        let face = Face::parse(&data, 0).map_err(|e| font_error(e.to_string()))?;
        let units_per_em = face.units_per_em().max(1) as u32;
        let to_thousandths = |value: i16| (value as i32 * 1000 / units_per_em as i32) as i16;

        let mut unicode_to_glyph = HashMap::new();
        for codepoint in 0..=0xFFFF_u32 {
            if let Some(ch) = char::from_u32(codepoint) {
                if let Some(glyph) = face.glyph_index(ch) {
                    unicode_to_glyph.insert(ch, glyph.0);
                }
            }
        }

        let glyph_widths = (0..face.number_of_glyphs())
            .map(|gid| {
                let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0) as u32;
                (advance * 1000 / units_per_em) as u16
            })
            .collect();

        let postscript_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| name.to_string());

        let bbox = face.global_bounding_box();
        let ascender = to_thousandths(face.ascender());

        // FixedPitch (bit 1) and Nonsymbolic (bit 6)
        let mut flags = 1 << 5;
        if face.is_monospaced() {
            flags |= 1;
        }

        Ok(Self {
            name: sanitize_font_name(&postscript_name),
            unicode_to_glyph,
            glyph_widths,
            ascender,
            descender: to_thousandths(face.descender()),
            cap_height: face.capital_height().map(to_thousandths).unwrap_or(ascender),
            bbox: [
                to_thousandths(bbox.x_min),
                to_thousandths(bbox.y_min),
                to_thousandths(bbox.x_max),
                to_thousandths(bbox.y_max),
            ],
            flags,
            data,
        })
    }

    /// PostScript name used for the embedded font.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw font program for `FontFile2`.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Glyph id for a character, if the font covers it.
    pub fn glyph_id(&self, ch: char) -> Option<u16> {
        self.unicode_to_glyph.get(&ch).copied()
    }

    /// Glyph advance in 1/1000 em.
    pub fn glyph_width(&self, glyph_id: u16) -> u16 {
        self.glyph_widths
            .get(glyph_id as usize)
            .copied()
            .unwrap_or(MISSING_WIDTH)
    }

    /// Advance of a character in 1/1000 em; uncovered characters measure as glyph 0.
    pub fn char_width(&self, ch: char) -> u16 {
        self.glyph_width(self.glyph_id(ch).unwrap_or(0))
    }

    /// Width of `text` in layout units at `size`, scaled horizontally by `h_scale`.
    pub fn text_width(&self, text: &str, size: f32, h_scale: f32) -> f32 {
        let thousandths: u32 = text.chars().map(|ch| self.char_width(ch) as u32).sum();
        thousandths as f32 * size / 1000.0 * h_scale
    }

    /// Map text to glyph ids; uncovered characters become glyph 0.
    pub fn encode(&self, text: &str) -> Vec<u16> {
        text.chars().map(|ch| self.glyph_id(ch).unwrap_or(0)).collect()
    }

    /// Ascender in 1/1000 em.
    pub fn ascender(&self) -> i16 {
        self.ascender
    }

    /// Descender in 1/1000 em (negative).
    pub fn descender(&self) -> i16 {
        self.descender
    }

    /// Cap height in 1/1000 em.
    pub fn cap_height(&self) -> i16 {
        self.cap_height
    }

    /// Font bounding box in 1/1000 em.
    pub fn bbox(&self) -> [i16; 4] {
        self.bbox
    }

    /// FontDescriptor flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Font with one glyph per BMP code point and fixed advances: 1000 for
    /// ideographs and full-width forms, 500 for everything else.
    #[cfg(test)]
    pub(crate) fn synthetic(name: &str) -> Self {
        let mut unicode_to_glyph = HashMap::new();
        let mut glyph_widths = vec![MISSING_WIDTH];
        for ch in (0x20..0xD800_u32).filter_map(char::from_u32) {
            unicode_to_glyph.insert(ch, glyph_widths.len() as u16);
            glyph_widths.push(if is_wide(ch) { 1000 } else { 500 });
        }
        Self {
            name: name.to_string(),
            data: b"synthetic font program".to_vec(),
            unicode_to_glyph,
            glyph_widths,
            ascender: 880,
            descender: -120,
            cap_height: 700,
            bbox: [0, -120, 1000, 880],
            flags: 1 << 5,
        }
    }
}

/// Whether a character is laid out as a standalone ideograph-width unit.
pub(crate) fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x2E80..=0x9FFF | 0xAC00..=0xD7AF | 0xF900..=0xFAFF | 0xFE30..=0xFE4F | 0xFF00..=0xFFEF)
}

/// PDF names may not contain whitespace or delimiters.
fn sanitize_font_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() && !"()<>[]{}/%#".contains(*c))
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}

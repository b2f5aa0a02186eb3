//! # Font Management
//!
//! The engine draws with exactly two faces: a regular face for message
//! bodies and metadata, and a bold face for headers and link lines. By
//! default these are the standard PDF fonts Helvetica and Helvetica-Bold,
//! which need no embedding. A configuration may replace either with a
//! TrueType face, parsed with ttf-parser and embedded by the PDF writer.
//!
//! A [`FontContext`] is immutable after construction and can be shared
//! between threads assembling different documents.

pub mod metrics;
pub mod source;

use std::collections::HashMap;

use crate::config::FontConfig;
use crate::error::ChatbookError;
pub use metrics::StandardFontMetrics;

/// Which of the two faces a piece of text is set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    Regular,
    Bold,
}

/// The standard PDF fonts the engine uses when no custom face is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> &'static StandardFontMetrics {
        match self {
            Self::Helvetica => &metrics::HELVETICA,
            Self::HelveticaBold => &metrics::HELVETICA_BOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FontData {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType font that the writer embeds in full.
    Custom {
        data: Vec<u8>,
        metrics: CustomFontMetrics,
    },
}

/// Parsed metrics from a TrueType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data. Only printable ASCII is mapped since
    /// nothing outside it survives sanitization.
    pub fn from_font_data(data: &[u8]) -> Result<Self, ChatbookError> {
        let face = ttf_parser::Face::parse(data, 0)
            .map_err(|e| ChatbookError::FontError(format!("Failed to parse TTF data: {}", e)))?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        for code in 0x20u8..=0x7E {
            let ch = code as char;
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == '?' {
                    default_advance = advance;
                }
            }
        }

        if glyph_ids.is_empty() {
            return Err(ChatbookError::FontError(
                "Font has no glyphs for printable ASCII".to_string(),
            ));
        }
        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Ok(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

impl FontData {
    fn custom(data: Vec<u8>) -> Result<Self, ChatbookError> {
        let metrics = CustomFontMetrics::from_font_data(&data)?;
        Ok(FontData::Custom { data, metrics })
    }

    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        match self {
            FontData::Standard(std_font) => std_font.metrics().char_width(ch, font_size),
            FontData::Custom { metrics, .. } => metrics.char_width(ch, font_size),
        }
    }

    /// Ascender as a fraction of the em square.
    pub fn ascent_ratio(&self) -> f64 {
        match self {
            FontData::Standard(std_font) => std_font.metrics().ascender as f64 / 1000.0,
            FontData::Custom { metrics, .. } => {
                metrics.ascender as f64 / metrics.units_per_em as f64
            }
        }
    }
}

/// Shared font context used by layout and PDF serialization.
#[derive(Debug, Clone)]
pub struct FontContext {
    regular: FontData,
    bold: FontData,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::new()
    }
}

impl FontContext {
    /// Helvetica and Helvetica-Bold.
    pub fn new() -> Self {
        Self {
            regular: FontData::Standard(StandardFont::Helvetica),
            bold: FontData::Standard(StandardFont::HelveticaBold),
        }
    }

    /// Build a context from configured font sources. A source that cannot
    /// be read or parsed aborts generation.
    pub fn from_config(config: &FontConfig) -> Result<Self, ChatbookError> {
        let mut ctx = Self::new();
        if let Some(src) = &config.regular {
            ctx.regular = FontData::custom(source::read_font_source(src)?)?;
        }
        if let Some(src) = &config.bold {
            ctx.bold = FontData::custom(source::read_font_source(src)?)?;
        }
        Ok(ctx)
    }

    /// Replace one face with TrueType data.
    pub fn with_custom_face(mut self, face: Face, data: Vec<u8>) -> Result<Self, ChatbookError> {
        let font = FontData::custom(data)?;
        match face {
            Face::Regular => self.regular = font,
            Face::Bold => self.bold = font,
        }
        Ok(self)
    }

    pub fn resolve(&self, face: Face) -> &FontData {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        }
    }

    /// Get the advance width of a single character in points.
    pub fn char_width(&self, ch: char, face: Face, font_size: f64) -> f64 {
        self.resolve(face).char_width(ch, font_size)
    }

    /// Measure the width of a string in points. Callers pass sanitized text.
    pub fn measure(&self, text: &str, face: Face, font_size: f64) -> f64 {
        let font = self.resolve(face);
        text.chars().map(|ch| font.char_width(ch, font_size)).sum()
    }

    /// Distance from the top of a line box to the baseline.
    pub fn ascent(&self, face: Face, font_size: f64) -> f64 {
        self.resolve(face).ascent_ratio() * font_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_context_helvetica() {
        let ctx = FontContext::new();
        let w = ctx.char_width(' ', Face::Regular, 12.0);
        assert!((w - 3.336).abs() < 0.001);
    }

    #[test]
    fn test_font_context_bold_wider() {
        let ctx = FontContext::new();
        let regular = ctx.char_width('A', Face::Regular, 12.0);
        let bold = ctx.char_width('A', Face::Bold, 12.0);
        assert!(bold > regular, "Bold A should be wider than regular A");
    }

    #[test]
    fn test_measure_is_sum_of_chars() {
        let ctx = FontContext::new();
        let w = ctx.measure("Hi", Face::Regular, 10.0);
        let expected = ctx.char_width('H', Face::Regular, 10.0) + ctx.char_width('i', Face::Regular, 10.0);
        assert!((w - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_custom_font_is_fatal() {
        let err = FontContext::new()
            .with_custom_face(Face::Regular, vec![0, 1, 2, 3])
            .unwrap_err();
        assert!(matches!(err, ChatbookError::FontError(_)));
    }

    #[test]
    fn test_from_default_config_uses_standard_fonts() {
        let ctx = FontContext::from_config(&FontConfig::default()).unwrap();
        assert!(matches!(ctx.resolve(Face::Bold), FontData::Standard(StandardFont::HelveticaBold)));
    }

    #[test]
    fn test_context_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FontContext>();
    }
}

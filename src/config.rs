//! # Render Configuration
//!
//! Page geometry, typography, colors and the few behavioral knobs the
//! assembler exposes. Every field has a default, so an empty JSON object
//! (or no config at all) produces an A4 document with Helvetica text.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ChatbookError;

/// Top-level configuration for one document generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub page: PageConfig,
    pub typography: Typography,
    pub colors: Palette,
    /// Vertical gap after every message block.
    pub message_spacing: f64,
    /// Left indent of message bodies relative to the header line.
    pub body_indent: f64,
    /// Height reserved for a date separator, including its rule.
    pub date_separator_height: f64,
    /// Base address used to synthesize proxy-style media links, e.g.
    /// `https://files.example.com/media`. The descriptor id is appended.
    pub media_base_url: Option<String>,
    pub summary: SummaryConfig,
    pub fonts: FontConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            typography: Typography::default(),
            colors: Palette::default(),
            message_spacing: 8.0,
            body_indent: 12.0,
            date_separator_height: 30.0,
            media_base_url: None,
            summary: SummaryConfig::default(),
            fonts: FontConfig::default(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ChatbookError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChatbookError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Line height for a given font size.
    pub fn line_height(&self, font_size: f64) -> f64 {
        font_size * self.typography.line_height_factor
    }
}

/// Configuration for a page: size and margins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageConfig {
    pub size: PageSize,
    /// Page margins in points (1/72 inch). The footer is drawn inside the
    /// bottom margin.
    pub margin: Edges,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            margin: Edges::uniform(50.0),
        }
    }
}

impl PageConfig {
    pub fn content_width(&self) -> f64 {
        self.size.dimensions().0 - self.margin.horizontal()
    }

    /// Usable vertical space between the top and bottom margins.
    pub fn content_height(&self) -> f64 {
        self.size.dimensions().1 - self.margin.vertical()
    }
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// Font sizes (points) for each kind of line the engine draws.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Typography {
    pub title_size: f64,
    pub meta_size: f64,
    pub date_size: f64,
    pub header_size: f64,
    pub body_size: f64,
    pub summary_size: f64,
    pub footer_size: f64,
    /// Multiplier applied to the font size to get the line advance.
    pub line_height_factor: f64,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            title_size: 18.0,
            meta_size: 9.0,
            date_size: 11.0,
            header_size: 10.0,
            body_size: 10.0,
            summary_size: 8.0,
            footer_size: 8.0,
            line_height_factor: 1.4,
        }
    }
}

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb`. Anything else yields black.
    pub fn hex(hex: &str) -> Self {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return Self::BLACK;
        }
        let (r, g, b) = match hex.len() {
            3 => {
                let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).unwrap_or(0);
                (r, g, b)
            }
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
                let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
                let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
                (r, g, b)
            }
            _ => (0, 0, 0),
        };
        Self {
            r: r as f64 / 255.0,
            g: g as f64 / 255.0,
            b: b as f64 / 255.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Colors used by the message renderer. Senders get a two-way split: the
/// first participant versus everyone else.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Palette {
    pub text: Color,
    pub first_sender: Color,
    pub other_sender: Color,
    pub link: Color,
    pub warning: Color,
    pub muted: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Color::BLACK,
            first_sender: Color::hex("#1a5fb4"),
            other_sender: Color::hex("#26a269"),
            link: Color::hex("#1c3faa"),
            warning: Color::hex("#c01c28"),
            muted: Color::hex("#5e5c64"),
        }
    }
}

/// Authentication summary table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryConfig {
    /// Upper bound on listed descriptors. `None` lists every descriptor,
    /// continuing onto as many pages as needed.
    pub max_rows: Option<usize>,
    /// File names longer than this are cut and suffixed with `...`.
    pub name_max_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_rows: None,
            name_max_chars: 40,
        }
    }
}

/// Optional TrueType faces replacing the built-in Helvetica pair.
///
/// Each source is a file path (`/`, `./` or `../` prefix), a
/// `data:font/ttf;base64,...` URI, or raw base64.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontConfig {
    pub regular: Option<String>,
    pub bold: Option<String>,
}

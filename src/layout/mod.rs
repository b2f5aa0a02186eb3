//! # Page Layout Primitives
//!
//! The output of layout: pages holding absolutely positioned lines, rules
//! and link regions. Coordinates are in points with the origin at the top
//! left of the page and y growing downward; the PDF writer flips them.
//!
//! Nothing here decides *where* content goes. That is the job of the
//! [`pagination::Paginator`], which hands out positions, and of the
//! renderers that ask it for space before drawing.

pub mod page_break;
pub mod pagination;

use crate::config::Color;
use crate::font::{Face, FontContext};

/// A fully laid-out page ready for PDF serialization.
#[derive(Debug, Clone)]
pub struct LayoutPage {
    pub width: f64,
    pub height: f64,
    pub elements: Vec<LayoutElement>,
    /// Clickable regions, in drawing order.
    pub links: Vec<LinkAnnotation>,
}

impl LayoutPage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Every drawn text line on the page, top to bottom as placed.
    pub fn text_lines(&self) -> impl Iterator<Item = &TextLine> {
        self.elements.iter().filter_map(|el| match &el.draw {
            DrawCommand::Text { line, .. } => Some(line),
            DrawCommand::Rule { .. } => None,
        })
    }

    /// Page text joined with newlines. Handy for assertions and debugging.
    pub fn plain_text(&self) -> String {
        self.text_lines()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A positioned element on a page.
#[derive(Debug, Clone)]
pub struct LayoutElement {
    /// Top-left corner of the element box.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub draw: DrawCommand,
    /// What part of the document this element belongs to.
    pub role: ElementRole,
}

/// What to actually draw for an element.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// One line of sanitized text.
    Text { line: TextLine, color: Color },
    /// A horizontal rule along the top edge of the element box.
    Rule { color: Color, thickness: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f64,
    /// Baseline position (top-down).
    pub baseline: f64,
    pub text: String,
    pub face: Face,
    pub font_size: f64,
    /// Measured width of `text` with `face` at `font_size`.
    pub width: f64,
}

/// Which part of the document an element was drawn for. Indices refer to
/// the position of the message in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRole {
    DocumentHeader,
    DateSeparator,
    MessageHeader(usize),
    MessageBody(usize),
    Summary,
    Footer,
}

impl ElementRole {
    pub fn message_index(&self) -> Option<usize> {
        match self {
            ElementRole::MessageHeader(i) | ElementRole::MessageBody(i) => Some(*i),
            _ => None,
        }
    }
}

/// A clickable rectangle pointing at a URI.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub uri: String,
}

/// Build a text element whose box is the line box at `top`.
///
/// The baseline sits one ascent below the top of the box, and the box is
/// as wide as the measured text, so a link registered with
/// [`link_over`] covers exactly the drawn glyphs.
#[allow(clippy::too_many_arguments)]
pub fn text_element(
    font_context: &FontContext,
    text: String,
    width: f64,
    x: f64,
    top: f64,
    line_height: f64,
    face: Face,
    font_size: f64,
    color: Color,
    role: ElementRole,
) -> LayoutElement {
    let leading = (line_height - font_size).max(0.0) / 2.0;
    let baseline = top + leading + font_context.ascent(face, font_size);
    LayoutElement {
        x,
        y: top,
        width,
        height: line_height,
        draw: DrawCommand::Text {
            line: TextLine {
                x,
                baseline,
                text,
                face,
                font_size,
                width,
            },
            color,
        },
        role,
    }
}

/// A clickable region coincident with a drawn line's box.
pub fn link_over(element: &LayoutElement, uri: &str) -> LinkAnnotation {
    LinkAnnotation {
        x: element.x,
        y: element.y,
        width: element.width,
        height: element.height,
        uri: uri.to_string(),
    }
}

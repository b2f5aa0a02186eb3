//! # Message Rendering
//!
//! Draws one message at the paginator's cursor: a bold header line
//! `"[HH:MM] sender:"` followed by a kind-specific body. Bodies are produced
//! by a [`BodyRenderer`] chosen exhaustively from the message kind, so a new
//! kind cannot be added without deciding how it is drawn.
//!
//! A message block is handed to the paginator as a list of item heights
//! (header plus first body line, then each further body line). It moves to
//! the next page whole unless it is taller than an empty page.

use chrono::NaiveDate;
use tracing::{debug, error, warn};

use crate::config::{Color, RenderConfig};
use crate::font::{Face, FontContext};
use crate::layout::pagination::Paginator;
use crate::layout::{link_over, text_element, DrawCommand, ElementRole, LayoutElement};
use crate::media::{display_name, format_duration, type_label, LinkTarget, MediaResolver};
use crate::model::{LayoutWarning, MediaDescriptor, Message, MessageKind};
use crate::text::TextLayout;

/// Shared, read-only state for drawing the messages of one document.
pub struct RenderContext<'a> {
    pub fonts: &'a FontContext,
    pub config: &'a RenderConfig,
    pub text: TextLayout,
    pub resolver: &'a MediaResolver<'a>,
    /// Sender drawn in the first-participant color.
    pub first_sender: Option<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        fonts: &'a FontContext,
        config: &'a RenderConfig,
        resolver: &'a MediaResolver<'a>,
        first_sender: Option<String>,
    ) -> Self {
        Self {
            fonts,
            config,
            text: TextLayout::new(),
            resolver,
            first_sender,
        }
    }

    pub fn header_line_height(&self) -> f64 {
        self.config.line_height(self.config.typography.header_size)
    }

    pub fn body_line_height(&self) -> f64 {
        self.config.line_height(self.config.typography.body_size)
    }

    /// Horizontal space available to body lines.
    pub fn body_width(&self) -> f64 {
        (self.config.page.content_width() - self.config.body_indent).max(1.0)
    }

    fn sender_color(&self, sender: &str) -> Color {
        let colors = &self.config.colors;
        match &self.first_sender {
            Some(first) if first.trim() == sender.trim() => colors.first_sender,
            _ => colors.other_sender,
        }
    }
}

/// One prepared body line, already sanitized and measured.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyLine {
    pub text: String,
    pub width: f64,
    pub face: Face,
    pub color: Color,
    /// Link target covering the drawn line.
    pub link: Option<String>,
}

/// The body of one message, ready to be placed.
#[derive(Debug, Clone)]
pub struct BodyLayout {
    pub lines: Vec<BodyLine>,
    /// The media link fell back to the placeholder target.
    pub unresolved: bool,
}

/// Produces the body lines of one message kind.
pub trait BodyRenderer {
    fn layout(
        &self,
        ctx: &RenderContext<'_>,
        message: &Message,
        media: Option<&MediaDescriptor>,
    ) -> BodyLayout;

    fn line_count(
        &self,
        ctx: &RenderContext<'_>,
        message: &Message,
        media: Option<&MediaDescriptor>,
    ) -> usize {
        self.layout(ctx, message, media).lines.len().max(1)
    }
}

/// Plain text, wrapped to the body width.
pub struct TextBody;

/// A single bold link line playing the voice note.
pub struct VoiceBody;

/// A single bold link line for images and file attachments.
pub struct MediaLinkBody;

pub fn body_renderer_for(kind: MessageKind) -> &'static dyn BodyRenderer {
    match kind {
        MessageKind::Text => &TextBody,
        MessageKind::Voice => &VoiceBody,
        MessageKind::Image | MessageKind::Attachment => &MediaLinkBody,
    }
}

impl BodyRenderer for TextBody {
    fn layout(
        &self,
        ctx: &RenderContext<'_>,
        message: &Message,
        _media: Option<&MediaDescriptor>,
    ) -> BodyLayout {
        let size = ctx.config.typography.body_size;
        let lines = ctx
            .text
            .break_into_lines(ctx.fonts, &message.content, Face::Regular, size, ctx.body_width())
            .into_iter()
            .map(|line| BodyLine {
                text: line.text,
                width: line.width,
                face: Face::Regular,
                color: ctx.config.colors.text,
                link: None,
            })
            .collect();
        BodyLayout {
            lines,
            unresolved: false,
        }
    }
}

impl BodyRenderer for VoiceBody {
    fn layout(
        &self,
        ctx: &RenderContext<'_>,
        message: &Message,
        media: Option<&MediaDescriptor>,
    ) -> BodyLayout {
        let name = display_name(message, media);
        let label = match message.duration_seconds {
            Some(secs) => format!("Play Voice Message ({}, {})", name, format_duration(secs)),
            None => format!("Play Voice Message ({})", name),
        };
        link_body(ctx, message, media, &label)
    }
}

impl BodyRenderer for MediaLinkBody {
    fn layout(
        &self,
        ctx: &RenderContext<'_>,
        message: &Message,
        media: Option<&MediaDescriptor>,
    ) -> BodyLayout {
        let name = display_name(message, media);
        let label = format!("View {}: {}", type_label(message.kind, &name), name);
        link_body(ctx, message, media, &label)
    }
}

/// One bold link line. An unresolved target keeps the line clickable but
/// draws it in the warning color.
fn link_body(
    ctx: &RenderContext<'_>,
    message: &Message,
    media: Option<&MediaDescriptor>,
    label: &str,
) -> BodyLayout {
    let target = ctx
        .resolver
        .link_target(message, media, ctx.config.media_base_url.as_deref());
    let size = ctx.config.typography.body_size;
    let line = ctx
        .text
        .fit_line(ctx.fonts, label, Face::Bold, size, ctx.body_width());
    let color = match target {
        LinkTarget::Unavailable => ctx.config.colors.warning,
        _ => ctx.config.colors.link,
    };
    BodyLayout {
        lines: vec![BodyLine {
            text: line.text,
            width: line.width,
            face: Face::Bold,
            color,
            link: Some(target.uri().to_string()),
        }],
        unresolved: !target.is_resolved(),
    }
}

/// Media descriptor for a message; text messages never have one.
pub fn media_for<'a>(ctx: &RenderContext<'a>, message: &Message) -> Option<&'a MediaDescriptor> {
    match message.kind {
        MessageKind::Text => None,
        _ => ctx.resolver.for_message(message),
    }
}

/// Item heights of a message block: header plus first body line, then one
/// per further body line. The last item carries the trailing spacing.
fn block_items(ctx: &RenderContext<'_>, body_lines: usize) -> Vec<f64> {
    let body_lh = ctx.body_line_height();
    let mut items = Vec::with_capacity(body_lines.max(1));
    items.push(ctx.header_line_height() + body_lh);
    items.extend(std::iter::repeat(body_lh).take(body_lines.saturating_sub(1)));
    if let Some(last) = items.last_mut() {
        *last += ctx.config.message_spacing;
    }
    items
}

fn message_items(ctx: &RenderContext<'_>, message: &Message) -> Vec<f64> {
    let media = media_for(ctx, message);
    let lines = body_renderer_for(message.kind).line_count(ctx, message, media);
    block_items(ctx, lines)
}

/// Vertical space a message block consumes, including trailing spacing.
pub fn estimate_height(ctx: &RenderContext<'_>, message: &Message) -> f64 {
    message_items(ctx, message).iter().sum()
}

/// Height of the part of a message that must share a page with whatever
/// precedes it: the header and the first body line.
pub fn leading_height(ctx: &RenderContext<'_>, message: &Message) -> f64 {
    message_items(ctx, message).first().copied().unwrap_or(0.0)
}

/// `[HH:MM] sender:`. Unparseable timestamps show a dashed clock.
pub fn header_text(message: &Message) -> String {
    let time = message
        .parsed_timestamp()
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    format!("[{}] {}:", time, message.sender.trim())
}

/// Draw one message. `index` is the message's position in the request and
/// is used for element roles and warnings.
pub fn render_message(
    ctx: &RenderContext<'_>,
    paginator: &mut Paginator,
    index: usize,
    message: &Message,
    warnings: &mut Vec<LayoutWarning>,
) {
    let media = media_for(ctx, message);
    let body = body_renderer_for(message.kind).layout(ctx, message, media);

    if body.unresolved {
        error!(
            index,
            kind = ?message.kind,
            media_ref = message.media_ref.as_deref().unwrap_or(""),
            "no link target for media message; drawing placeholder"
        );
        warnings.push(LayoutWarning::UnresolvedMedia {
            index,
            kind: message.kind,
        });
    }

    let header_lh = ctx.header_line_height();
    let body_lh = ctx.body_line_height();

    let items = block_items(ctx, body.lines.len());
    let total: f64 = items.iter().sum();
    if total > paginator.content_height() {
        warn!(index, height = total, "message taller than a page; splitting between lines");
        warnings.push(LayoutWarning::OversizedMessage { index });
    }

    let placements = paginator.place_block(&items, 1, 2);
    let x = paginator.content_x();
    let header_size = ctx.config.typography.header_size;
    let body_size = ctx.config.typography.body_size;

    let header = ctx.text.fit_line(
        ctx.fonts,
        &header_text(message),
        Face::Bold,
        header_size,
        paginator.content_width(),
    );
    let first = placements[0];
    paginator.push_element(
        first.page_index,
        text_element(
            ctx.fonts,
            header.text,
            header.width,
            x,
            first.y,
            header_lh,
            Face::Bold,
            header_size,
            ctx.sender_color(&message.sender),
            ElementRole::MessageHeader(index),
        ),
    );

    for (i, line) in body.lines.into_iter().enumerate() {
        let placement = placements[i];
        let top = if i == 0 { placement.y + header_lh } else { placement.y };
        let element = text_element(
            ctx.fonts,
            line.text,
            line.width,
            x + ctx.config.body_indent,
            top,
            body_lh,
            line.face,
            body_size,
            line.color,
            ElementRole::MessageBody(index),
        );
        if let Some(uri) = &line.link {
            paginator.add_link(placement.page_index, link_over(&element, uri));
        }
        paginator.push_element(placement.page_index, element);
    }

    debug!(index, page = first.page_index + 1, "placed message");
}

/// `Monday, 3 March 2025`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

/// Label of the group holding messages whose timestamp did not parse.
pub const UNDATED_LABEL: &str = "Undated messages";

/// Draw a date separator: a thin rule with the date centered below it.
/// `keep_with` is the leading height of the message that follows; the
/// separator moves to a new page rather than end one on its own.
pub fn render_date_separator(
    ctx: &RenderContext<'_>,
    paginator: &mut Paginator,
    date: NaiveDate,
    keep_with: f64,
) {
    render_separator(ctx, paginator, &format_date(date), keep_with);
}

/// Separator over the undated group.
pub fn render_undated_separator(ctx: &RenderContext<'_>, paginator: &mut Paginator, keep_with: f64) {
    render_separator(ctx, paginator, UNDATED_LABEL, keep_with);
}

fn render_separator(ctx: &RenderContext<'_>, paginator: &mut Paginator, text: &str, keep_with: f64) {
    let height = ctx.config.date_separator_height;
    let size = ctx.config.typography.date_size;
    let line_height = ctx.config.line_height(size);
    if !paginator.fits(height + keep_with) {
        paginator.break_page();
    }
    let placement = paginator.reserve(height);

    let x = paginator.content_x();
    let width = paginator.content_width();
    let rule_y = placement.y + (height - line_height) / 2.0 - 2.0;
    paginator.push_element(
        placement.page_index,
        LayoutElement {
            x,
            y: rule_y.max(placement.y),
            width,
            height: 0.5,
            draw: DrawCommand::Rule {
                color: ctx.config.colors.muted,
                thickness: 0.5,
            },
            role: ElementRole::DateSeparator,
        },
    );

    let label = ctx
        .text
        .fit_line(ctx.fonts, text, Face::Bold, size, width);
    let text_x = x + (width - label.width) / 2.0;
    let text_top = placement.y + (height - line_height).max(0.0);
    paginator.push_element(
        placement.page_index,
        text_element(
            ctx.fonts,
            label.text,
            label.width,
            text_x,
            text_top,
            line_height,
            Face::Bold,
            size,
            ctx.config.colors.muted,
            ElementRole::DateSeparator,
        ),
    );
    debug!(label = text, page = placement.page_index + 1, "placed date separator");
}

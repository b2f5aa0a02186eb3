//! # Document Assembly
//!
//! Orchestrates one generation call: the document header, messages grouped
//! under date separators, the authentication summary, page footers and
//! finally PDF serialization.
//!
//! Each call owns its paginator, pages and media resolver, so an
//! [`Assembler`] can be reused, and shared between threads, freely.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{Color, RenderConfig};
use crate::error::ChatbookError;
use crate::font::{Face, FontContext};
use crate::hash::sha256_hex;
use crate::layout::pagination::{FooterStyle, Paginator};
use crate::layout::{text_element, DrawCommand, ElementRole, LayoutElement, LayoutPage};
use crate::media::MediaResolver;
use crate::model::{GeneratedDocument, GenerationRequest, LayoutWarning, Message};
use crate::pdf::{PdfInfo, PdfWriter};
use crate::render::{
    leading_height, render_date_separator, render_message, render_undated_separator, RenderContext,
};
use crate::summary::{SummaryBuilder, SummaryFooter};
use crate::text::TextLayout;

const DEFAULT_TITLE: &str = "Chat Transcript";

/// Pages and warnings from a layout pass, before serialization.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub pages: Vec<LayoutPage>,
    pub warnings: Vec<LayoutWarning>,
}

pub struct Assembler<'a> {
    fonts: &'a FontContext,
    config: &'a RenderConfig,
}

impl<'a> Assembler<'a> {
    pub fn new(fonts: &'a FontContext, config: &'a RenderConfig) -> Self {
        Self { fonts, config }
    }

    /// Lay out and serialize a document.
    pub fn assemble(&self, request: &GenerationRequest) -> Result<GeneratedDocument, ChatbookError> {
        let generated_at = request.metadata.generated_at.unwrap_or_else(Utc::now);
        let layout = self.layout_at(request, generated_at);

        let metadata = &request.metadata;
        let info = PdfInfo {
            title: document_title(request),
            author: metadata.participants.join(", "),
            subject: if metadata.source_file_name.trim().is_empty() {
                "Chat transcript".to_string()
            } else {
                format!("Chat transcript from {}", metadata.source_file_name.trim())
            },
            keywords: metadata.media_summary.clone(),
            creation_date: generated_at,
        };
        let bytes = PdfWriter::new().write(&layout.pages, &info, self.fonts)?;
        let sha256 = sha256_hex(&bytes);

        info!(
            pages = layout.pages.len(),
            warnings = layout.warnings.len(),
            size = bytes.len(),
            "document assembled"
        );
        Ok(GeneratedDocument {
            page_count: layout.pages.len(),
            sha256,
            bytes,
            warnings: layout.warnings,
        })
    }

    /// Lay out pages without serializing. Uses the request's generation
    /// time, or the current time when none is fixed.
    pub fn layout(&self, request: &GenerationRequest) -> DocumentLayout {
        let generated_at = request.metadata.generated_at.unwrap_or_else(Utc::now);
        self.layout_at(request, generated_at)
    }

    fn layout_at(&self, request: &GenerationRequest, generated_at: DateTime<Utc>) -> DocumentLayout {
        let config = self.config;
        let resolver = MediaResolver::new(&request.media);
        let mut warnings: Vec<LayoutWarning> = resolver.warnings().to_vec();
        let mut paginator = Paginator::new(
            &config.page,
            FooterStyle {
                font_size: config.typography.footer_size,
                color: config.colors.muted,
            },
        );

        self.document_header(&mut paginator, request, generated_at);

        let OrderedMessages { dated, undated } = order_messages(&request.messages, &mut warnings);
        let first_sender = request
            .metadata
            .participants
            .first()
            .cloned()
            .or_else(|| dated.first().map(|(_, _, m)| m.sender.clone()))
            .or_else(|| undated.first().map(|(_, m)| m.sender.clone()));
        let ctx = RenderContext::new(self.fonts, config, &resolver, first_sender);

        if dated.is_empty() && undated.is_empty() {
            self.lines(
                &mut paginator,
                "This transcript contains no messages.",
                Face::Regular,
                config.typography.body_size,
                config.colors.muted,
                ElementRole::DocumentHeader,
            );
        }

        let mut current_date: Option<NaiveDate> = None;
        for (index, timestamp, message) in &dated {
            let date = timestamp.date();
            if current_date != Some(date) {
                render_date_separator(&ctx, &mut paginator, date, leading_height(&ctx, message));
                current_date = Some(date);
            }
            render_message(&ctx, &mut paginator, *index, message, &mut warnings);
        }
        if let Some((_, first)) = undated.first() {
            render_undated_separator(&ctx, &mut paginator, leading_height(&ctx, first));
            for (index, message) in &undated {
                render_message(&ctx, &mut paginator, *index, message, &mut warnings);
            }
        }
        debug!(
            dated = dated.len(),
            undated = undated.len(),
            pages = paginator.page_count(),
            "messages laid out"
        );

        let footer = SummaryFooter {
            generated_at,
            source_hash: request.metadata.source_hash.as_deref(),
        };
        SummaryBuilder::new(self.fonts, config).build(
            &mut paginator,
            resolver.descriptors(),
            &footer,
            &mut warnings,
        );

        DocumentLayout {
            pages: paginator.finish(self.fonts),
            warnings,
        }
    }

    /// Title, provenance lines and a closing rule.
    fn document_header(
        &self,
        paginator: &mut Paginator,
        request: &GenerationRequest,
        generated_at: DateTime<Utc>,
    ) {
        let config = self.config;
        let metadata = &request.metadata;
        let typo = &config.typography;

        self.lines(
            paginator,
            &document_title(request),
            Face::Bold,
            typo.title_size,
            config.colors.text,
            ElementRole::DocumentHeader,
        );
        paginator.reserve(4.0);

        let mut meta = Vec::new();
        if !metadata.participants.is_empty() {
            meta.push(format!("Participants: {}", metadata.participants.join(", ")));
        }
        if !metadata.source_file_name.trim().is_empty() {
            meta.push(format!("Source file: {}", metadata.source_file_name.trim()));
        }
        meta.push(format!(
            "Source SHA-256: {}",
            metadata
                .source_hash
                .as_deref()
                .filter(|h| !h.trim().is_empty())
                .unwrap_or("not supplied")
        ));
        meta.push(format!(
            "Generated: {}",
            generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if !metadata.media_summary.trim().is_empty() {
            meta.push(format!("Media: {}", metadata.media_summary.trim()));
        }
        meta.push(format!("Messages: {}", request.messages.len()));

        for line in &meta {
            self.lines(
                paginator,
                line,
                Face::Regular,
                typo.meta_size,
                config.colors.muted,
                ElementRole::DocumentHeader,
            );
        }

        let placement = paginator.reserve(12.0);
        let x = paginator.content_x();
        let width = paginator.content_width();
        paginator.push_element(
            placement.page_index,
            LayoutElement {
                x,
                y: placement.y + 6.0,
                width,
                height: 0.75,
                draw: DrawCommand::Rule {
                    color: config.colors.muted,
                    thickness: 0.75,
                },
                role: ElementRole::DocumentHeader,
            },
        );
    }

    /// Wrapped lines at the left margin, kept together on one page.
    fn lines(
        &self,
        paginator: &mut Paginator,
        text: &str,
        face: Face,
        size: f64,
        color: Color,
        role: ElementRole,
    ) {
        let lh = self.config.line_height(size);
        let lines =
            TextLayout::new().break_into_lines(self.fonts, text, face, size, paginator.content_width());
        let placements = paginator.place_block(&vec![lh; lines.len()], 2, 2);
        let x = paginator.content_x();
        for (line, placement) in lines.into_iter().zip(placements) {
            paginator.push_element(
                placement.page_index,
                text_element(
                    self.fonts, line.text, line.width, x, placement.y, lh, face, size, color, role,
                ),
            );
        }
    }
}

fn document_title(request: &GenerationRequest) -> String {
    request
        .metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

/// Messages split by whether their timestamp parses, each tagged with its
/// index in the request.
struct OrderedMessages<'m> {
    /// Stably sorted by timestamp.
    dated: Vec<(usize, NaiveDateTime, &'m Message)>,
    /// Input order.
    undated: Vec<(usize, &'m Message)>,
}

/// Sort dated messages and set the undated ones aside with a warning each.
fn order_messages<'m>(messages: &'m [Message], warnings: &mut Vec<LayoutWarning>) -> OrderedMessages<'m> {
    let mut dated = Vec::with_capacity(messages.len());
    let mut undated = Vec::new();
    for (index, message) in messages.iter().enumerate() {
        match message.parsed_timestamp() {
            Some(ts) => dated.push((index, ts, message)),
            None => {
                warn!(index, timestamp = %message.timestamp, "unparseable timestamp; message moved to the undated group");
                warnings.push(LayoutWarning::InvalidTimestamp {
                    index,
                    timestamp: message.timestamp.clone(),
                });
                undated.push((index, message));
            }
        }
    }
    dated.sort_by_key(|(_, ts, _)| *ts);
    OrderedMessages { dated, undated }
}

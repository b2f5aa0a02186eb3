//! # Media Authentication Summary
//!
//! The closing section of every document: one table row per distinct media
//! descriptor with its integrity hash, so a reader can check any extracted
//! file against the archive.
//!
//! The table continues onto as many pages as it needs. Each continuation
//! page repeats the column header, and a row (its id line plus its hash
//! line) is never split. An optional row cap ends the table early with an
//! explicit "omitted" row.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::{Color, RenderConfig};
use crate::font::{Face, FontContext};
use crate::layout::pagination::Paginator;
use crate::layout::{text_element, DrawCommand, ElementRole, LayoutElement};
use crate::media::type_label;
use crate::model::{LayoutWarning, MediaDescriptor, MediaKind, MessageKind};
use crate::text::{sanitize, TextLayout};

pub const SUMMARY_TITLE: &str = "Media Authentication Summary";

/// Shown when no hash was stored or computed for a descriptor.
pub const MANIFEST_PLACEHOLDER: &str = "hash available in the companion manifest";

const INTRO: &str = "Every media item referenced in this transcript is listed below with the \
SHA-256 digest of the original file. Compare a digest against the extracted file to confirm \
it has not been altered.";

/// Column starts as fractions of the content width: ID, File name, Type.
const COLUMNS: [f64; 3] = [0.0, 0.30, 0.78];

/// Cut a name to at most `max_chars` characters, ending in `...` when cut.
/// Limits too small for the ellipsis cut without one.
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    let clean = sanitize(name.trim());
    if clean.chars().count() <= max_chars {
        return clean.into_owned();
    }
    if max_chars < 3 {
        return clean.chars().take(max_chars).collect();
    }
    let keep = max_chars - 3;
    let mut out: String = clean.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// `SHA-256: <hash>`, or the manifest placeholder.
pub fn hash_line(descriptor: &MediaDescriptor) -> String {
    match descriptor.hash.as_deref().map(str::trim) {
        Some(hash) if !hash.is_empty() => format!("SHA-256: {}", hash),
        _ => format!("SHA-256: {}", MANIFEST_PLACEHOLDER),
    }
}

fn message_kind_for(kind: MediaKind) -> MessageKind {
    match kind {
        MediaKind::Voice => MessageKind::Voice,
        MediaKind::Image => MessageKind::Image,
        MediaKind::Attachment | MediaKind::Document => MessageKind::Attachment,
    }
}

/// Inputs for the trailing provenance line.
pub struct SummaryFooter<'a> {
    pub generated_at: DateTime<Utc>,
    pub source_hash: Option<&'a str>,
}

pub struct SummaryBuilder<'a> {
    fonts: &'a FontContext,
    config: &'a RenderConfig,
    text: TextLayout,
}

impl<'a> SummaryBuilder<'a> {
    pub fn new(fonts: &'a FontContext, config: &'a RenderConfig) -> Self {
        Self {
            fonts,
            config,
            text: TextLayout::new(),
        }
    }

    fn line_height(&self) -> f64 {
        self.config.line_height(self.config.typography.summary_size)
    }

    /// Height of one table row: the id line plus the hash line.
    pub fn row_height(&self) -> f64 {
        self.line_height() * 2.0 + 2.0
    }

    /// Lay out the summary starting on a fresh page.
    pub fn build(
        &self,
        paginator: &mut Paginator,
        descriptors: &[&MediaDescriptor],
        footer: &SummaryFooter<'_>,
        warnings: &mut Vec<LayoutWarning>,
    ) {
        paginator.break_page();
        self.title(paginator, SUMMARY_TITLE);
        self.paragraph(paginator, INTRO, self.config.colors.text);
        self.column_header(paginator);

        let listed = match self.config.summary.max_rows {
            Some(cap) => cap.min(descriptors.len()),
            None => descriptors.len(),
        };

        for descriptor in &descriptors[..listed] {
            if !paginator.fits(self.row_height()) {
                paginator.break_page();
                self.title(paginator, &format!("{} (continued)", SUMMARY_TITLE));
                self.column_header(paginator);
            }
            self.row(paginator, descriptor);
        }

        let omitted = descriptors.len() - listed;
        if omitted > 0 {
            warn!(listed, omitted, "summary table truncated at configured row cap");
            warnings.push(LayoutWarning::SummaryTruncated { listed, omitted });
            self.paragraph(
                paginator,
                &format!(
                    "... {} more descriptors omitted; see the companion manifest",
                    omitted
                ),
                self.config.colors.warning,
            );
        }

        if descriptors.is_empty() {
            self.paragraph(paginator, "No media items were included.", self.config.colors.muted);
        }

        let provenance = format!(
            "Document generated {} from source {}",
            footer.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            footer.source_hash.filter(|h| !h.trim().is_empty()).unwrap_or("(hash not supplied)")
        );
        paginator.reserve(self.line_height() / 2.0);
        self.paragraph(paginator, &provenance, self.config.colors.muted);

        debug!(rows = listed, pages = paginator.page_count(), "summary laid out");
    }

    fn title(&self, paginator: &mut Paginator, title: &str) {
        let size = self.config.typography.title_size;
        let lh = self.config.line_height(size);
        let line = self
            .text
            .fit_line(self.fonts, title, Face::Bold, size, paginator.content_width());
        let placement = paginator.reserve(lh + 4.0);
        let x = paginator.content_x();
        paginator.push_element(
            placement.page_index,
            text_element(
                self.fonts,
                line.text,
                line.width,
                x,
                placement.y,
                lh,
                Face::Bold,
                size,
                self.config.colors.text,
                ElementRole::Summary,
            ),
        );
    }

    fn paragraph(&self, paginator: &mut Paginator, text: &str, color: Color) {
        let size = self.config.typography.summary_size;
        let lh = self.line_height();
        let lines = self.text.break_into_lines(
            self.fonts,
            text,
            Face::Regular,
            size,
            paginator.content_width(),
        );
        let heights = vec![lh; lines.len()];
        let placements = paginator.place_block(&heights, 2, 2);
        let x = paginator.content_x();
        for (line, placement) in lines.into_iter().zip(placements) {
            paginator.push_element(
                placement.page_index,
                text_element(
                    self.fonts,
                    line.text,
                    line.width,
                    x,
                    placement.y,
                    lh,
                    Face::Regular,
                    size,
                    color,
                    ElementRole::Summary,
                ),
            );
        }
    }

    fn column_header(&self, paginator: &mut Paginator) {
        let lh = self.line_height();
        // Keep the header with at least one row below it.
        if !paginator.fits(lh + 4.0 + self.row_height()) {
            paginator.break_page();
        }
        let placement = paginator.reserve(lh + 4.0);
        self.cells(
            paginator,
            placement.page_index,
            placement.y,
            ["ID", "File name", "Type"],
            Face::Bold,
        );
        let x = paginator.content_x();
        let width = paginator.content_width();
        paginator.push_element(
            placement.page_index,
            LayoutElement {
                x,
                y: placement.y + lh + 1.0,
                width,
                height: 0.5,
                draw: DrawCommand::Rule {
                    color: self.config.colors.muted,
                    thickness: 0.5,
                },
                role: ElementRole::Summary,
            },
        );
    }

    fn row(&self, paginator: &mut Paginator, descriptor: &MediaDescriptor) {
        let lh = self.line_height();
        let placement = paginator.reserve(self.row_height());
        let name = truncate_name(&descriptor.original_name, self.config.summary.name_max_chars);
        let label = type_label(message_kind_for(descriptor.kind), &descriptor.original_name);
        self.cells(
            paginator,
            placement.page_index,
            placement.y,
            [descriptor.id.as_str(), name.as_str(), label],
            Face::Regular,
        );

        let size = self.config.typography.summary_size;
        let x = paginator.content_x() + 8.0;
        let hash = self.text.fit_line(
            self.fonts,
            &hash_line(descriptor),
            Face::Regular,
            size,
            paginator.content_width() - 8.0,
        );
        paginator.push_element(
            placement.page_index,
            text_element(
                self.fonts,
                hash.text,
                hash.width,
                x,
                placement.y + lh,
                lh,
                Face::Regular,
                size,
                self.config.colors.muted,
                ElementRole::Summary,
            ),
        );
    }

    fn cells(&self, paginator: &mut Paginator, page_index: usize, top: f64, cells: [&str; 3], face: Face) {
        let size = self.config.typography.summary_size;
        let lh = self.line_height();
        let x0 = paginator.content_x();
        let width = paginator.content_width();
        for (i, cell) in cells.iter().enumerate() {
            let start = COLUMNS[i] * width;
            let end = COLUMNS.get(i + 1).map_or(width, |next| next * width);
            let line = self
                .text
                .fit_line(self.fonts, cell, face, size, end - start - 6.0);
            paginator.push_element(
                page_index,
                text_element(
                    self.fonts,
                    line.text,
                    line.width,
                    x0 + start,
                    top,
                    lh,
                    face,
                    size,
                    self.config.colors.text,
                    ElementRole::Summary,
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::pagination::FooterStyle;
    use chrono::TimeZone;

    fn descriptors(n: usize) -> Vec<MediaDescriptor> {
        (0..n)
            .map(|i| MediaDescriptor {
                id: format!("media-{:03}", i),
                message_id: Some(i as i64),
                original_name: format!("IMG-2025030{}-WA{:04}.jpg", i % 10, i),
                content_type: "image/jpeg".to_string(),
                hash: (i % 2 == 0).then(|| format!("{:064x}", i)),
                kind: MediaKind::Image,
            })
            .collect()
    }

    fn build(config: &RenderConfig, media: &[MediaDescriptor]) -> (Paginator, Vec<LayoutWarning>) {
        let fonts = FontContext::new();
        let mut pager = Paginator::new(
            &config.page,
            FooterStyle {
                font_size: 8.0,
                color: Color::BLACK,
            },
        );
        let refs: Vec<&MediaDescriptor> = media.iter().collect();
        let mut warnings = Vec::new();
        let footer = SummaryFooter {
            generated_at: Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap(),
            source_hash: Some("abc123"),
        };
        SummaryBuilder::new(&fonts, config).build(&mut pager, &refs, &footer, &mut warnings);
        (pager, warnings)
    }

    fn all_text(pager: &Paginator) -> String {
        pager
            .pages()
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn names_are_cut_to_the_limit() {
        let long = "a".repeat(60);
        let cut = truncate_name(&long, 40);
        assert_eq!(cut.chars().count(), 40);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_name("short.pdf", 40), "short.pdf");
        assert_eq!(truncate_name(&"b".repeat(40), 40), "b".repeat(40));
    }

    #[test]
    fn tiny_limits_never_exceed_the_limit() {
        assert_eq!(truncate_name("report.pdf", 2), "re");
        assert_eq!(truncate_name("report.pdf", 0), "");
        assert_eq!(truncate_name("report.pdf", 3), "...");
        assert_eq!(truncate_name("report.pdf", 4), "r...");
    }

    #[test]
    fn missing_hash_points_to_manifest() {
        let media = descriptors(2);
        assert_eq!(hash_line(&media[1]), "SHA-256: hash available in the companion manifest");
        assert_eq!(hash_line(&media[0]), format!("SHA-256: {:064x}", 0));
    }

    #[test]
    fn two_hundred_descriptors_continue_across_pages() {
        let config = RenderConfig::default();
        let media = descriptors(200);
        let (pager, warnings) = build(&config, &media);

        assert!(warnings.is_empty());
        assert!(pager.page_count() > 2);
        let text = all_text(&pager);
        for d in &media {
            assert!(text.contains(&d.id), "missing {}", d.id);
        }
        // Every page after the first repeats the header.
        for page in &pager.pages()[1..] {
            let t = page.plain_text();
            assert!(t.contains("Media Authentication Summary (continued)"));
            assert!(t.contains("File name"));
        }
        assert!(text.contains("Document generated 2025-03-04 12:00:00 UTC from source abc123"));
    }

    #[test]
    fn rows_are_never_split() {
        let config = RenderConfig::default();
        let (pager, _) = build(&config, &descriptors(200));
        for page in pager.pages() {
            let lines: Vec<_> = page.text_lines().map(|l| l.text.clone()).collect();
            for (i, line) in lines.iter().enumerate() {
                if line.starts_with("media-") {
                    assert!(lines[i + 3].starts_with("SHA-256: "));
                }
            }
        }
    }

    #[test]
    fn row_cap_truncates_explicitly() {
        let mut config = RenderConfig::default();
        config.summary.max_rows = Some(50);
        let (pager, warnings) = build(&config, &descriptors(200));
        assert_eq!(
            warnings,
            vec![LayoutWarning::SummaryTruncated {
                listed: 50,
                omitted: 150
            }]
        );
        let text = all_text(&pager);
        assert!(text.contains("media-049"));
        assert!(!text.contains("media-050"));
        assert!(text.contains("... 150 more descriptors omitted; see the companion manifest"));
    }

    #[test]
    fn empty_table_still_has_title_and_provenance() {
        let (pager, _) = build(&RenderConfig::default(), &[]);
        let text = all_text(&pager);
        assert!(text.contains(SUMMARY_TITLE));
        assert!(text.contains("No media items were included."));
    }
}

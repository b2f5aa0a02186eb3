//! # PDF Serializer
//!
//! Takes the laid-out pages and writes a PDF 1.7 file.
//!
//! The writer is hand-rolled: the subset a transcript needs (two fonts,
//! text, thin rules and link annotations) is small, and owning every byte
//! keeps the output deterministic. Identical pages and metadata always
//! serialize to identical bytes, including the trailer `/ID`, which is
//! derived from the document body rather than from a clock or random source.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root and info objects
//! %%EOF
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use chrono::{DateTime, Utc};
use miniz_oxide::deflate::compress_to_vec_zlib;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ChatbookError;
use crate::font::{CustomFontMetrics, Face, FontContext, FontData};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage, LinkAnnotation, TextLine};
use crate::text::sanitize;

/// Document-level metadata written to the Info dictionary.
#[derive(Debug, Clone)]
pub struct PdfInfo {
    pub title: String,
    /// Participants, comma separated.
    pub author: String,
    pub subject: String,
    /// Media summary.
    pub keywords: String,
    pub creation_date: DateTime<Utc>,
}

pub struct PdfWriter;

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Faces in resource order (/F0, /F1) with their font object ids.
    font_objects: Vec<(Face, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    /// Append an object and return its id.
    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(PdfObject { data });
        self.objects.len() - 1
    }

    fn push_stream(&mut self, dict_extra: &str, raw: &[u8]) -> usize {
        let compressed = compress_to_vec_zlib(raw, 6);
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< /Length {} /Filter /FlateDecode{} >>\nstream\n",
            compressed.len(),
            dict_extra
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        info: &PdfInfo,
        font_context: &FontContext,
    ) -> Result<Vec<u8>, ChatbookError> {
        if pages.is_empty() {
            return Err(ChatbookError::RenderError(
                "a document needs at least one page".to_string(),
            ));
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
        };

        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then per page: content stream, annotations, page
        builder.push(Vec::new());
        builder.push(Vec::new());
        builder.push(Vec::new());

        self.register_fonts(&mut builder, pages, font_context);
        let font_resources = Self::font_resource_dict(&builder.font_objects);

        let mut page_obj_ids: Vec<usize> = Vec::with_capacity(pages.len());
        for page in pages {
            let content = self.build_content_stream(page, &builder.font_objects, font_context);
            let content_obj_id = builder.push_stream("", content.as_bytes());

            let annot_ids: Vec<usize> = page
                .links
                .iter()
                .map(|link| builder.push(Self::link_annotation(link, page.height).into_bytes()))
                .collect();
            let annots = if annot_ids.is_empty() {
                String::new()
            } else {
                format!(" /Annots [{}]", Self::refs(&annot_ids))
            };

            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >>{} >>",
                page.width, page.height, content_obj_id, font_resources, annots
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            Self::refs(&page_obj_ids),
            page_obj_ids.len()
        )
        .into_bytes();

        let info_obj_id = builder.push(Self::info_dict(info).into_bytes());

        debug!(
            pages = pages.len(),
            objects = builder.objects.len() - 1,
            "serializing PDF"
        );
        Ok(self.serialize(&builder, info_obj_id))
    }

    fn refs(ids: &[usize]) -> String {
        ids.iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn info_dict(info: &PdfInfo) -> String {
        let mut dict = String::from("<< ");
        let _ = write!(dict, "/Title ({}) ", Self::escape_pdf_string(&sanitize(&info.title)));
        let _ = write!(dict, "/Author ({}) ", Self::escape_pdf_string(&sanitize(&info.author)));
        let _ = write!(dict, "/Subject ({}) ", Self::escape_pdf_string(&sanitize(&info.subject)));
        let _ = write!(dict, "/Keywords ({}) ", Self::escape_pdf_string(&sanitize(&info.keywords)));
        let _ = write!(
            dict,
            "/Creator (chatbook) /Producer (chatbook {}) /CreationDate (D:{}Z) >>",
            env!("CARGO_PKG_VERSION"),
            info.creation_date.format("%Y%m%d%H%M%S")
        );
        dict
    }

    fn link_annotation(link: &LinkAnnotation, page_height: f64) -> String {
        let x1 = link.x;
        let y1 = page_height - link.y - link.height;
        let x2 = link.x + link.width;
        let y2 = page_height - link.y;
        format!(
            "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
             /Border [0 0 0] /A << /S /URI /URI ({}) >> >>",
            x1,
            y1,
            x2,
            y2,
            Self::escape_pdf_string(&sanitize(&link.uri))
        )
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(
        &self,
        page: &LayoutPage,
        font_objects: &[(Face, usize)],
        font_context: &FontContext,
    ) -> String {
        let mut stream = String::new();
        for element in &page.elements {
            self.write_element(&mut stream, element, page.height, font_objects, font_context);
        }
        stream
    }

    /// Write a single layout element as PDF operators.
    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        font_objects: &[(Face, usize)],
        font_context: &FontContext,
    ) {
        match &element.draw {
            DrawCommand::Rule { color, thickness } => {
                let y = page_height - element.y;
                let _ = write!(
                    stream,
                    "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    color.r,
                    color.g,
                    color.b,
                    thickness,
                    element.x,
                    y,
                    element.x + element.width,
                    y
                );
            }

            DrawCommand::Text { line, color } => {
                if line.text.is_empty() {
                    return;
                }
                let font_index = font_objects
                    .iter()
                    .position(|(face, _)| *face == line.face)
                    .unwrap_or(0);
                let pdf_y = page_height - line.baseline;
                let _ = write!(
                    stream,
                    "BT\n{:.3} {:.3} {:.3} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n",
                    color.r, color.g, color.b, font_index, line.font_size, line.x, pdf_y
                );
                match font_context.resolve(line.face) {
                    FontData::Standard(_) => {
                        let _ = write!(stream, "({}) Tj\n", Self::escape_pdf_string(&line.text));
                    }
                    FontData::Custom { metrics, .. } => {
                        let _ = write!(stream, "<{}> Tj\n", Self::glyph_hex(line, metrics));
                    }
                }
                let _ = write!(stream, "ET\n");
            }
        }
    }

    /// Two-byte glyph ids for Identity-H encoded text.
    fn glyph_hex(line: &TextLine, metrics: &CustomFontMetrics) -> String {
        let fallback = metrics.glyph_ids.get(&'?').copied().unwrap_or(0);
        line.text
            .chars()
            .map(|ch| format!("{:04X}", metrics.glyph_ids.get(&ch).copied().unwrap_or(fallback)))
            .collect()
    }

    /// Register the faces used across all pages. Regular is always present
    /// so the footer-only case still has a font.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        font_context: &FontContext,
    ) {
        let mut faces: BTreeSet<Face> = BTreeSet::new();
        faces.insert(Face::Regular);
        for page in pages {
            faces.extend(page.text_lines().map(|line| line.face));
        }

        for face in faces {
            let obj_id = match font_context.resolve(face) {
                FontData::Standard(std_font) => builder.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    )
                    .into_bytes(),
                ),
                FontData::Custom { data, metrics } => {
                    Self::write_type0_font(builder, face, data, metrics)
                }
            };
            builder.font_objects.push((face, obj_id));
        }
    }

    /// Embed a TrueType face as a Type0 font with a CIDFontType2 descendant,
    /// Identity-H encoding and a ToUnicode map. The font file is embedded
    /// whole.
    fn write_type0_font(
        builder: &mut PdfBuilder,
        face: Face,
        data: &[u8],
        metrics: &CustomFontMetrics,
    ) -> usize {
        let base_font = match face {
            Face::Regular => "ChatbookCustom-Regular",
            Face::Bold => "ChatbookCustom-Bold",
        };
        let scale = 1000.0 / metrics.units_per_em.max(1) as f64;
        let ascent = (metrics.ascender as f64 * scale).round() as i64;
        let descent = (metrics.descender as f64 * scale).round() as i64;

        let font_file_id = builder.push_stream(&format!(" /Length1 {}", data.len()), data);

        let descriptor_id = builder.push(
            format!(
                "<< /Type /FontDescriptor /FontName /{} /Flags 32 \
                 /FontBBox [0 {} 1000 {}] /ItalicAngle 0 /Ascent {} /Descent {} \
                 /CapHeight {} /StemV 80 /FontFile2 {} 0 R >>",
                base_font, descent, ascent, ascent, descent, ascent, font_file_id
            )
            .into_bytes(),
        );

        // Sorted glyph -> (char, width) for a deterministic /W array.
        let glyphs: BTreeMap<u16, (char, f64)> = metrics
            .glyph_ids
            .iter()
            .map(|(&ch, &gid)| (gid, (ch, metrics.char_width(ch, 1000.0))))
            .collect();

        let mut widths = String::new();
        for (gid, (_, w)) in &glyphs {
            let _ = write!(widths, "{} [{}] ", gid, w.round() as i64);
        }
        let default_width = (metrics.default_advance as f64 * scale).round() as i64;

        let cid_font_id = builder.push(
            format!(
                "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
                 /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
                 /FontDescriptor {} 0 R /DW {} /W [{}] /CIDToGIDMap /Identity >>",
                base_font,
                descriptor_id,
                default_width,
                widths.trim_end()
            )
            .into_bytes(),
        );

        let cmap = Self::to_unicode_cmap(&glyphs);
        let to_unicode_id = builder.push_stream("", cmap.as_bytes());

        builder.push(
            format!(
                "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
                 /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
                base_font, cid_font_id, to_unicode_id
            )
            .into_bytes(),
        )
    }

    fn to_unicode_cmap(glyphs: &BTreeMap<u16, (char, f64)>) -> String {
        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let entries: Vec<_> = glyphs.iter().collect();
        // bfchar blocks hold at most 100 entries.
        for chunk in entries.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (gid, (ch, _)) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, *ch as u32);
            }
            let _ = writeln!(cmap, "endbfchar");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }

    fn font_resource_dict(font_objects: &[(Face, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Escape special characters in a PDF string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        // The file identifier is a digest of everything written so far.
        let digest = Sha256::digest(&output);
        let file_id = hex::encode_upper(&digest[..16]);

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R /ID [<{}> <{}>] >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            file_id,
            file_id,
            xref_offset
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;
    use crate::layout::{link_over, text_element, ElementRole};
    use chrono::TimeZone;

    fn info() -> PdfInfo {
        PdfInfo {
            title: "Chat with Bob".to_string(),
            author: "Alice, Bob".to_string(),
            subject: "WhatsApp export".to_string(),
            keywords: "2 images, 1 voice note".to_string(),
            creation_date: Utc.with_ymd_and_hms(2025, 3, 4, 12, 30, 0).unwrap(),
        }
    }

    fn page_with(face: Face, text: &str) -> LayoutPage {
        let ctx = FontContext::new();
        let mut page = LayoutPage::new(595.28, 841.89);
        let width = ctx.measure(text, face, 10.0);
        page.elements.push(text_element(
            &ctx,
            text.to_string(),
            width,
            50.0,
            50.0,
            14.0,
            face,
            10.0,
            Color::BLACK,
            ElementRole::MessageBody(0),
        ));
        page
    }

    fn content_streams(bytes: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        let mut rest = bytes;
        while let Some(start) = find(rest, b"stream\n") {
            let body = &rest[start + 7..];
            let Some(end) = find(body, b"\nendstream") else { break };
            if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
                out.push(String::from_utf8_lossy(&raw).into_owned());
            }
            rest = &body[end..];
        }
        out
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(
            PdfWriter::escape_pdf_string("Hello (World)"),
            "Hello \\(World\\)"
        );
        assert_eq!(
            PdfWriter::escape_pdf_string("back\\slash"),
            "back\\\\slash"
        );
    }

    #[test]
    fn test_empty_page_produces_valid_pdf() {
        let pages = vec![LayoutPage::new(595.28, 841.89)];
        let bytes = PdfWriter::new().write(&pages, &info(), &FontContext::new()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        assert!(bytes.windows(4).any(|w| w == b"xref"));
        assert!(bytes.windows(7).any(|w| w == b"trailer"));
    }

    #[test]
    fn no_pages_is_an_error() {
        assert!(PdfWriter::new().write(&[], &info(), &FontContext::new()).is_err());
    }

    #[test]
    fn test_metadata_in_pdf() {
        let pages = vec![LayoutPage::new(595.28, 841.89)];
        let bytes = PdfWriter::new().write(&pages, &info(), &FontContext::new()).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Title (Chat with Bob)"));
        assert!(text.contains("/Author (Alice, Bob)"));
        assert!(text.contains("/Keywords (2 images, 1 voice note)"));
        assert!(text.contains("/CreationDate (D:20250304123000Z)"));
        assert!(text.contains("/ID [<"));
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let mut page = page_with(Face::Regular, "A");
        page.elements.extend(page_with(Face::Bold, "A").elements);
        let bytes = PdfWriter::new().write(&[page], &info(), &FontContext::new()).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
    }

    #[test]
    fn text_is_drawn_in_content_stream() {
        let page = page_with(Face::Regular, "Hello (there)");
        let bytes = PdfWriter::new().write(&[page], &info(), &FontContext::new()).unwrap();
        let streams = content_streams(&bytes);
        assert!(streams.iter().any(|s| s.contains("(Hello \\(there\\)) Tj")));
    }

    #[test]
    fn links_become_uri_annotations() {
        let mut page = page_with(Face::Bold, "View PDF: a.pdf");
        let link = link_over(&page.elements[0], "https://files.test/m/1");
        page.links.push(link);
        let bytes = PdfWriter::new().write(&[page], &info(), &FontContext::new()).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("/Annots ["));
        assert!(text.contains("/Subtype /Link"));
        assert!(text.contains("/A << /S /URI /URI (https://files.test/m/1) >>"));
        // Box flipped into PDF space: top at 841.89 - 50.
        assert!(text.contains(" 791.89] /Border"));
    }

    #[test]
    fn output_is_deterministic() {
        let page = page_with(Face::Regular, "same");
        let a = PdfWriter::new().write(&[page.clone()], &info(), &FontContext::new()).unwrap();
        let b = PdfWriter::new().write(&[page], &info(), &FontContext::new()).unwrap();
        assert_eq!(a, b);

        let other = page_with(Face::Regular, "different");
        let c = PdfWriter::new().write(&[other], &info(), &FontContext::new()).unwrap();
        let id = |bytes: &[u8]| {
            let text = String::from_utf8_lossy(bytes).into_owned();
            text[text.find("/ID").unwrap()..].lines().next().unwrap().to_string()
        };
        assert_ne!(id(&a), id(&c));
    }
}

//! # Media Resolution
//!
//! Maps messages to their attachment descriptors and decides where each
//! media link points.
//!
//! The resolver is built fresh for every document from the caller's
//! descriptor list; it holds no global state. When upstream data maps two
//! descriptors to one message, the first one wins and the conflict is
//! recorded as a warning rather than guessed away.

use std::collections::HashMap;

use tracing::{debug, warn};
use url::Url;

use crate::model::{LayoutWarning, MediaDescriptor, Message, MessageKind};

/// Link target used when nothing better is known. It keeps the line
/// clickable without pointing anywhere real.
pub const UNAVAILABLE_LINK: &str = "#media-unavailable";

/// Display name used when neither descriptor nor message names the file.
pub const UNKNOWN_FILE: &str = "unknown_file";

/// Where a media line links to, in order of preference.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// The message already carried an absolute proxy-style reference.
    Direct(String),
    /// Synthesized from the descriptor id and the configured base address.
    Proxy(String),
    /// Nothing usable; the placeholder link is emitted.
    Unavailable,
}

impl LinkTarget {
    pub fn uri(&self) -> &str {
        match self {
            LinkTarget::Direct(uri) | LinkTarget::Proxy(uri) => uri,
            LinkTarget::Unavailable => UNAVAILABLE_LINK,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, LinkTarget::Unavailable)
    }
}

/// Per-document lookup tables over the caller's descriptors.
#[derive(Debug)]
pub struct MediaResolver<'a> {
    /// Distinct descriptors in input order.
    descriptors: Vec<&'a MediaDescriptor>,
    by_id: HashMap<&'a str, usize>,
    by_message_id: HashMap<i64, usize>,
    warnings: Vec<LayoutWarning>,
}

impl<'a> MediaResolver<'a> {
    pub fn new(media: &'a [MediaDescriptor]) -> Self {
        let mut resolver = MediaResolver {
            descriptors: Vec::with_capacity(media.len()),
            by_id: HashMap::with_capacity(media.len()),
            by_message_id: HashMap::new(),
            warnings: Vec::new(),
        };

        for descriptor in media {
            if resolver.by_id.contains_key(descriptor.id.as_str()) {
                debug!(id = %descriptor.id, "skipping repeated media descriptor id");
                continue;
            }
            let idx = resolver.descriptors.len();
            resolver.descriptors.push(descriptor);
            resolver.by_id.insert(descriptor.id.as_str(), idx);

            let Some(message_id) = descriptor.message_id else {
                continue;
            };
            match resolver.by_message_id.get(&message_id) {
                Some(&kept_idx) => {
                    let kept = &resolver.descriptors[kept_idx].id;
                    warn!(
                        message_id,
                        kept = %kept,
                        ignored = %descriptor.id,
                        "two media descriptors claim the same message; keeping the first"
                    );
                    resolver.warnings.push(LayoutWarning::DuplicateMediaForMessage {
                        message_id,
                        kept: kept.clone(),
                        ignored: descriptor.id.clone(),
                    });
                }
                None => {
                    resolver.by_message_id.insert(message_id, idx);
                }
            }
        }

        resolver
    }

    pub fn get(&self, id: &str) -> Option<&'a MediaDescriptor> {
        self.by_id.get(id).map(|&idx| self.descriptors[idx])
    }

    pub fn for_message_id(&self, message_id: i64) -> Option<&'a MediaDescriptor> {
        self.by_message_id
            .get(&message_id)
            .map(|&idx| self.descriptors[idx])
    }

    /// Descriptor for a message: by owning-message id first, then by the
    /// message's media reference naming a descriptor id.
    pub fn for_message(&self, message: &Message) -> Option<&'a MediaDescriptor> {
        message
            .id
            .and_then(|id| self.for_message_id(id))
            .or_else(|| message.media_ref.as_deref().and_then(|r| self.get(r.trim())))
    }

    /// Distinct descriptors in the order the caller supplied them.
    pub fn descriptors(&self) -> &[&'a MediaDescriptor] {
        &self.descriptors
    }

    /// Data-quality warnings recorded while building the tables.
    pub fn warnings(&self) -> &[LayoutWarning] {
        &self.warnings
    }

    /// Decide where a media message links to.
    pub fn link_target(
        &self,
        message: &Message,
        media: Option<&MediaDescriptor>,
        base_url: Option<&str>,
    ) -> LinkTarget {
        let carried = message
            .media_ref
            .as_deref()
            .into_iter()
            .chain(std::iter::once(message.content.as_str()))
            .map(str::trim)
            .find_map(parse_proxy_reference);
        if let Some(url) = carried {
            // The serialized form is ASCII with non-ASCII parts percent-encoded.
            return LinkTarget::Direct(url.as_str().to_string());
        }

        if let (Some(descriptor), Some(base)) = (media, base_url) {
            if let Some(uri) = proxy_url(base, &descriptor.id) {
                return LinkTarget::Proxy(uri);
            }
            warn!(base, "media base address is not a valid absolute URL");
        }

        LinkTarget::Unavailable
    }
}

/// An absolute, well-formed http(s) URL with a host.
pub fn is_proxy_reference(candidate: &str) -> bool {
    parse_proxy_reference(candidate).is_some()
}

fn parse_proxy_reference(candidate: &str) -> Option<Url> {
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(candidate).ok()?;
    (matches!(url.scheme(), "http" | "https") && url.host_str().is_some()).then_some(url)
}

/// Append a descriptor id as one percent-encoded path segment of `base`.
pub fn proxy_url(base: &str, id: &str) -> Option<String> {
    let mut url = Url::parse(base.trim()).ok()?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.path_segments_mut().ok()?.pop_if_empty().push(id);
    Some(url.to_string())
}

/// Name shown to the reader for a media message.
pub fn display_name(message: &Message, media: Option<&MediaDescriptor>) -> String {
    if let Some(descriptor) = media {
        if !descriptor.original_name.trim().is_empty() {
            return descriptor.original_name.trim().to_string();
        }
    }
    let fallback = message
        .media_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty() && !is_proxy_reference(r) && !r.contains('/'));
    match fallback {
        Some(name) => name.to_string(),
        None => UNKNOWN_FILE.to_string(),
    }
}

/// Human-readable type for a file, derived from its extension.
pub fn type_label(kind: MessageKind, name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let by_extension = match ext.as_str() {
        "pdf" => Some("PDF"),
        "doc" | "docx" | "odt" | "rtf" => Some("Word Document"),
        "xls" | "xlsx" | "ods" | "csv" => Some("Spreadsheet"),
        "ppt" | "pptx" | "odp" => Some("Presentation"),
        "zip" | "rar" | "7z" | "tar" | "gz" => Some("Archive"),
        "mp4" | "mov" | "avi" | "mkv" | "webm" | "3gp" => Some("Video"),
        "mp3" | "wav" | "ogg" | "opus" | "m4a" | "aac" => Some("Audio"),
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" => Some("Image"),
        "txt" => Some("Text"),
        "vcf" => Some("Contact"),
        _ => None,
    };
    match (by_extension, kind) {
        (Some(label), _) => label,
        (None, MessageKind::Image) => "Image",
        (None, MessageKind::Voice) => "Audio",
        (None, _) => "File",
    }
}

/// `m:ss`, seconds floor-rounded and zero-padded. Negative and NaN
/// durations read as zero.
pub fn format_duration(seconds: f64) -> String {
    // NaN fails the comparison; `as` saturates.
    let whole = if seconds > 0.0 { seconds.floor() as u64 } else { 0 };
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MediaKind;

    fn descriptor(id: &str, message_id: Option<i64>, name: &str) -> MediaDescriptor {
        MediaDescriptor {
            id: id.to_string(),
            message_id,
            original_name: name.to_string(),
            content_type: "application/octet-stream".to_string(),
            hash: None,
            kind: MediaKind::Attachment,
        }
    }

    fn message(id: Option<i64>, kind: MessageKind, media_ref: Option<&str>, content: &str) -> Message {
        Message {
            id,
            timestamp: "2024-01-01 10:00".to_string(),
            sender: "A".to_string(),
            content: content.to_string(),
            kind,
            media_ref: media_ref.map(str::to_string),
            duration_seconds: None,
        }
    }

    #[test]
    fn unique_message_ids_resolve_exactly() {
        let media = vec![
            descriptor("m1", Some(1), "a.pdf"),
            descriptor("m2", Some(2), "b.pdf"),
            descriptor("doc", None, "export.pdf"),
        ];
        let resolver = MediaResolver::new(&media);
        assert_eq!(resolver.for_message_id(1).unwrap().id, "m1");
        assert_eq!(resolver.for_message_id(2).unwrap().id, "m2");
        assert!(resolver.for_message_id(3).is_none());
        assert!(resolver.warnings().is_empty());
        assert_eq!(resolver.descriptors().len(), 3);
    }

    #[test]
    fn duplicate_message_id_keeps_first_and_warns_once() {
        let media = vec![
            descriptor("first", Some(7), "a.jpg"),
            descriptor("second", Some(7), "b.jpg"),
        ];
        let resolver = MediaResolver::new(&media);
        assert_eq!(resolver.for_message_id(7).unwrap().id, "first");
        assert_eq!(
            resolver.warnings(),
            &[LayoutWarning::DuplicateMediaForMessage {
                message_id: 7,
                kept: "first".to_string(),
                ignored: "second".to_string(),
            }]
        );
        // Both still appear in the authentication table.
        assert_eq!(resolver.descriptors().len(), 2);
    }

    #[test]
    fn repeated_descriptor_ids_are_listed_once() {
        let media = vec![descriptor("x", None, "a"), descriptor("x", None, "b")];
        let resolver = MediaResolver::new(&media);
        assert_eq!(resolver.descriptors().len(), 1);
        assert_eq!(resolver.get("x").unwrap().original_name, "a");
    }

    #[test]
    fn media_ref_can_name_a_descriptor() {
        let media = vec![descriptor("abc", None, "a.pdf")];
        let resolver = MediaResolver::new(&media);
        let msg = message(None, MessageKind::Attachment, Some("abc"), "");
        assert_eq!(resolver.for_message(&msg).unwrap().id, "abc");
    }

    #[test]
    fn carried_proxy_reference_wins() {
        let media = vec![descriptor("m1", Some(1), "a.pdf")];
        let resolver = MediaResolver::new(&media);
        let msg = message(Some(1), MessageKind::Attachment, Some("https://proxy.test/media/zz"), "");
        let target = resolver.link_target(&msg, resolver.for_message(&msg), Some("https://base.test"));
        assert_eq!(target, LinkTarget::Direct("https://proxy.test/media/zz".to_string()));
    }

    #[test]
    fn content_may_carry_the_reference() {
        let resolver = MediaResolver::new(&[]);
        let msg = message(None, MessageKind::Image, None, " https://proxy.test/m/1 ");
        assert_eq!(
            resolver.link_target(&msg, None, None),
            LinkTarget::Direct("https://proxy.test/m/1".to_string())
        );
    }

    #[test]
    fn carried_reference_is_emitted_percent_encoded() {
        let resolver = MediaResolver::new(&[]);
        let msg = message(None, MessageKind::Image, Some("https://proxy.test/média/ü.jpg"), "");
        let target = resolver.link_target(&msg, None, None);
        assert_eq!(
            target,
            LinkTarget::Direct("https://proxy.test/m%C3%A9dia/%C3%BC.jpg".to_string())
        );
        assert!(target.uri().is_ascii());
    }

    #[test]
    fn synthesizes_from_base_when_no_reference() {
        let media = vec![descriptor("id with space", Some(1), "a.pdf")];
        let resolver = MediaResolver::new(&media);
        let msg = message(Some(1), MessageKind::Attachment, Some("IMG-001.jpg"), "");
        let target = resolver.link_target(&msg, resolver.for_message(&msg), Some("https://base.test/media/"));
        assert_eq!(target, LinkTarget::Proxy("https://base.test/media/id%20with%20space".to_string()));
    }

    #[test]
    fn unavailable_without_descriptor_or_reference() {
        let resolver = MediaResolver::new(&[]);
        let msg = message(None, MessageKind::Image, Some("IMG-001.jpg"), "");
        let target = resolver.link_target(&msg, None, Some("https://base.test"));
        assert_eq!(target, LinkTarget::Unavailable);
        assert_eq!(target.uri(), UNAVAILABLE_LINK);
        assert!(!target.is_resolved());
    }

    #[test]
    fn malformed_references_are_not_proxy_style() {
        assert!(!is_proxy_reference("ftp://x.test/a"));
        assert!(!is_proxy_reference("/relative/path"));
        assert!(!is_proxy_reference("https://"));
        assert!(!is_proxy_reference("https://a b.test"));
        assert!(is_proxy_reference("http://localhost:8080/m/1"));
    }

    #[test]
    fn type_labels_from_extension() {
        assert_eq!(type_label(MessageKind::Attachment, "report.PDF"), "PDF");
        assert_eq!(type_label(MessageKind::Attachment, "notes.docx"), "Word Document");
        assert_eq!(type_label(MessageKind::Attachment, "clip.mp4"), "Video");
        assert_eq!(type_label(MessageKind::Attachment, "bundle.zip"), "Archive");
        assert_eq!(type_label(MessageKind::Attachment, "mystery"), "File");
        assert_eq!(type_label(MessageKind::Image, UNKNOWN_FILE), "Image");
    }

    #[test]
    fn durations_are_floor_and_zero_padded() {
        assert_eq!(format_duration(125.0), "2:05");
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(59.0), "0:59");
        assert_eq!(format_duration(3600.0), "60:00");
    }

    #[test]
    fn fractional_and_bad_durations() {
        assert_eq!(format_duration(125.7), "2:05");
        assert_eq!(format_duration(59.999), "0:59");
        assert_eq!(format_duration(-4.0), "0:00");
        assert_eq!(format_duration(f64::NAN), "0:00");
    }

    #[test]
    fn display_name_fallbacks() {
        let with_desc = descriptor("m1", None, "holiday.jpg");
        let msg = message(None, MessageKind::Image, Some("IMG-1.jpg"), "");
        assert_eq!(display_name(&msg, Some(&with_desc)), "holiday.jpg");
        assert_eq!(display_name(&msg, None), "IMG-1.jpg");
        let url_msg = message(None, MessageKind::Image, Some("https://x.test/a.jpg"), "");
        assert_eq!(display_name(&url_msg, None), UNKNOWN_FILE);
    }
}

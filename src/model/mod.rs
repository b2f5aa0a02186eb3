//! # Document Model
//!
//! The input representation consumed by the assembler, and the output it
//! hands back. Inputs come from an external chat-export parser and are
//! treated as immutable for the duration of one generation call.
//!
//! Every input type deserializes from camelCase JSON so a request can be
//! produced by any collaborator, not only Rust callers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Ordinal id, assigned when the message was persisted upstream.
    #[serde(default)]
    pub id: Option<i64>,
    /// RFC 3339, or a naive `YYYY-MM-DD HH:MM[:SS]` local timestamp.
    pub timestamp: String,
    pub sender: String,
    /// Text body. For non-text kinds this may hold the raw media reference.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub media_ref: Option<String>,
    /// Voice notes only. Fractional seconds are accepted.
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

impl Message {
    /// Local wall-clock time of the message, or `None` if the timestamp
    /// does not parse. Offset-carrying timestamps keep the wall clock of
    /// their own offset, which is what the sender saw.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_local());
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }

    /// Calendar date used for grouping.
    pub fn local_date(&self) -> Option<NaiveDate> {
        self.parsed_timestamp().map(|ts| ts.date())
    }
}

/// Closed set of message kinds; the renderer handles each exhaustively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Voice,
    Image,
    Attachment,
}

/// Metadata for one binary attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub id: String,
    /// Owning message. `None` for items not tied to a single message.
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub content_type: String,
    /// Hex SHA-256 of the media bytes, if already known.
    #[serde(default)]
    pub hash: Option<String>,
    pub kind: MediaKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Voice,
    Image,
    Attachment,
    Document,
}

impl MediaKind {
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Voice => "Voice",
            MediaKind::Image => "Image",
            MediaKind::Attachment => "Attachment",
            MediaKind::Document => "Document",
        }
    }
}

/// Descriptive metadata printed on the first page and in the PDF Info
/// dictionary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub participants: Vec<String>,
    pub source_file_name: String,
    pub source_hash: Option<String>,
    /// Human-readable summary of which media kinds were included.
    pub media_summary: String,
    /// Fixed generation time. `None` means "now", which makes the output
    /// differ between runs.
    pub generated_at: Option<DateTime<Utc>>,
}

/// Everything one document generation consumes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationRequest {
    pub messages: Vec<Message>,
    pub media: Vec<MediaDescriptor>,
    pub metadata: DocumentMetadata,
}

/// A recoverable or data-quality condition met during assembly. Each is
/// also logged when it is recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum LayoutWarning {
    /// The message's timestamp did not parse; it was drawn under the
    /// undated group instead of a date separator.
    InvalidTimestamp { index: usize, timestamp: String },
    /// A second descriptor claimed a message that already had one.
    DuplicateMediaForMessage {
        message_id: i64,
        kept: String,
        ignored: String,
    },
    /// No usable link target exists for a media message.
    UnresolvedMedia { index: usize, kind: MessageKind },
    /// A message taller than a whole page had to be split.
    OversizedMessage { index: usize },
    /// The summary table hit its configured row cap.
    SummaryTruncated { listed: usize, omitted: usize },
}

/// A finished document, ready for the caller to persist.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Hex SHA-256 of `bytes`, for the caller's companion manifest.
    pub sha256: String,
    pub warnings: Vec<LayoutWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(ts: &str) -> Message {
        Message {
            id: None,
            timestamp: ts.to_string(),
            sender: "A".to_string(),
            content: String::new(),
            kind: MessageKind::Text,
            media_ref: None,
            duration_seconds: None,
        }
    }

    #[test]
    fn parses_rfc3339_keeping_wall_clock() {
        let ts = msg("2024-03-01T23:30:00+02:00").parsed_timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-03-01 23:30:00");
    }

    #[test]
    fn parses_naive_formats() {
        assert!(msg("2024-03-01 08:05").parsed_timestamp().is_some());
        assert!(msg("2024-03-01 08:05:09").parsed_timestamp().is_some());
        assert!(msg("2024-03-01T08:05:09").parsed_timestamp().is_some());
        assert!(msg(" 2024-03-01 08:05:09.250 ").parsed_timestamp().is_some());
    }

    #[test]
    fn invalid_timestamp_is_none() {
        assert!(msg("yesterday").parsed_timestamp().is_none());
        assert!(msg("2024-13-40 10:00").parsed_timestamp().is_none());
    }

    #[test]
    fn message_json_defaults() {
        let m: Message =
            serde_json::from_str(r#"{ "timestamp": "2024-01-01 10:00", "sender": "Bo" }"#).unwrap();
        assert_eq!(m.kind, MessageKind::Text);
        assert!(m.content.is_empty());
    }

    #[test]
    fn kinds_are_lowercase_in_json() {
        let m: Message = serde_json::from_str(
            r#"{ "timestamp": "t", "sender": "s", "kind": "voice", "durationSeconds": 3 }"#,
        )
        .unwrap();
        assert_eq!(m.kind, MessageKind::Voice);
        assert_eq!(m.duration_seconds, Some(3.0));
        assert!(serde_json::from_str::<Message>(r#"{ "timestamp": "t", "sender": "s", "kind": "sticker" }"#).is_err());
    }

    #[test]
    fn fractional_duration_deserializes() {
        let m: Message = serde_json::from_str(
            r#"{ "timestamp": "t", "sender": "s", "kind": "voice", "durationSeconds": 125.7 }"#,
        )
        .unwrap();
        assert_eq!(m.duration_seconds, Some(125.7));
    }
}

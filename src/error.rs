//! Structured error types for the chatbook engine.
//!
//! Only resource and integrity failures surface here. Malformed chat content
//! (bad timestamps, missing media, unresolvable links) never produces an
//! error; it is recorded as a [`crate::model::LayoutWarning`] instead.

use thiserror::Error;

/// The unified error type returned by all public chatbook API functions.
#[derive(Debug, Error)]
pub enum ChatbookError {
    /// JSON input (request or configuration) failed to parse.
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    ParseError {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// A font could not be loaded, parsed, or embedded.
    #[error("Font error: {0}")]
    FontError(String),

    /// Layout or PDF generation failed.
    #[error("Render error: {0}")]
    RenderError(String),

    /// Reading configuration, fonts or media from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for ChatbookError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected schema. Check field names and types (camelCase).".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ChatbookError::ParseError { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_a_hint() {
        let err: ChatbookError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse input"));
        assert!(msg.contains("Hint: Check for trailing commas"));
    }

    #[test]
    fn font_error_display() {
        let err = ChatbookError::FontError("bad magic".to_string());
        assert_eq!(err.to_string(), "Font error: bad magic");
    }
}

//! Resolve a font source string to raw TrueType bytes.
//!
//! Supported forms:
//! - `data:font/...;base64,...` data URI
//! - file path with an explicit `/`, `./` or `../` prefix
//! - raw base64

use crate::error::ChatbookError;

pub fn read_font_source(src: &str) -> Result<Vec<u8>, ChatbookError> {
    if src.starts_with("data:") {
        let comma_pos = src
            .find(',')
            .ok_or_else(|| ChatbookError::FontError("Invalid data URI: missing comma".to_string()))?;
        return base64_decode(&src[comma_pos + 1..]);
    }

    // Only explicit path prefixes count as paths; base64 may contain '/'.
    if src.starts_with('/') || src.starts_with("./") || src.starts_with("../") {
        return std::fs::read(src).map_err(|e| {
            ChatbookError::FontError(format!("Failed to read font file '{}': {}", src, e))
        });
    }

    base64_decode(src)
}

fn base64_decode(input: &str) -> Result<Vec<u8>, ChatbookError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(input.trim())
        .map_err(|e| ChatbookError::FontError(format!("Base64 decode error: {}", e)))
}

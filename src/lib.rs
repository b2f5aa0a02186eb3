//! # Chatbook
//!
//! Turns an archived chat transcript into a paginated PDF.
//!
//! The caller hands over an already-parsed conversation (messages, media
//! descriptors, document metadata) and gets back finished PDF bytes plus a
//! list of data-quality warnings. Messages are grouped under date
//! separators, media messages become clickable links, and every document
//! ends with a media authentication table listing each attachment's
//! SHA-256 digest.
//!
//! Rendering is best effort: bad timestamps, unresolvable media and
//! duplicate descriptors are recorded as warnings, never errors. Only
//! resource failures (an unreadable font, invalid JSON) abort a run.
//!
//! ## Architecture
//!
//! ```text
//! GenerationRequest (JSON/API)
//!       ↓
//!   [hash]      : optional: fill missing media hashes before layout
//!       ↓
//!   [assemble]  : header, date groups, messages, summary
//!       ↓          using [render], [summary], [media], [text], [font]
//!   [layout]    : paginator, page-break decisions, positioned lines
//!       ↓
//!   [pdf]       : serialize to PDF bytes
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod font;
pub mod hash;
pub mod layout;
pub mod media;
pub mod model;
pub mod pdf;
pub mod render;
pub mod summary;
pub mod text;

use assemble::Assembler;
use config::RenderConfig;
use error::ChatbookError;
use font::FontContext;
use model::{GeneratedDocument, GenerationRequest};

/// Render a transcript to a PDF document.
///
/// This is the primary entry point. Fonts named in the configuration are
/// loaded first; failing to load one is the only way this returns an error
/// for a well-formed request.
pub fn render(
    request: &GenerationRequest,
    config: &RenderConfig,
) -> Result<GeneratedDocument, ChatbookError> {
    let font_context = FontContext::from_config(&config.fonts)?;
    Assembler::new(&font_context, config).assemble(request)
}

/// Render a transcript described as JSON.
pub fn render_json(json: &str, config: &RenderConfig) -> Result<GeneratedDocument, ChatbookError> {
    let request: GenerationRequest = serde_json::from_str(json)?;
    render(&request, config)
}

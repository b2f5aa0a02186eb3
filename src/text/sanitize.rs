//! Narrow-charset sanitization.
//!
//! The standard fonts are drawn with WinAnsiEncoding, and the layout
//! measures with ASCII width tables, so the engine's contract is printable
//! ASCII. A handful of common typographic characters are transliterated;
//! everything else (emoji, CJK, control characters) becomes
//! [`PLACEHOLDER`]. Text is sanitized once, before measurement, and the
//! sanitized string is what gets drawn.

use std::borrow::Cow;

/// Substitute for characters outside the supported range.
pub const PLACEHOLDER: char = '?';

fn transliterate(ch: char) -> Option<&'static str> {
    let s = match ch {
        '\t' | '\n' | '\r' | '\u{00A0}' | '\u{2007}' | '\u{202F}' => " ",
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => "\"",
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => "-",
        '\u{2026}' => "...",
        '\u{2022}' | '\u{00B7}' => "*",
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FE0F}' | '\u{FEFF}' => "",
        _ => return None,
    };
    Some(s)
}

fn is_safe(ch: char) -> bool {
    matches!(ch, ' '..='~')
}

/// Replace everything outside printable ASCII. Borrows when nothing changes.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_safe) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if is_safe(ch) {
            out.push(ch);
        } else if let Some(rep) = transliterate(ch) {
            out.push_str(rep);
        } else {
            out.push(PLACEHOLDER);
        }
    }
    Cow::Owned(out)
}

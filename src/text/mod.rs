//! # Text Layout
//!
//! Greedy word wrapping against real font metrics.
//!
//! [`TextLayout::break_into_lines`] is the single source of truth: the line
//! count estimate the paginator uses is derived from it, so predicted and
//! drawn heights can never disagree.

pub mod sanitize;

use crate::font::{Face, FontContext};
pub use sanitize::sanitize;

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    /// Sanitized text, exactly as it will be drawn.
    pub text: String,
    /// Measured width in points.
    pub width: f64,
}

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Break text into lines no wider than `max_width`.
    ///
    /// Paragraphs (separated by `\n`, `\r\n` or `\r`) are wrapped
    /// independently; an empty paragraph is one empty line, so empty input
    /// still yields one line. Words are accumulated greedily. A word wider
    /// than `max_width` on its own is cut character by character.
    pub fn break_into_lines(
        &self,
        font_context: &FontContext,
        text: &str,
        face: Face,
        font_size: f64,
        max_width: f64,
    ) -> Vec<BrokenLine> {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let mut lines = Vec::new();
        for paragraph in normalized.split('\n') {
            let clean = sanitize(paragraph);
            self.break_paragraph(font_context, &clean, face, font_size, max_width, &mut lines);
        }
        lines
    }

    /// Wrapped line strings. See [`TextLayout::break_into_lines`].
    pub fn wrap(
        &self,
        font_context: &FontContext,
        text: &str,
        face: Face,
        font_size: f64,
        max_width: f64,
    ) -> Vec<String> {
        self.break_into_lines(font_context, text, face, font_size, max_width)
            .into_iter()
            .map(|line| line.text)
            .collect()
    }

    /// Number of lines [`TextLayout::wrap`] produces for the same input.
    pub fn estimate_line_count(
        &self,
        font_context: &FontContext,
        text: &str,
        face: Face,
        font_size: f64,
        max_width: f64,
    ) -> usize {
        self.break_into_lines(font_context, text, face, font_size, max_width)
            .len()
            .max(1)
    }

    /// Shorten a single line with a trailing `...` until it fits.
    pub fn fit_line(
        &self,
        font_context: &FontContext,
        text: &str,
        face: Face,
        font_size: f64,
        max_width: f64,
    ) -> BrokenLine {
        let clean = sanitize(text);
        let width = font_context.measure(&clean, face, font_size);
        if width <= max_width {
            return BrokenLine {
                text: clean.into_owned(),
                width,
            };
        }

        let ellipsis_width = font_context.measure("...", face, font_size);
        let mut out = String::new();
        let mut used = 0.0;
        for ch in clean.chars() {
            let w = font_context.char_width(ch, face, font_size);
            if used + w + ellipsis_width > max_width {
                break;
            }
            out.push(ch);
            used += w;
        }
        let trimmed = out.trim_end().to_string();
        let width = font_context.measure(&trimmed, face, font_size) + ellipsis_width;
        BrokenLine {
            text: trimmed + "...",
            width,
        }
    }

    fn break_paragraph(
        &self,
        font_context: &FontContext,
        paragraph: &str,
        face: Face,
        font_size: f64,
        max_width: f64,
        lines: &mut Vec<BrokenLine>,
    ) {
        let first_line = lines.len();
        let space_width = font_context.char_width(' ', face, font_size);

        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let word_width = font_context.measure(word, face, font_size);

            if !current.is_empty() {
                if current_width + space_width + word_width <= max_width {
                    current.push(' ');
                    current.push_str(word);
                    current_width += space_width + word_width;
                    continue;
                }
                lines.push(BrokenLine {
                    text: std::mem::take(&mut current),
                    width: current_width,
                });
                current_width = 0.0;
            }

            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
                continue;
            }

            // Pathological token (e.g. a long URL): cut it where it overflows.
            for ch in word.chars() {
                let ch_width = font_context.char_width(ch, face, font_size);
                if !current.is_empty() && current_width + ch_width > max_width {
                    lines.push(BrokenLine {
                        text: std::mem::take(&mut current),
                        width: current_width,
                    });
                    current_width = 0.0;
                }
                current.push(ch);
                current_width += ch_width;
            }
        }

        if !current.is_empty() || lines.len() == first_line {
            lines.push(BrokenLine {
                text: current,
                width: current_width,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(text: &str, width: f64) -> Vec<String> {
        TextLayout::new().wrap(&FontContext::new(), text, Face::Regular, 10.0, width)
    }

    fn count(text: &str, width: f64) -> usize {
        TextLayout::new().estimate_line_count(&FontContext::new(), text, Face::Regular, 10.0, width)
    }

    #[test]
    fn empty_text_is_one_line() {
        assert_eq!(wrap("", 100.0), vec![String::new()]);
        assert_eq!(count("", 100.0), 1);
    }

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap("Hello world", 500.0), vec!["Hello world"]);
    }

    #[test]
    fn greedy_breaks_between_words() {
        // "aaa" = 16.68pt, space = 2.78pt at 10pt Helvetica
        let lines = wrap("aaa aaa aaa", 40.0);
        assert_eq!(lines, vec!["aaa aaa", "aaa"]);
    }

    #[test]
    fn blank_paragraphs_count_as_lines() {
        let lines = wrap("first\n\nthird", 500.0);
        assert_eq!(lines, vec!["first", "", "third"]);
        assert_eq!(count("first\n\nthird", 500.0), 3);
    }

    #[test]
    fn crlf_is_a_single_break() {
        assert_eq!(wrap("a\r\nb", 500.0), vec!["a", "b"]);
    }

    #[test]
    fn long_word_is_cut_by_character() {
        let url = "https://example.com/a/very/long/path/without/any/spaces/at/all";
        let lines = wrap(url, 60.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), url);
        let ctx = FontContext::new();
        for line in &lines {
            assert!(ctx.measure(line, Face::Regular, 10.0) <= 60.0 + 1e-9);
        }
    }

    #[test]
    fn long_word_tail_shares_a_line_with_the_next_word() {
        let lines = wrap("abcdefghijklmnop q", 40.0);
        assert!(lines.last().unwrap().ends_with(" q") || lines.last().unwrap() == "q");
        assert_eq!(lines.concat().replace(' ', ""), "abcdefghijklmnopq");
    }

    #[test]
    fn lines_are_sanitized() {
        assert_eq!(wrap("smile \u{1F642}", 500.0), vec!["smile ?"]);
    }

    #[test]
    fn widths_match_measurement_of_drawn_text() {
        let ctx = FontContext::new();
        let lines = TextLayout::new().break_into_lines(
            &ctx,
            "The quick brown fox jumps over the lazy dog \u{2014} twice",
            Face::Regular,
            10.0,
            90.0,
        );
        for line in lines {
            let measured = ctx.measure(&line.text, Face::Regular, 10.0);
            assert!((measured - line.width).abs() < 1e-9, "{:?}", line);
        }
    }

    #[test]
    fn estimate_matches_wrap_across_inputs() {
        let samples = [
            "",
            " ",
            "   leading and trailing   ",
            "one",
            "two words",
            "a\nb\n\nc",
            "supercalifragilisticexpialidocious is a long word indeed",
            "tabs\tand\u{00A0}nbsp and \u{1F600} emoji",
            "line one\r\nline two\rline three",
            "https://no-spaces-here.example.com/path/to/some/resource?with=query&and=more",
        ];
        for text in samples {
            for width in [5.0, 20.0, 55.5, 120.0, 400.0] {
                assert_eq!(count(text, width), wrap(text, width).len(), "{text:?} @ {width}");
            }
        }
    }

    #[test]
    fn zero_width_still_makes_progress() {
        let lines = wrap("abc", 0.0);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn fit_line_truncates_with_ellipsis() {
        let ctx = FontContext::new();
        let layout = TextLayout::new();
        let fitted = layout.fit_line(&ctx, "View PDF: an_extremely_long_file_name_for_testing.pdf", Face::Bold, 10.0, 100.0);
        assert!(fitted.text.ends_with("..."));
        assert!(fitted.width <= 100.0 + 1e-9);
        let short = layout.fit_line(&ctx, "short", Face::Bold, 10.0, 100.0);
        assert_eq!(short.text, "short");
    }
}

//! # Text Layout
//!
//! Line breaking and block measurement.
//!
//! Break opportunities come from UAX#14 via `unicode-linebreak`. Mandatory
//! breaks (newlines) end a paragraph. Allowed breaks are only taken after
//! whitespace, so a line never ends inside "pré-moldado" or "SAA/SES" and
//! joining the lines with single spaces gives the original words back.
//! No-break spaces stay inside their word. A word wider than the line is cut
//! at character boundaries so no returned line ever exceeds `max_width`.
//!
//! The same [`wrap`] result is used twice: once to measure a block
//! (`lines * line_height`) before asking the page flow for space, and once to
//! draw it. Layout never re-wraps between measuring and drawing.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::font::StandardFont;

/// Slack for floating point comparisons against `max_width`.
const WIDTH_EPSILON: f64 = 1e-9;

/// Wrapped lines plus the vertical extent they occupy.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedText {
    pub lines: Vec<String>,
    pub line_height: f64,
}

impl WrappedText {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }
}

/// Break `text` into lines no wider than `max_width` millimetres when set in
/// `font` at `font_size` points.
///
/// Always returns at least one line; empty input yields a single empty line.
pub fn wrap(text: &str, max_width: f64, font_size: f64, font: StandardFont) -> Vec<String> {
    let mut lines = Vec::new();
    let mut words: Vec<String> = Vec::new();
    let mut word = String::new();
    let mut start = 0;

    for (offset, opportunity) in linebreaks(text) {
        let segment = &text[start..offset];
        start = offset;
        word.push_str(segment);

        match opportunity {
            BreakOpportunity::Mandatory => {
                finish_word(&mut word, &mut words);
                wrap_paragraph(&words, max_width, font_size, font, &mut lines);
                words.clear();
            }
            BreakOpportunity::Allowed => {
                if segment.chars().next_back().is_some_and(is_break_space) {
                    finish_word(&mut word, &mut words);
                }
            }
        }
    }
    if start < text.len() {
        word.push_str(&text[start..]);
    }
    if !word.is_empty() || !words.is_empty() {
        finish_word(&mut word, &mut words);
        wrap_paragraph(&words, max_width, font_size, font, &mut lines);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// [`wrap`] and attach the line height used to measure the block.
pub fn measure(
    text: &str,
    max_width: f64,
    font_size: f64,
    font: StandardFont,
    line_height: f64,
) -> WrappedText {
    WrappedText {
        lines: wrap(text, max_width, font_size, font),
        line_height,
    }
}

/// Whitespace a line may break at. No-break spaces are glue, not separators.
fn is_break_space(ch: char) -> bool {
    ch.is_whitespace() && !matches!(ch, '\u{A0}' | '\u{2007}' | '\u{202F}')
}

fn finish_word(word: &mut String, words: &mut Vec<String>) {
    let trimmed = word.trim_matches(is_break_space);
    if !trimmed.is_empty() {
        words.push(trimmed.to_string());
    }
    word.clear();
}

fn wrap_paragraph(
    words: &[String],
    max_width: f64,
    font_size: f64,
    font: StandardFont,
    lines: &mut Vec<String>,
) {
    let fits = |s: &str| font.measure_mm(s, font_size) <= max_width + WIDTH_EPSILON;
    let mut current = String::new();

    for word in words {
        if !fits(word) {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let mut pieces = break_word(word, max_width, font_size, font);
            // The last piece can still take following words.
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate_len = current.len();
        current.push(' ');
        current.push_str(word);
        if !fits(&current) {
            current.truncate(candidate_len);
            lines.push(std::mem::replace(&mut current, word.clone()));
        }
    }

    // Blank paragraphs keep their line so vertical spacing is preserved.
    lines.push(current);
}

/// Cut an over-long word into pieces that each fit. Every piece holds at
/// least one character, even if that character alone is too wide.
fn break_word(word: &str, max_width: f64, font_size: f64, font: StandardFont) -> Vec<String> {
    let metrics = font.metrics();
    let pt_limit = max_width * crate::font::PT_PER_MM + WIDTH_EPSILON;

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut piece_width = 0.0;

    for ch in word.chars() {
        let w = metrics.char_width(ch, font_size);
        if !piece.is_empty() && piece_width + w > pt_limit {
            pieces.push(std::mem::take(&mut piece));
            piece_width = 0.0;
        }
        piece.push(ch);
        piece_width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}


#[cfg(test)]
mod proptests {
    use super::*;
    use super::tests::FONT;
    use proptest::prelude::*;

    fn word() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9çãéõÁÇ,.;/-]{1,12}"
    }

    proptest! {
        /// Property: no line is wider than max_width.
        #[test]
        fn lines_never_exceed_width(
            words in prop::collection::vec(word(), 0..60),
            max_width in 25.0f64..180.0,
            font_size in 6.0f64..12.0,
        ) {
            let text = words.join(" ");
            for line in wrap(&text, max_width, font_size, FONT) {
                prop_assert!(FONT.measure_mm(&line, font_size) <= max_width + 1e-6);
            }
        }

        /// Property: joining the lines with single spaces gives back the words in order.
        #[test]
        fn words_survive_in_order(
            words in prop::collection::vec(word(), 0..60),
            separators in prop::collection::vec("[ \n]{1,3}", 60),
            // Wide enough for the widest 12-letter word, so nothing is cut.
            max_width in 40.0f64..180.0,
        ) {
            let mut text = String::new();
            for (w, sep) in words.iter().zip(separators.iter()) {
                text.push_str(w);
                text.push_str(sep);
            }
            let lines = wrap(&text, max_width, 9.0, FONT);
            let rejoined = lines.join(" ");
            let got: Vec<&str> = rejoined.split_whitespace().collect();
            let expected: Vec<&str> = words.iter().map(String::as_str).collect();
            prop_assert_eq!(got, expected);
        }

        /// Property: wrapping is deterministic and never returns zero lines.
        #[test]
        fn wrap_is_pure(text in ".{0,200}", max_width in 5.0f64..200.0) {
            let a = wrap(&text, max_width, 9.0, FONT);
            let b = wrap(&text, max_width, 9.0, FONT);
            prop_assert!(!a.is_empty());
            prop_assert_eq!(a, b);
        }
    }
}

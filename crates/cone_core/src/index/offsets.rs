//! Offset scanner shared by heading and chunk extraction.

/// Separator between lines.
pub const LINE_SEPARATOR: &str = "\n";
/// Separator between paragraphs (one blank line).
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Slice of a body together with the byte offset of its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub start: usize,
    pub text: &'a str,
}

impl Span<'_> {
    /// Offset immediately after the span's last character.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Splits `body` on `separator`, left to right, keeping each part's offset.
///
/// Parts are non-overlapping and cover the body exactly when re-joined with
/// the separator, so the empty parts around adjacent separators are kept.
pub fn split_spans<'a>(body: &'a str, separator: &'a str) -> impl Iterator<Item = Span<'a>> + 'a {
    let mut offset = 0;
    body.split(separator).map(move |text| {
        let span = Span {
            start: offset,
            text,
        };
        offset += text.len() + separator.len();
        span
    })
}

/// Lines of `body`, split on line feeds.
pub fn lines(body: &str) -> impl Iterator<Item = Span<'_>> {
    split_spans(body, LINE_SEPARATOR)
}

/// Paragraphs of `body`, split on blank lines.
pub fn paragraphs(body: &str) -> impl Iterator<Item = Span<'_>> {
    split_spans(body, PARAGRAPH_SEPARATOR)
}

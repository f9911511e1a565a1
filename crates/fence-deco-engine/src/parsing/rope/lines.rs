use xi_rope::Rope;

use super::span::Span;

/// A reference to a single line of a buffer with its byte span.
#[derive(Debug, Clone)]
pub struct LineRef {
    /// Byte span of this line (includes newline if present).
    pub span: Span,
    /// The line text without its line terminator.
    pub text: String,
}

impl LineRef {
    fn new(start: usize, raw: &str) -> Self {
        LineRef {
            span: Span {
                start,
                end: start + raw.len(),
            },
            text: raw.trim_end_matches(['\r', '\n']).to_string(),
        }
    }
}

/// Returns an iterator over rope lines with their byte spans.
///
/// Uses `lines_raw` to preserve newline characters, which keeps the spans
/// contiguous: each line starts where the previous one ended.
pub fn lines_with_spans(rope: &Rope) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    rope.lines_raw(..).map(move |line| {
        let start = offset;
        offset += line.len();
        LineRef::new(start, &line)
    })
}

/// Same as [`lines_with_spans`] for a plain string.
pub fn str_lines_with_spans(text: &str) -> impl Iterator<Item = LineRef> + '_ {
    let mut offset = 0usize;
    text.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        LineRef::new(start, line)
    })
}

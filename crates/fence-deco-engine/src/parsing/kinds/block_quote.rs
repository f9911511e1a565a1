/// Blockquote syntax knowledge: the `>` prefix used by quotes and callouts.
pub struct BlockQuote;

impl BlockQuote {
    /// The blockquote prefix character.
    pub const PREFIX: char = '>';

    /// Strips blockquote prefixes from a line, returning (depth, byte_offset).
    ///
    /// Handles various forms: `> text`, `>> nested`, `> > spaced nested`,
    /// and leading indentation before the first marker. One space after
    /// each marker belongs to the marker.
    ///
    /// # Returns
    /// - `depth`: Number of `>` prefixes found (0 if not a blockquote)
    /// - `byte_offset`: Index into `s` where content begins after prefixes
    pub fn strip_prefixes(s: &str) -> (u8, usize) {
        let b = s.as_bytes();
        let mut i = 0usize;
        let mut depth = 0u8;

        loop {
            let mut j = i;
            while j < b.len() && (b[j] == b' ' || b[j] == b'\t') {
                j += 1;
            }
            if j < b.len() && b[j] == (Self::PREFIX as u8) {
                depth = depth.saturating_add(1);
                i = j + 1;
                if i < b.len() && b[i] == b' ' {
                    i += 1;
                }
            } else {
                break;
            }
        }
        (depth, i)
    }

    /// Returns the line with all quote prefixes removed.
    pub fn strip(s: &str) -> &str {
        let (_, idx) = Self::strip_prefixes(s);
        &s[idx..]
    }

    /// True if the line starts (after optional whitespace) with `>`.
    pub fn is_quoted(s: &str) -> bool {
        s.trim_start().starts_with(Self::PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_no_quote() {
        assert_eq!(BlockQuote::strip_prefixes("hello"), (0, 0));
    }

    #[test]
    fn strip_no_quote_keeps_indentation() {
        assert_eq!(BlockQuote::strip("    code"), "    code");
    }

    #[test]
    fn strip_single_quote() {
        assert_eq!(BlockQuote::strip_prefixes("> hello"), (1, 2));
    }

    #[test]
    fn strip_double_quote() {
        assert_eq!(BlockQuote::strip_prefixes("> > hello"), (2, 4));
    }

    #[test]
    fn strip_nested_quote_no_space() {
        assert_eq!(BlockQuote::strip_prefixes(">> hello"), (2, 3));
    }

    #[test]
    fn strip_indented_quote() {
        assert_eq!(BlockQuote::strip("  >\t> ```rust"), "```rust");
    }

    #[test]
    fn strip_keeps_code_indentation_after_marker() {
        assert_eq!(BlockQuote::strip(">     indented()"), "    indented()");
    }

    #[test]
    fn quoted_detection() {
        assert!(BlockQuote::is_quoted("> text"));
        assert!(BlockQuote::is_quoted("   >"));
        assert!(!BlockQuote::is_quoted("text > more"));
    }
}

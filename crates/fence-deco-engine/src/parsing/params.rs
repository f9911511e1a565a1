//! Fence-line directive parsing.
//!
//! A fence line such as
//!
//! ```text
//! ```python title:"Demo" ln:3 hl:2,4-5 lang-color:#3572a5
//! ```
//!
//! is turned into a [`FenceParameters`]. Parsing never fails: a missing or
//! malformed directive leaves the corresponding field at its default.

use std::sync::LazyLock;

use regex::Regex;

use super::kinds::BlockQuote;

/// Largest `a-b` range expanded by `hl:`. Wider ranges are skipped as
/// malformed.
pub const MAX_HIGHLIGHT_RANGE: usize = 10_000;

/// Largest first-line label accepted by `ln:`. Larger offsets are skipped
/// as malformed.
pub const MAX_LINE_OFFSET: usize = 1_000_000;

static FENCE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:`{3,}|~{3,})").expect("valid regex"));

static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9+#-]+)([:=])?").expect("valid regex"));

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)title[:=](?:"([^"]*)"|'([^']*)'|(\S+))"#).expect("valid regex")
});

static LANG_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)lang-color[:=]["']?#?([0-9A-Fa-f]{6})\b"#).expect("valid regex")
});

static TITLE_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)title-color[:=]["']?#?([0-9A-Fa-f]{6})\b"#).expect("valid regex")
});

static LINE_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)ln[:=](true|false|\d+)\b").expect("valid regex"));

static HIGHLIGHTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)hl[:=](\S+)").expect("valid regex"));

/// Per-block line-number directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumbers {
    /// `None` defers to the global setting.
    pub enabled: Option<bool>,
    /// Label of the first line.
    pub offset: usize,
}

impl Default for LineNumbers {
    fn default() -> Self {
        Self {
            enabled: None,
            offset: 1,
        }
    }
}

/// Presentation parameters parsed from one fence line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceParameters {
    /// Lowercased language token; empty if absent.
    pub language: String,
    pub title: String,
    /// `#rrggbb` or empty.
    pub lang_color: String,
    /// `#rrggbb` or empty.
    pub title_color: String,
    pub line_numbers: LineNumbers,
    /// Absolute line labels to highlight, in encounter order.
    pub highlights: Vec<usize>,
}

impl FenceParameters {
    /// True if the line labelled `label` is in the highlight list.
    pub fn is_highlighted(&self, label: usize) -> bool {
        self.highlights.contains(&label)
    }
}

/// Parses a fence-open line into [`FenceParameters`].
///
/// Accepts the line with or without quote prefixes. `None`, an empty
/// string, or a bare fence all give the defaults.
pub fn parse_fence_parameters(fence_line: Option<&str>) -> FenceParameters {
    let mut params = FenceParameters::default();
    let Some(line) = fence_line else {
        return params;
    };

    let line = BlockQuote::strip(line);
    let rest = match FENCE_MARKER.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return params;
    }

    // A leading `title:` is a directive, not a language called "title".
    if let Some(caps) = LANGUAGE.captures(rest)
        && caps.get(2).is_none()
    {
        params.language = caps[1].to_lowercase();
    }

    if let Some(caps) = TITLE.captures(rest) {
        params.title = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }

    if let Some(caps) = LANG_COLOR.captures(rest) {
        params.lang_color = format!("#{}", caps[1].to_lowercase());
    }

    if let Some(caps) = TITLE_COLOR.captures(rest) {
        params.title_color = format!("#{}", caps[1].to_lowercase());
    }

    if let Some(caps) = LINE_NUMBERS.captures(rest) {
        match &caps[1] {
            "true" => params.line_numbers.enabled = Some(true),
            "false" => params.line_numbers.enabled = Some(false),
            digits => {
                if let Ok(offset) = digits.parse::<usize>()
                    && offset <= MAX_LINE_OFFSET
                {
                    params.line_numbers = LineNumbers {
                        enabled: Some(true),
                        offset,
                    };
                }
            }
        }
    }

    if let Some(caps) = HIGHLIGHTS.captures(rest) {
        params.highlights = expand_highlights(&caps[1]);
    }

    params
}

/// Expands `1,3-5,7` into `[1, 3, 4, 5, 7]`. Malformed entries are skipped.
fn expand_highlights(list: &str) -> Vec<usize> {
    let mut out = Vec::new();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('-') {
            Some((a, b)) => {
                let (Ok(a), Ok(b)) = (a.parse::<usize>(), b.parse::<usize>()) else {
                    continue;
                };
                if b >= a && b - a <= MAX_HIGHLIGHT_RANGE {
                    out.extend(a..=b);
                }
            }
            None => {
                if let Ok(n) = entry.parse::<usize>() {
                    out.push(n);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("```"))]
    #[case(Some("~~~~   "))]
    #[case(Some("```   \t"))]
    fn empty_input_gives_defaults(#[case] input: Option<&str>) {
        assert_eq!(parse_fence_parameters(input), FenceParameters::default());
    }

    #[rstest]
    #[case("```python", "python")]
    #[case("```Python title:x", "python")]
    #[case("~~~c++", "c++")]
    #[case("```c#", "c#")]
    #[case("```objective-c", "objective-c")]
    #[case("```  rust  ", "rust")]
    #[case("> ```js", "js")]
    #[case("```title:Demo", "")]
    #[case("``` ln:5", "")]
    fn language_is_leading_token(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(parse_fence_parameters(Some(line)).language, expected);
    }

    #[rstest]
    #[case(r#"```js title:"Hello World""#, "Hello World")]
    #[case("```js title:'single quoted'", "single quoted")]
    #[case("```js title=bare.rs ln:true", "bare.rs")]
    #[case("```js ln:2 title:after", "after")]
    #[case("```js subtitle:nope", "")]
    #[case(r#"```js title:"""#, "")]
    fn title_forms(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(parse_fence_parameters(Some(line)).title, expected);
    }

    #[test]
    fn highlight_list_expands_ranges_in_order() {
        let params = parse_fence_parameters(Some("```rust hl:1,3-5,7"));
        assert_eq!(params.highlights, vec![1, 3, 4, 5, 7]);
    }

    #[rstest]
    #[case("```rust hl:5-3,2", vec![2])]
    #[case("```rust hl:1-,x,4", vec![4])]
    #[case("```rust hl:2,2,1-2", vec![2, 2, 1, 2])]
    #[case("```rust hl=9", vec![9])]
    #[case("```rust hl:1-20000", vec![])]
    #[case("```rust", vec![])]
    fn highlight_edge_cases(#[case] line: &str, #[case] expected: Vec<usize>) {
        assert_eq!(parse_fence_parameters(Some(line)).highlights, expected);
    }

    #[rstest]
    #[case("```rust ln:5", Some(true), 5)]
    #[case("```rust ln:false", Some(false), 1)]
    #[case("```rust ln=true", Some(true), 1)]
    #[case("```rust", None, 1)]
    #[case("```rust ln:maybe", None, 1)]
    #[case("```rust ln:0", Some(true), 0)]
    #[case("```rust ln:99999999999999999999999999", None, 1)]
    #[case("```rust ln:18446744073709551615", None, 1)]
    #[case("```rust ln:1000001", None, 1)]
    #[case("```rust ln:1000000", Some(true), 1_000_000)]
    fn line_number_directive(
        #[case] line: &str,
        #[case] enabled: Option<bool>,
        #[case] offset: usize,
    ) {
        assert_eq!(
            parse_fence_parameters(Some(line)).line_numbers,
            LineNumbers { enabled, offset }
        );
    }

    #[rstest]
    #[case("```py lang-color:#A1b2C3", "#a1b2c3", "")]
    #[case("```py lang-color=a1b2c3 title-color:#000000", "#a1b2c3", "#000000")]
    #[case("```py lang-color:#12345", "", "")]
    #[case("```py lang-color:#1234567", "", "")]
    #[case("```py title-color:'ffffff'", "", "#ffffff")]
    fn color_directives(#[case] line: &str, #[case] lang: &str, #[case] title: &str) {
        let params = parse_fence_parameters(Some(line));
        assert_eq!(params.lang_color, lang);
        assert_eq!(params.title_color, title);
    }

    #[test]
    fn directives_are_order_independent() {
        let a = parse_fence_parameters(Some(
            r#"```python title:"Demo" ln:3 hl:2,4-5 lang-color:#ff0000"#,
        ));
        let b = parse_fence_parameters(Some(
            r#"```python lang-color:#ff0000 hl:2,4-5 ln:3 title:"Demo""#,
        ));
        assert_eq!(a, b);
    }

    #[test]
    fn end_to_end_fence_line() {
        let params = parse_fence_parameters(Some(r#"```python title:"Demo" ln:3 hl:2,4-5"#));
        assert_eq!(
            params,
            FenceParameters {
                language: "python".to_string(),
                title: "Demo".to_string(),
                line_numbers: LineNumbers {
                    enabled: Some(true),
                    offset: 3
                },
                highlights: vec![2, 4, 5],
                ..FenceParameters::default()
            }
        );
    }

    #[rstest]
    #[case("```")]
    #[case("``` title:")]
    #[case("```\u{1F600} hl:,,,- ln: lang-color:# title=")]
    #[case("not a fence at all")]
    #[case(">>>>")]
    #[case("```rust title:\"unterminated")]
    fn malformed_input_never_panics(#[case] line: &str) {
        let _ = parse_fence_parameters(Some(line));
    }
}

//! Canonical forms of code text used to compare rendered blocks with source.

/// Unifies line endings, right-trims every line and drops the trailing
/// empty lines left by the final newline.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    normalize_with(text, str::trim_end)
}

/// Like [`normalize`], but also left-trims every line.
///
/// Used for callout content, where stripped quote prefixes can leave
/// inconsistent indentation behind.
pub fn normalize_loose(text: &str) -> String {
    normalize_with(text, str::trim)
}

fn normalize_with(text: &str, trim: fn(&str) -> &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<&str> = unified.split('\n').map(trim).collect();
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// The first two non-blank trimmed lines joined by `\n`.
///
/// Cheap fuzzy-match key for code blocks whose full content differs in
/// whitespace or trailing lines. Empty if the text has no content.
pub fn signature(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join("\n")
}

//! Finding the fence line a rendered code block came from.
//!
//! Rendered output only carries the code text (and sometimes an approximate
//! source line), so the originating fence is recovered from the raw
//! document. Three strategies:
//!
//! - [`find_fence_line_by_line`]: nearest fence at or above a line anchor.
//! - [`extract_callout_fence_entries`]: every closed block inside `>` runs.
//! - [`find_fence_line_for_code_block`]: content matching across the whole
//!   document, exact first, then a unique two-line signature.

use fence_deco_config::LanguageTable;

use crate::parsing::{
    BlockQuote, FenceLine, FenceTracker, normalize, normalize_loose,
    parse_fence_parameters, signature,
};

/// A fenced block found inside a blockquote, quote markers removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalloutFenceEntry {
    pub fence_line: String,
    /// Normalized content.
    pub content: String,
}

/// Maps a language token to a canonical language name.
pub trait LanguageResolver {
    fn canonical_name(&self, language: &str) -> Option<String>;
}

impl LanguageResolver for LanguageTable {
    fn canonical_name(&self, language: &str) -> Option<String> {
        LanguageTable::canonical_name(self, language).map(str::to_string)
    }
}

/// Returns the nearest fence-open line at or above the 1-based
/// `line_number`, quote-stripped.
///
/// Host line anchors are approximate, but the fence always sits at or
/// above the reported position. Closing fences look like bare openers, so
/// line roles are tracked from the top rather than pattern-matched in
/// reverse.
pub fn find_fence_line_by_line(source: &str, line_number: usize) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    let last = lines.len().checked_sub(1)?;
    let start = line_number.saturating_sub(1).min(last);

    let mut tracker = FenceTracker::new();
    let mut nearest = None;
    for line in &lines[..=start] {
        let step = tracker.step_line(line);
        if let FenceLine::Open(_) = step.role {
            nearest = Some(step.text.trim().to_string());
        }
    }
    nearest
}

/// Extracts every closed fenced block found inside runs of `>` lines.
///
/// A non-quote line ends the run and silently drops an unterminated block.
pub fn extract_callout_fence_entries(source: &str) -> Vec<CalloutFenceEntry> {
    let mut entries = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut fence_line = String::new();
    let mut content: Vec<&str> = Vec::new();

    for line in source.lines() {
        if !BlockQuote::is_quoted(line) {
            tracker.reset();
            continue;
        }
        let stripped = BlockQuote::strip(line);
        match tracker.step(stripped) {
            FenceLine::Outside => {}
            FenceLine::Open(_) => {
                fence_line = stripped.trim().to_string();
                content.clear();
            }
            FenceLine::Content => content.push(stripped),
            FenceLine::Close => entries.push(CalloutFenceEntry {
                fence_line: std::mem::take(&mut fence_line),
                content: normalize(&content.join("\n")),
            }),
        }
    }

    entries
}

/// A closed fenced block anywhere in the document.
struct SourceBlock {
    fence_line: String,
    content: String,
}

fn closed_blocks(source: &str) -> Vec<SourceBlock> {
    let mut blocks = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut fence_line = String::new();
    let mut content: Vec<&str> = Vec::new();

    for line in source.lines() {
        let step = tracker.step_line(line);
        match step.role {
            FenceLine::Outside => {}
            FenceLine::Open(_) => {
                fence_line = step.text.trim().to_string();
                content.clear();
            }
            FenceLine::Content => content.push(step.text),
            FenceLine::Close => blocks.push(SourceBlock {
                fence_line: std::mem::take(&mut fence_line),
                content: content.join("\n"),
            }),
        }
    }

    blocks
}

fn language_matches(
    fence_line: &str,
    target: Option<&str>,
    resolver: Option<&dyn LanguageResolver>,
) -> bool {
    let Some(target) = target else {
        return true;
    };
    let target = target.to_lowercase();
    let language = parse_fence_parameters(Some(fence_line)).language;
    if language == target {
        return true;
    }
    let Some(resolver) = resolver else {
        return false;
    };
    match (
        resolver.canonical_name(&language),
        resolver.canonical_name(&target),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Finds the fence line of the block whose content matches `code`.
///
/// An exact match (normalized or loose) wins immediately. Otherwise the
/// block is accepted only if it is the single block sharing the target's
/// two-line signature; zero or several candidates give `None`, since
/// styling the wrong block is worse than leaving one plain.
pub fn find_fence_line_for_code_block(
    source: &str,
    code: &str,
    language: Option<&str>,
    resolver: Option<&dyn LanguageResolver>,
) -> Option<String> {
    let target = normalize(code);
    let target_loose = normalize_loose(code);
    let target_signature = signature(code);

    let mut candidates = Vec::new();
    for block in closed_blocks(source) {
        if !language_matches(&block.fence_line, language, resolver) {
            continue;
        }
        if normalize(&block.content) == target || normalize_loose(&block.content) == target_loose
        {
            log::debug!("Exact content match for fence {:?}", block.fence_line);
            return Some(block.fence_line);
        }
        if !target_signature.is_empty() && signature(&block.content) == target_signature {
            candidates.push(block.fence_line);
        }
    }

    if candidates.len() == 1 {
        candidates.pop()
    } else {
        if candidates.len() > 1 {
            log::debug!(
                "{} blocks share the signature {target_signature:?}; leaving unmatched",
                candidates.len()
            );
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "# Notes\n\n```python title:\"A\"\nprint(1)\n```\n\ntext\n\n~~~rust\nfn main() {}\n~~~\n";

    #[test]
    fn by_line_finds_fence_at_anchor() {
        assert_eq!(
            find_fence_line_by_line(DOC, 3).as_deref(),
            Some("```python title:\"A\"")
        );
    }

    #[test]
    fn by_line_scans_upward() {
        assert_eq!(find_fence_line_by_line(DOC, 10).as_deref(), Some("~~~rust"));
    }

    #[test]
    fn by_line_clamps_past_end() {
        assert_eq!(find_fence_line_by_line(DOC, 999).as_deref(), Some("~~~rust"));
    }

    #[test]
    fn by_line_skips_closing_fences() {
        assert_eq!(
            find_fence_line_by_line(DOC, 7).as_deref(),
            Some("```python title:\"A\"")
        );
    }

    #[test]
    fn by_line_returns_none_above_first_fence() {
        assert_eq!(find_fence_line_by_line(DOC, 2), None);
        assert_eq!(find_fence_line_by_line("", 1), None);
    }

    #[test]
    fn by_line_strips_quote_prefix() {
        let doc = "> [!note]\n> ```js title:x\n> a()\n> ```";
        assert_eq!(find_fence_line_by_line(doc, 3).as_deref(), Some("```js title:x"));
    }

    #[test]
    fn callout_entry_strips_quotes_everywhere() {
        let doc = "> [!tip]\n> ```python\n> code\n> ```\n";
        assert_eq!(
            extract_callout_fence_entries(doc),
            vec![CalloutFenceEntry {
                fence_line: "```python".to_string(),
                content: "code".to_string(),
            }]
        );
    }

    #[test]
    fn callout_skips_top_level_and_unterminated_blocks() {
        let doc = "```js\ntop()\n```\n> ```rust\n> open()\nbreak\n> ```\n> ~~~sh\n> ls\n> ~~~\n";
        let entries = extract_callout_fence_entries(doc);
        // The bare fence after the break opens a block the tildes can't close.
        assert_eq!(entries.len(), 0);

        let doc = "> ```rust\n> open()\nbreak\n> ~~~sh\n> ls\n> ~~~\n";
        let entries = extract_callout_fence_entries(doc);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fence_line, "~~~sh");
        assert_eq!(entries[0].content, "ls");
    }

    #[test]
    fn callout_entries_in_document_order() {
        let doc = "> ```a\n> 1\n> ```\n>\n> ```b\n> 2\n> ```\n\n> ```c\n> 3\n> ```\n";
        let fences: Vec<_> = extract_callout_fence_entries(doc)
            .into_iter()
            .map(|e| e.fence_line)
            .collect();
        assert_eq!(fences, vec!["```a", "```b", "```c"]);
    }

    #[test]
    fn exact_match_tolerates_whitespace_differences() {
        let doc = "intro\n\n```python title:\"Demo\"\ndef f():   \n    pass\n\n```\n";
        let rendered = "def f():\n    pass\n\n\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, rendered, None, None).as_deref(),
            Some("```python title:\"Demo\"")
        );
    }

    #[test]
    fn exact_match_inside_blockquote_uses_loose_form() {
        let doc = "> ```sh\n>   ls -la\n>   pwd\n> ```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "ls -la\npwd\n", None, None).as_deref(),
            Some("```sh")
        );
    }

    #[test]
    fn exact_match_wins_over_signature_candidates() {
        let doc = "```js\na\nb\nc\n```\n```js title:exact\na\nb\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "a\nb\n", None, None).as_deref(),
            Some("```js title:exact")
        );
    }

    #[test]
    fn unique_signature_match() {
        let doc = "```js title:one\nfirst\nsecond\nthird\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "first\nsecond\nchanged", None, None).as_deref(),
            Some("```js title:one")
        );
    }

    #[test]
    fn ambiguous_signature_returns_none() {
        let doc = "```js\nfirst\nsecond\nA\n```\n\n```js\nfirst\nsecond\nB\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "first\nsecond\nC", None, None),
            None
        );
    }

    #[test]
    fn language_filter_excludes_other_languages() {
        let doc = "```js\nsame\n```\n```py\nsame\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "same", Some("PY"), None).as_deref(),
            Some("```py")
        );
        assert_eq!(
            find_fence_line_for_code_block(doc, "same", Some("rust"), None),
            None
        );
    }

    #[test]
    fn language_filter_resolves_aliases() {
        let table = LanguageTable::builtin();
        let doc = "```py\nprint()\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "print()", Some("python"), Some(&table))
                .as_deref(),
            Some("```py")
        );
        assert_eq!(
            find_fence_line_for_code_block(doc, "print()", Some("python"), None),
            None
        );
    }

    const OPEN_CALLOUT: &str = "> [!note]\n> ```js\n> a()\n\n```py\nb()\n```\n";

    #[test]
    fn by_line_does_not_carry_callout_block_past_quote() {
        assert_eq!(find_fence_line_by_line(OPEN_CALLOUT, 5).as_deref(), Some("```py"));
        assert_eq!(find_fence_line_by_line(OPEN_CALLOUT, 6).as_deref(), Some("```py"));
    }

    #[test]
    fn content_match_finds_block_after_unterminated_callout() {
        assert_eq!(
            find_fence_line_for_code_block(OPEN_CALLOUT, "b()\n", Some("py"), None).as_deref(),
            Some("```py")
        );
        assert_eq!(find_fence_line_for_code_block(OPEN_CALLOUT, "a()", None, None), None);
        assert!(extract_callout_fence_entries(OPEN_CALLOUT).is_empty());
    }

    #[test]
    fn quoted_lines_inside_top_level_block_are_content() {
        let doc = "```md\n> ```\n> quoted\n```\n";
        assert_eq!(
            find_fence_line_for_code_block(doc, "> ```\n> quoted\n", None, None).as_deref(),
            Some("```md")
        );
        assert_eq!(find_fence_line_by_line(doc, 3).as_deref(), Some("```md"));
    }

    #[test]
    fn unclosed_block_is_never_matched() {
        let doc = "```js\nabc\n";
        assert_eq!(find_fence_line_for_code_block(doc, "abc", None, None), None);
    }
}

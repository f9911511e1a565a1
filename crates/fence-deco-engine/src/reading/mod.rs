//! # Reading-surface decoration
//!
//! Post-processes rendered `<pre><code>` blocks: wraps them with a header,
//! adds a line-number gutter and highlight markers, and optionally token
//! highlighting.
//!
//! A `<pre>` is in exactly one of three states, recorded as marker classes:
//! undecorated (no marker), [`PENDING_CLASS`] while its source is being
//! read, and [`DECORATED_CLASS`]. Decorating is idempotent.

pub mod copy;
pub mod header;
pub mod observer;

use std::ops::{Deref, DerefMut};

use relative_path::RelativePath;

use crate::context::DecorationEnv;
use crate::dom::{Dom, NodeId};
use crate::io::SourceProvider;
use crate::locate::{find_fence_line_by_line, find_fence_line_for_code_block};
use crate::parsing::{FenceParameters, parse_fence_parameters};

pub use copy::{Clipboard, ClipboardError, CopyButton, CopyState, Notifier};
pub use header::{HeaderModel, apply_header, header_model, render_header};
pub use observer::{CalloutObserver, Poller, ScanReport, ScrollDebounce};

pub const DECORATED_CLASS: &str = "fence-deco-decorated";
pub const PENDING_CLASS: &str = "fence-deco-pending";
pub const WRAPPER_CLASS: &str = "fence-deco-wrapper";
pub const GUTTER_CLASS: &str = "fence-deco-gutter";
pub const TOKEN_CLASS: &str = "fence-deco-token";
pub const HAS_HIGHLIGHTS_CLASS: &str = "has-highlights";
pub const HAS_LINE_NUMBERS_CLASS: &str = "has-line-numbers";
pub const HIGHLIGHT_LINES_ATTR: &str = "data-highlight-lines";
/// 0-based source line of the block, set by the host renderer when known.
pub const SOURCE_LINE_ATTR: &str = "data-source-line";

/// Gutter metrics copied from the code element.
const GUTTER_METRICS: &[&str] = &["font-size", "line-height", "padding-top", "padding-bottom"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorateOutcome {
    Decorated {
        wrapper: NodeId,
        copy_button: Option<NodeId>,
    },
    AlreadyDecorated,
    /// Another decoration of the same block is in flight.
    Pending,
    FrontMatter,
    Ignored,
}

/// Where to read the raw document from.
#[derive(Clone, Copy)]
pub struct SourceContext<'a> {
    pub provider: &'a dyn SourceProvider,
    pub path: Option<&'a RelativePath>,
}

/// Marks a `<pre>` as pending for as long as it lives.
struct PendingGuard<'d> {
    dom: &'d mut Dom,
    pre: NodeId,
}

impl<'d> PendingGuard<'d> {
    fn hold(dom: &'d mut Dom, pre: NodeId) -> Self {
        dom.add_class(pre, PENDING_CLASS);
        Self { dom, pre }
    }
}

impl Deref for PendingGuard<'_> {
    type Target = Dom;

    fn deref(&self) -> &Dom {
        self.dom
    }
}

impl DerefMut for PendingGuard<'_> {
    fn deref_mut(&mut self) -> &mut Dom {
        self.dom
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.dom.remove_class(self.pre, PENDING_CLASS);
    }
}

fn is_front_matter(dom: &Dom, pre: NodeId, code: NodeId) -> bool {
    dom.has_class(pre, "frontmatter")
        || (dom.has_class(code, "language-yaml")
            && dom.closest(pre, |d, n| d.has_class(n, "frontmatter")).is_some())
}

fn is_in_callout(dom: &Dom, pre: NodeId) -> bool {
    dom.closest(pre, |d, n| d.has_class(n, "callout")).is_some()
}

fn is_wrapped(dom: &Dom, pre: NodeId) -> bool {
    dom.parent(pre)
        .is_some_and(|p| dom.has_class(p, WRAPPER_CLASS))
}

/// Language from a `language-xxx` class on the code element.
pub fn class_language(dom: &Dom, code: NodeId) -> Option<String> {
    dom.classes(code)
        .iter()
        .find_map(|c| c.strip_prefix("language-"))
        .filter(|l| !l.is_empty())
        .map(str::to_lowercase)
}

/// Decorates one rendered block, resolving its fence line from the source.
///
/// The fence is found by the host's line anchor when the `<pre>` has one,
/// else by matching the code text against the document. Without a source
/// the block is still decorated from its DOM attributes.
pub fn decorate(
    dom: &mut Dom,
    pre: NodeId,
    code: NodeId,
    env: &DecorationEnv<'_>,
    source: Option<&SourceContext<'_>>,
) -> DecorateOutcome {
    if dom.has_class(pre, DECORATED_CLASS) {
        return DecorateOutcome::AlreadyDecorated;
    }
    if dom.has_class(pre, PENDING_CLASS) {
        return DecorateOutcome::Pending;
    }
    if is_front_matter(dom, pre, code) {
        return DecorateOutcome::FrontMatter;
    }
    let language = class_language(dom, code);
    if language.as_deref().is_some_and(|l| env.settings.is_ignored(l)) {
        return DecorateOutcome::Ignored;
    }

    let fence_line = {
        let guard = PendingGuard::hold(dom, pre);
        source.and_then(|source| resolve_fence_line(&guard, pre, code, language.as_deref(), env, source))
    };
    log::debug!("Resolved fence line {fence_line:?}");

    decorate_with_fence_line(dom, pre, code, fence_line.as_deref(), env)
}

fn resolve_fence_line(
    dom: &Dom,
    pre: NodeId,
    code: NodeId,
    language: Option<&str>,
    env: &DecorationEnv<'_>,
    source: &SourceContext<'_>,
) -> Option<String> {
    let text = source.provider.source_text(source.path)?;
    if let Some(line) = dom
        .attr(pre, SOURCE_LINE_ATTR)
        .and_then(|v| v.parse::<usize>().ok())
    {
        return find_fence_line_by_line(&text, line + 1);
    }
    find_fence_line_for_code_block(
        &text,
        &dom.text_content(code),
        language,
        Some(env.languages),
    )
}

/// Parameters for a block: the fence line if known, with the DOM filling
/// in a missing title and language.
pub fn resolve_parameters(
    dom: &Dom,
    pre: NodeId,
    code: NodeId,
    fence_line: Option<&str>,
) -> FenceParameters {
    let mut params = parse_fence_parameters(fence_line);
    if params.title.is_empty()
        && let Some(title) = dom.attr(pre, "data-title")
    {
        params.title = title.to_string();
    }
    if params.language.is_empty()
        && let Some(language) = class_language(dom, code)
    {
        params.language = language;
    }
    params
}

/// Decorates a block whose fence line is already known.
pub fn decorate_with_fence_line(
    dom: &mut Dom,
    pre: NodeId,
    code: NodeId,
    fence_line: Option<&str>,
    env: &DecorationEnv<'_>,
) -> DecorateOutcome {
    if dom.has_class(pre, DECORATED_CLASS) {
        return DecorateOutcome::AlreadyDecorated;
    }
    if is_front_matter(dom, pre, code) {
        return DecorateOutcome::FrontMatter;
    }
    let params = resolve_parameters(dom, pre, code, fence_line);
    if env.settings.is_ignored(&params.language) {
        return DecorateOutcome::Ignored;
    }

    let model = header_model(&params, env);
    let wrapper = dom.create_element_with_class("div", WRAPPER_CLASS);
    if !model.language.is_empty() {
        dom.set_attr(wrapper, "data-language", &model.language);
    }
    dom.set_style(wrapper, "border-color", &model.border_color);
    dom.wrap(pre, wrapper);
    let header = render_header(dom, &model);
    dom.insert_before(wrapper, header, pre);
    let copy_button = dom.find_child(header, |d, n| d.has_class(n, header::COPY_CLASS));

    if !is_in_callout(dom, pre) {
        process_lines(dom, code, &params, env.settings.show_line_numbers);
    }
    if env.highlighter.is_enabled() {
        highlight_code(dom, code, &params.language, env);
    }

    dom.add_class(pre, DECORATED_CLASS);
    DecorateOutcome::Decorated {
        wrapper,
        copy_button,
    }
}

/// Re-applies header text and colors of an already decorated block.
/// Returns false if the block has no header.
pub fn refresh_header(
    dom: &mut Dom,
    pre: NodeId,
    params: &FenceParameters,
    env: &DecorationEnv<'_>,
) -> bool {
    let Some(wrapper) = dom.parent(pre).filter(|&p| dom.has_class(p, WRAPPER_CLASS)) else {
        return false;
    };
    let Some(header) = dom.find_child(wrapper, |d, n| d.has_class(n, header::HEADER_CLASS)) else {
        return false;
    };
    let model = header_model(params, env);
    apply_header(dom, header, &model);
    dom.set_style(wrapper, "border-color", &model.border_color);
    true
}

/// Gutter and highlight markers produced by [`process_lines`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLayout {
    pub line_count: usize,
    pub gutter: Option<NodeId>,
    /// 0-based indices of highlighted lines.
    pub highlighted: Vec<usize>,
}

/// Adds the line-number gutter and highlight markers for `code`.
///
/// Labels run from `offset` for each line; the gutter is one text node
/// carrying the code element's font metrics. Highlighted lines are stored
/// as 0-based indices in [`HIGHLIGHT_LINES_ATTR`] on the `<pre>`. Running it
/// again replaces the previous gutter.
pub fn process_lines(
    dom: &mut Dom,
    code: NodeId,
    params: &FenceParameters,
    show_line_numbers: bool,
) -> LineLayout {
    let line_count = dom.text_content(code).lines().count();
    let offset = params.line_numbers.offset;
    let target = dom.parent(code).unwrap_or(code);

    let old: Vec<NodeId> = dom
        .children(target)
        .iter()
        .copied()
        .filter(|&c| dom.has_class(c, GUTTER_CLASS))
        .collect();
    for node in old {
        dom.detach(node);
    }

    let gutter = if params.line_numbers.enabled.unwrap_or(show_line_numbers) {
        let labels: Vec<String> = (0..line_count)
            .map(|i| i.saturating_add(offset).to_string())
            .collect();
        let gutter = dom.create_element_with_class("div", GUTTER_CLASS);
        dom.set_attr(gutter, "aria-hidden", "true");
        for property in GUTTER_METRICS {
            if let Some(value) = dom.computed_style(code, property).map(str::to_string) {
                dom.set_style(gutter, property, &value);
            }
        }
        dom.set_text(gutter, &labels.join("\n"));
        if target != code {
            dom.insert_before(target, gutter, code);
        }
        dom.add_class(target, HAS_LINE_NUMBERS_CLASS);
        Some(gutter)
    } else {
        dom.remove_class(target, HAS_LINE_NUMBERS_CLASS);
        None
    };

    let highlighted: Vec<usize> = (0..line_count)
        .filter(|i| params.is_highlighted(i.saturating_add(offset)))
        .collect();
    if highlighted.is_empty() {
        dom.remove_attr(target, HIGHLIGHT_LINES_ATTR);
        dom.remove_class(target, HAS_HIGHLIGHTS_CLASS);
    } else {
        let list: Vec<String> = highlighted.iter().map(usize::to_string).collect();
        dom.set_attr(target, HIGHLIGHT_LINES_ATTR, &list.join(","));
        dom.add_class(target, HAS_HIGHLIGHTS_CLASS);
    }

    LineLayout {
        line_count,
        gutter,
        highlighted,
    }
}

/// Splits the code text into styled token spans. Returns the number of
/// tokens. Text content is unchanged.
pub fn highlight_code(dom: &mut Dom, code: NodeId, language: &str, env: &DecorationEnv<'_>) -> usize {
    let text = dom.text_content(code);
    let language = (!language.is_empty()).then_some(language);
    let tokens = env
        .tokenizer
        .tokenize(&text, language, env.settings.auto_detect_language);
    if tokens.is_empty() {
        return 0;
    }

    dom.clear_children(code);
    let mut pos = 0;
    let mut count = 0;
    for token in &tokens {
        let end = token.offset + token.length;
        let (Some(before), Some(slice)) = (text.get(pos..token.offset), text.get(token.offset..end))
        else {
            continue;
        };
        if !before.is_empty() {
            let node = dom.create_text(before);
            dom.append_child(code, node);
        }
        let span = dom.create_element_with_class("span", TOKEN_CLASS);
        for class in &token.classes {
            dom.add_class(span, class);
        }
        if let Some(style) = env.highlighter.style_for(&token.classes) {
            dom.set_style(span, "color", style.color);
            if style.bold {
                dom.set_style(span, "font-weight", "bold");
            }
            if style.italic {
                dom.set_style(span, "font-style", "italic");
            }
        }
        dom.set_text(span, slice);
        dom.append_child(code, span);
        pos = end;
        count += 1;
    }
    if let Some(rest) = text.get(pos..).filter(|r| !r.is_empty()) {
        let node = dom.create_text(rest);
        dom.append_child(code, node);
    }
    count
}

/// Decorates every `<pre><code>` under `root`.
pub fn decorate_all(
    dom: &mut Dom,
    root: NodeId,
    env: &DecorationEnv<'_>,
    source: Option<&SourceContext<'_>>,
) -> Vec<DecorateOutcome> {
    let blocks: Vec<(NodeId, NodeId)> = dom
        .query_all(root, |d, n| d.is_element(n, "pre"))
        .into_iter()
        .filter_map(|pre| {
            dom.find_child(pre, |d, n| d.is_element(n, "code"))
                .map(|code| (pre, code))
        })
        .collect();
    blocks
        .into_iter()
        .map(|(pre, code)| decorate(dom, pre, code, env, source))
        .collect()
}

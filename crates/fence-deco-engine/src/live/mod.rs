//! # Live-editor decorations
//!
//! [`build_decorations`] turns an editor buffer into a flat, sorted
//! [`DecorationSet`]: line classes for fence and content lines, a header
//! widget at each fence opening, and token marks. It is rebuilt wholesale;
//! [`LiveDecorator`] decides when a rebuild is needed.
//!
//! Only blocks intersecting a visible range get per-line work. Fence
//! open/close lines are always classed so styling stays contiguous at
//! scroll boundaries.

mod decorator;

use std::collections::BTreeMap;
use std::ops::Range;

use xi_rope::Rope;

use crate::context::DecorationEnv;
use crate::highlight::TokenStyle;
use crate::parsing::rope::{LineRef, Span, lines_with_spans};
use crate::parsing::{FenceLine, FenceParameters, FenceTracker, parse_fence_parameters};
use crate::reading::{HeaderModel, header_model};

pub use decorator::{LiveDecorator, ViewUpdate};

pub const LINE_CLASS: &str = "fence-deco-line";
pub const START_CLASS: &str = "fence-deco-start";
pub const END_CLASS: &str = "fence-deco-end";
pub const LN_ON_CLASS: &str = "fence-deco-ln-on";
pub const LN_OFF_CLASS: &str = "fence-deco-ln-off";
pub const HIGHLIGHT_CLASS: &str = "fence-deco-highlight";

/// An editor buffer and the ranges currently on screen.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub doc: Rope,
    pub viewport: Vec<Range<usize>>,
}

impl EditorState {
    /// A state with the whole document visible.
    pub fn new(text: &str) -> Self {
        Self {
            doc: Rope::from(text),
            viewport: vec![0..text.len()],
        }
    }

    pub fn with_viewport(text: &str, viewport: Vec<Range<usize>>) -> Self {
        Self {
            doc: Rope::from(text),
            viewport,
        }
    }

    fn is_visible(&self, span: Span) -> bool {
        self.viewport.iter().any(|r| span.intersects(r.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationKind {
    /// Widget placed before the line, hosting a block header.
    Widget(HeaderModel),
    Line {
        classes: Vec<String>,
        attrs: BTreeMap<String, String>,
    },
    /// Styles `[from, end)`.
    Mark {
        end: usize,
        classes: Vec<String>,
        style: Option<TokenStyle>,
    },
}

impl DecorationKind {
    fn rank(&self) -> u8 {
        match self {
            DecorationKind::Widget(_) => 0,
            DecorationKind::Line { .. } => 1,
            DecorationKind::Mark { .. } => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub kind: DecorationKind,
}

impl Decoration {
    fn line(from: usize, classes: &[&str], attrs: BTreeMap<String, String>) -> Self {
        Self {
            from,
            kind: DecorationKind::Line {
                classes: classes.iter().map(|c| c.to_string()).collect(),
                attrs,
            },
        }
    }

    pub fn classes(&self) -> &[String] {
        match &self.kind {
            DecorationKind::Line { classes, .. } | DecorationKind::Mark { classes, .. } => {
                classes.as_slice()
            }
            DecorationKind::Widget(_) => &[],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            DecorationKind::Line { attrs, .. } => attrs.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }
}

/// Decorations sorted by position; at equal positions widgets come first,
/// then line decorations, then marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    fn from_unsorted(mut decorations: Vec<Decoration>) -> Self {
        decorations.sort_by_key(|d| (d.from, d.kind.rank()));
        Self { decorations }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    /// Line decoration starting at `from`, if any.
    pub fn line_at(&self, from: usize) -> Option<&Decoration> {
        self.decorations
            .iter()
            .find(|d| d.from == from && matches!(d.kind, DecorationKind::Line { .. }))
    }

    pub fn widgets(&self) -> impl Iterator<Item = (usize, &HeaderModel)> {
        self.decorations.iter().filter_map(|d| match &d.kind {
            DecorationKind::Widget(model) => Some((d.from, model)),
            _ => None,
        })
    }

    pub fn marks(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations
            .iter()
            .filter(|d| matches!(d.kind, DecorationKind::Mark { .. }))
    }
}

/// Pre-pass result for one fenced block.
#[derive(Debug, Clone, Copy)]
struct BlockExtent {
    span: Span,
    line_count: usize,
}

/// Finds every block's byte extent and content line count in one scan.
/// Unterminated blocks run to the end of their quote run, or of the
/// document.
fn block_extents(lines: &[LineRef]) -> Vec<BlockExtent> {
    let mut extents = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut current: Option<BlockExtent> = None;

    for line in lines {
        let step = tracker.step_line(&line.text);
        if step.abandoned {
            extents.extend(current.take());
        }
        match step.role {
            FenceLine::Open(_) => {
                current = Some(BlockExtent {
                    span: line.span,
                    line_count: 0,
                });
            }
            FenceLine::Content => {
                if let Some(block) = current.as_mut() {
                    block.line_count += 1;
                    block.span.end = line.span.end;
                }
            }
            FenceLine::Close => {
                if let Some(mut block) = current.take() {
                    block.span.end = line.span.end;
                    extents.push(block);
                }
            }
            FenceLine::Outside => {}
        }
    }
    extents.extend(current);
    extents
}

fn digits(n: usize) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

/// Content line of the block being expanded, for mapping token offsets.
struct ContentLine {
    /// Offset of the line in the joined block text.
    text_offset: usize,
    /// Offset of the quote-stripped line in the document.
    doc_offset: usize,
    len: usize,
}

enum ScanState {
    Outside,
    InBlock {
        params: FenceParameters,
        visible: bool,
        index: usize,
        text: String,
        lines: Vec<ContentLine>,
    },
    Skip,
}

fn token_marks(
    env: &DecorationEnv<'_>,
    language: &str,
    text: &str,
    lines: &[ContentLine],
    out: &mut Vec<Decoration>,
) {
    let language = (!language.is_empty()).then_some(language);
    for token in env
        .tokenizer
        .tokenize(text, language, env.settings.auto_detect_language)
    {
        let index = lines.partition_point(|l| l.text_offset <= token.offset);
        let Some(line) = index.checked_sub(1).map(|i| &lines[i]) else {
            continue;
        };
        let column = token.offset - line.text_offset;
        if column + token.length > line.len {
            continue;
        }
        let from = line.doc_offset + column;
        out.push(Decoration {
            from,
            kind: DecorationKind::Mark {
                end: from + token.length,
                style: env.highlighter.style_for(&token.classes),
                classes: token.classes,
            },
        });
    }
}

/// Builds the full decoration set for `state`.
pub fn build_decorations(state: &EditorState, env: &DecorationEnv<'_>) -> DecorationSet {
    let lines: Vec<LineRef> = lines_with_spans(&state.doc).collect();
    let extents = block_extents(&lines);
    let highlight = env.highlighter.is_enabled();

    let mut out = Vec::new();
    let mut tracker = FenceTracker::new();
    let mut scan = ScanState::Outside;
    let mut block_index = 0;

    let finish = |scan: ScanState, out: &mut Vec<Decoration>| {
        if let ScanState::InBlock {
            params,
            visible: true,
            text,
            lines,
            ..
        } = scan
            && highlight
        {
            token_marks(env, &params.language, &text, &lines, out);
        }
    };

    for line in &lines {
        let step = tracker.step_line(&line.text);
        let stripped = step.text;
        let stripped_start = line.span.start + (line.text.len() - stripped.len());
        if step.abandoned {
            finish(std::mem::replace(&mut scan, ScanState::Outside), &mut out);
        }

        match step.role {
            FenceLine::Outside => {}
            FenceLine::Open(_) => {
                let extent = extents.get(block_index).copied();
                block_index += 1;
                let params = parse_fence_parameters(Some(stripped));
                let visible = extent.is_some_and(|e| state.is_visible(e.span));

                if env.settings.is_ignored(&params.language) {
                    out.push(Decoration::line(line.span.start, &[LINE_CLASS, START_CLASS], BTreeMap::new()));
                    scan = ScanState::Skip;
                    continue;
                }

                let mut attrs = BTreeMap::new();
                if visible && let Some(extent) = extent {
                    let max_label = extent
                        .line_count
                        .saturating_add(params.line_numbers.offset)
                        .saturating_sub(1);
                    attrs.insert("data-line-count".to_string(), extent.line_count.to_string());
                    attrs.insert("data-gutter-width".to_string(), digits(max_label).to_string());
                    out.push(Decoration {
                        from: line.span.start,
                        kind: DecorationKind::Widget(header_model(&params, env)),
                    });
                }
                out.push(Decoration::line(line.span.start, &[LINE_CLASS, START_CLASS], attrs));
                scan = ScanState::InBlock {
                    params,
                    visible,
                    index: 0,
                    text: String::new(),
                    lines: Vec::new(),
                };
            }
            FenceLine::Content => {
                let ScanState::InBlock {
                    params,
                    visible: true,
                    index,
                    text,
                    lines,
                } = &mut scan
                else {
                    continue;
                };
                let label = index.saturating_add(params.line_numbers.offset);
                *index += 1;

                let mut classes = vec![LINE_CLASS];
                match params.line_numbers.enabled {
                    Some(true) => classes.push(LN_ON_CLASS),
                    Some(false) => classes.push(LN_OFF_CLASS),
                    None => {}
                }
                if params.is_highlighted(label) {
                    classes.push(HIGHLIGHT_CLASS);
                }
                let attrs = BTreeMap::from([("data-line-number".to_string(), label.to_string())]);
                out.push(Decoration::line(line.span.start, &classes, attrs));

                if highlight {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    lines.push(ContentLine {
                        text_offset: text.len(),
                        doc_offset: stripped_start,
                        len: stripped.len(),
                    });
                    text.push_str(stripped);
                }
            }
            FenceLine::Close => {
                out.push(Decoration::line(line.span.start, &[LINE_CLASS, END_CLASS], BTreeMap::new()));
                finish(std::mem::replace(&mut scan, ScanState::Outside), &mut out);
            }
        }
    }
    finish(scan, &mut out);

    DecorationSet::from_unsorted(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::PluginContext;
    use fence_deco_config::Settings;
    use pretty_assertions::assert_eq;

    fn build(text: &str, settings: Settings) -> DecorationSet {
        let ctx = PluginContext::activate(settings);
        ctx.with_env(|env| build_decorations(&EditorState::new(text), env))
    }

    fn plain() -> Settings {
        Settings {
            highlighter_enabled: false,
            ..Settings::default()
        }
    }

    const DOC: &str = "intro\n```python title:\"Demo\" ln:3 hl:4\na\nb\n```\nouter\n";

    #[test]
    fn fence_lines_and_content_lines_are_classed() {
        let set = build(DOC, plain());

        let start = set.line_at(6).unwrap();
        assert!(start.has_class(START_CLASS));
        assert_eq!(start.attr("data-line-count"), Some("2"));
        assert_eq!(start.attr("data-gutter-width"), Some("1"));

        let first = set.line_at(39).unwrap();
        assert_eq!(first.attr("data-line-number"), Some("3"));
        assert!(first.has_class(LN_ON_CLASS));
        assert!(!first.has_class(HIGHLIGHT_CLASS));

        let second = set.line_at(41).unwrap();
        assert_eq!(second.attr("data-line-number"), Some("4"));
        assert!(second.has_class(HIGHLIGHT_CLASS));

        assert!(set.line_at(43).unwrap().has_class(END_CLASS));
        assert!(set.line_at(47).is_none());
    }

    #[test]
    fn header_widget_precedes_start_line() {
        let set = build(DOC, plain());
        let first: Vec<_> = set.iter().filter(|d| d.from == 6).collect();

        assert!(matches!(first[0].kind, DecorationKind::Widget(_)));
        let (_, header) = set.widgets().next().unwrap();
        assert_eq!(header.title, "Demo");
        assert_eq!(header.label, "Python");
    }

    #[test]
    fn ignored_language_keeps_only_fence_classes() {
        let set = build(
            "```mermaid\ngraph TD\n```\n",
            Settings {
                ignore_languages: vec!["mermaid".to_string()],
                ..plain()
            },
        );

        assert_eq!(set.len(), 2);
        assert!(set.line_at(0).unwrap().has_class(START_CLASS));
        assert!(set.line_at(20).unwrap().has_class(END_CLASS));
        assert_eq!(set.widgets().count(), 0);
    }

    #[test]
    fn offscreen_blocks_get_fence_classes_only() {
        let text = "```js\na\n```\nfiller\n```js\nb\n```\n";
        let ctx = PluginContext::activate(plain());
        let state = EditorState::with_viewport(text, vec![20..text.len()]);
        let set = ctx.with_env(|env| build_decorations(&state, env));

        let offscreen_start = set.line_at(0).unwrap();
        assert!(offscreen_start.has_class(START_CLASS));
        assert_eq!(offscreen_start.attr("data-line-count"), None);
        assert!(set.line_at(6).is_none());
        assert!(set.line_at(8).unwrap().has_class(END_CLASS));

        assert_eq!(set.widgets().count(), 1);
        assert_eq!(set.line_at(25).unwrap().attr("data-line-number"), Some("1"));
    }

    #[test]
    fn quoted_blocks_are_decorated() {
        let set = build("> ```sh\n> ls\n> ```\n", plain());

        assert!(set.line_at(0).unwrap().has_class(START_CLASS));
        assert_eq!(set.line_at(8).unwrap().attr("data-line-number"), Some("1"));
        assert!(set.line_at(13).unwrap().has_class(END_CLASS));
    }

    #[test]
    fn unterminated_callout_block_ends_with_the_quote() {
        let text = "> [!note]\n> ```js\n> a()\n\n```py\nb()\n```\nafter\n";
        let set = build(text, plain());

        let callout = set.line_at(10).unwrap();
        assert!(callout.has_class(START_CLASS));
        assert_eq!(callout.attr("data-line-count"), Some("1"));
        assert_eq!(set.line_at(18).unwrap().attr("data-line-number"), Some("1"));
        assert!(set.line_at(24).is_none());

        let top = set.line_at(25).unwrap();
        assert!(top.has_class(START_CLASS));
        assert_eq!(top.attr("data-line-count"), Some("1"));
        assert_eq!(set.line_at(31).unwrap().attr("data-line-number"), Some("1"));
        assert!(set.line_at(35).unwrap().has_class(END_CLASS));
        assert!(set.line_at(39).is_none());
        assert_eq!(set.widgets().count(), 2);
    }

    #[test]
    fn out_of_range_line_offset_falls_back_to_one() {
        let set = build("```rust ln:18446744073709551615\nfn a() {}\n```\n", plain());

        assert_eq!(set.line_at(0).unwrap().attr("data-gutter-width"), Some("1"));
        let content = set.line_at(32).unwrap();
        assert_eq!(content.attr("data-line-number"), Some("1"));
        assert!(!content.has_class(LN_ON_CLASS));
    }

    #[test]
    fn gutter_width_counts_digits_of_last_label() {
        let body = "x\n".repeat(12);
        let set = build(&format!("```\n{body}```\n"), plain());

        assert_eq!(set.line_at(0).unwrap().attr("data-gutter-width"), Some("2"));
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        let set = build("```rust\nfn a() {}\n", plain());

        assert_eq!(set.line_at(0).unwrap().attr("data-line-count"), Some("1"));
        assert!(set.line_at(8).is_some());
    }

    #[test]
    fn token_marks_map_to_document_offsets() {
        let text = "> ```rust\n> let s = \"hi\";\n> ```\n";
        let set = build(text, Settings::default());

        let marks: Vec<_> = set.marks().collect();
        assert!(!marks.is_empty());
        for mark in &marks {
            let DecorationKind::Mark { end, .. } = mark.kind else {
                unreachable!()
            };
            assert!(mark.from >= 12 && end <= 25, "{mark:?}");
        }
        assert!(marks.iter().any(|m| {
            let DecorationKind::Mark { end, .. } = m.kind else {
                return false;
            };
            text[m.from..end].contains("hi") && m.has_class("string")
        }));
    }

    #[test]
    fn decorations_are_sorted() {
        let set = build(DOC, Settings::default());
        let positions: Vec<usize> = set.iter().map(|d| d.from).collect();
        let mut sorted = positions.clone();
        sorted.sort();

        assert_eq!(positions, sorted);
    }

    #[test]
    fn digit_counts() {
        assert_eq!(digits(0), 1);
        assert_eq!(digits(9), 1);
        assert_eq!(digits(10), 2);
        assert_eq!(digits(1000), 4);
    }
}

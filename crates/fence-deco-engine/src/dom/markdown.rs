//! Markdown to [`Dom`] rendering, the reading-view host used by the CLI and
//! tests.
//!
//! Mirrors what the decorator expects from a host renderer:
//!
//! - code blocks as `pre > code.language-xxx`
//! - top-level code blocks carry `data-source-line` (0-based line of the
//!   fence), the host's approximate section anchor
//! - `> [!type]` blockquotes become `div.callout`, optionally rendered late
//!   to imitate hosts that fill callouts asynchronously
//! - YAML front matter becomes `pre.frontmatter > code.language-yaml`

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use regex::Regex;

use super::{Dom, NodeId};
use crate::parsing::parse_fence_parameters;

static CALLOUT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s*\[!([\w-]+)\]").expect("valid regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Leave callout bodies out of the tree until
    /// [`RenderedMarkdown::flush_deferred`] is called.
    pub defer_callouts: bool,
}

/// The result of rendering: the DOM, its root and any callout bodies still
/// waiting to be inserted.
#[derive(Debug)]
pub struct RenderedMarkdown {
    pub dom: Dom,
    pub root: NodeId,
    deferred: Vec<(NodeId, NodeId)>,
}

impl RenderedMarkdown {
    /// Inserts deferred callout bodies. Returns how many were flushed.
    pub fn flush_deferred(&mut self) -> usize {
        let deferred = std::mem::take(&mut self.deferred);
        for &(callout, holder) in &deferred {
            let children = self.dom.children(holder).to_vec();
            for child in children {
                self.dom.append_child(callout, child);
            }
        }
        deferred.len()
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }

    pub fn html(&self) -> String {
        super::encode::html(&self.dom, self.root)
    }
}

pub fn render_markdown(source: &str, options: RenderOptions) -> RenderedMarkdown {
    let mut dom = Dom::new();
    let root = dom.create_element_with_class("div", "markdown-rendered");
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| line_starts.partition_point(|&s| s <= offset) - 1;

    let mut stack = vec![root];
    // Number of open blockquotes and list items; code inside them has no
    // reliable section anchor.
    let mut nesting = 0usize;
    let mut deferred = Vec::new();

    let parser = Parser::new_ext(
        source,
        Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
            | Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS,
    );

    for (event, range) in parser.into_offset_iter() {
        let parent = *stack.last().unwrap_or(&root);
        match event {
            Event::Start(tag) => {
                let el = match tag {
                    Tag::CodeBlock(kind) => {
                        let pre = dom.create_element("pre");
                        let code = dom.create_element("code");
                        if let CodeBlockKind::Fenced(info) = kind {
                            let language = parse_fence_parameters(Some(&info)).language;
                            if !language.is_empty() {
                                dom.add_class(code, &format!("language-{language}"));
                            }
                        }
                        if nesting == 0 {
                            dom.set_attr(pre, "data-source-line", &line_of(range.start).to_string());
                        }
                        dom.append_child(parent, pre);
                        dom.append_child(pre, code);
                        stack.push(code);
                        continue;
                    }
                    Tag::MetadataBlock(_) => {
                        let pre = dom.create_element_with_class("pre", "frontmatter");
                        let code = dom.create_element_with_class("code", "language-yaml");
                        dom.append_child(parent, pre);
                        dom.append_child(pre, code);
                        stack.push(code);
                        continue;
                    }
                    Tag::BlockQuote(_) => {
                        nesting += 1;
                        let first_line = source[range.start..].lines().next().unwrap_or("");
                        match CALLOUT_MARKER.captures(first_line) {
                            Some(caps) => {
                                let callout = dom.create_element_with_class("div", "callout");
                                dom.set_attr(callout, "data-callout", &caps[1].to_lowercase());
                                dom.append_child(parent, callout);
                                if options.defer_callouts {
                                    let holder = dom.create_element("div");
                                    deferred.push((callout, holder));
                                    stack.push(holder);
                                } else {
                                    stack.push(callout);
                                }
                                continue;
                            }
                            None => dom.create_element("blockquote"),
                        }
                    }
                    Tag::Item => {
                        nesting += 1;
                        dom.create_element("li")
                    }
                    Tag::Paragraph => dom.create_element("p"),
                    Tag::Heading { level, .. } => dom.create_element(heading_tag(level)),
                    Tag::List(Some(_)) => dom.create_element("ol"),
                    Tag::List(None) => dom.create_element("ul"),
                    Tag::Emphasis => dom.create_element("em"),
                    Tag::Strong => dom.create_element("strong"),
                    Tag::Strikethrough => dom.create_element("del"),
                    Tag::Link { dest_url, .. } => {
                        let a = dom.create_element("a");
                        dom.set_attr(a, "href", &dest_url);
                        a
                    }
                    Tag::Table(_) => dom.create_element("table"),
                    Tag::TableHead | Tag::TableRow => dom.create_element("tr"),
                    Tag::TableCell => dom.create_element("td"),
                    _ => dom.create_element("span"),
                };
                dom.append_child(parent, el);
                stack.push(el);
            }
            Event::End(end) => {
                if matches!(
                    end,
                    pulldown_cmark::TagEnd::BlockQuote(_) | pulldown_cmark::TagEnd::Item
                ) {
                    nesting = nesting.saturating_sub(1);
                }
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                let node = dom.create_text(&text);
                dom.append_child(parent, node);
            }
            Event::Code(text) => {
                let code = dom.create_element("code");
                dom.set_text(code, &text);
                dom.append_child(parent, code);
            }
            Event::SoftBreak => {
                let node = dom.create_text("\n");
                dom.append_child(parent, node);
            }
            Event::HardBreak => {
                let br = dom.create_element("br");
                dom.append_child(parent, br);
            }
            Event::Rule => {
                let hr = dom.create_element("hr");
                dom.append_child(parent, hr);
            }
            Event::TaskListMarker(checked) => {
                let input = dom.create_element("input");
                dom.set_attr(input, "type", "checkbox");
                if checked {
                    dom.set_attr(input, "checked", "");
                }
                dom.append_child(parent, input);
            }
            _ => {}
        }
    }

    // Rendering itself is not a mutation anyone observes.
    dom.take_added();

    RenderedMarkdown {
        dom,
        root,
        deferred,
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

//! A small arena DOM standing in for the host's rendered reading view.
//!
//! Nodes are addressed by [`NodeId`] and never freed; detached nodes simply
//! have no parent. Insertions are recorded so an observer can be told which
//! subtrees were added since it last looked.

pub mod encode;
pub mod markdown;

use std::collections::BTreeMap;

/// Handle to a node in a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element tag, classes, attributes and inline style.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Style properties children inherit from their ancestors.
const INHERITED: &[&str] = &["font-size", "line-height", "font-family", "color"];

#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Node>,
    added: Vec<NodeId>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            ..ElementData::default()
        }))
    }

    /// Creates a detached element carrying `classes` (space separated).
    pub fn create_element_with_class(&mut self, tag: &str, classes: &str) -> NodeId {
        let id = self.create_element(tag);
        for class in classes.split_whitespace() {
            self.add_class(id, class);
        }
        id
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Removes `id` from its parent, if any.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.added.push(child);
    }

    /// Inserts `child` into `parent` before `reference`, or appends it if
    /// `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&c| c == reference) {
            Some(index) => children.insert(index, child),
            None => children.push(child),
        }
        self.nodes[child.0].parent = Some(parent);
        self.added.push(child);
    }

    /// Puts `wrapper` where `id` was and moves `id` inside it.
    pub fn wrap(&mut self, id: NodeId, wrapper: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.insert_before(parent, wrapper, id);
        }
        self.append_child(wrapper, id);
    }

    /// Removes all children of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Replaces the children of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|el| el.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id)
            && !el.classes.iter().any(|c| c == class)
        {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        self.element(id)
            .map(|el| el.classes.as_slice())
            .unwrap_or(&[])
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|el| el.attrs.get(name))
            .map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.remove(name);
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id)
            .and_then(|el| el.style.get(property))
            .map(String::as_str)
    }

    /// Sets an inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            if value.is_empty() {
                el.style.remove(property);
            } else {
                el.style.insert(property.to_string(), value.to_string());
            }
        }
    }

    /// Inline style of `id`, falling back to ancestors for inherited
    /// properties.
    pub fn computed_style(&self, id: NodeId, property: &str) -> Option<&str> {
        if let Some(value) = self.style(id, property) {
            return Some(value);
        }
        if !INHERITED.contains(&property) {
            return None;
        }
        self.ancestors(id)
            .find_map(|ancestor| self.style(ancestor, property))
    }

    /// Parents of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), |&n| self.parent(n))
    }

    /// Nearest ancestor (not `id` itself) matching `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        self.ancestors(id).find(|&a| pred(self, a))
    }

    /// `id` and all its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
        out
    }

    /// Descendants of `root` (inclusive) matching `pred`, in document order.
    pub fn query_all(&self, root: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| pred(self, n))
            .collect()
    }

    /// First child of `id` matching `pred`.
    pub fn find_child(&self, id: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| pred(self, c))
    }

    /// True if `id` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, id: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Nodes inserted since the last call, oldest first.
    pub fn take_added(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pre_with_code(dom: &mut Dom, text: &str) -> (NodeId, NodeId, NodeId) {
        let root = dom.create_element("div");
        let pre = dom.create_element("pre");
        let code = dom.create_element("code");
        dom.append_child(root, pre);
        dom.append_child(pre, code);
        dom.set_text(code, text);
        (root, pre, code)
    }

    #[test]
    fn wrap_replaces_node_in_parent() {
        let mut dom = Dom::new();
        let (root, pre, _) = pre_with_code(&mut dom, "x");
        let before = dom.create_element("p");
        dom.insert_before(root, before, pre);

        let wrapper = dom.create_element("div");
        dom.wrap(pre, wrapper);

        assert_eq!(dom.children(root), &[before, wrapper]);
        assert_eq!(dom.children(wrapper), &[pre]);
        assert_eq!(dom.parent(pre), Some(wrapper));
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let mut dom = Dom::new();
        let (root, _, code) = pre_with_code(&mut dom, "a\n");
        let span = dom.create_element("span");
        dom.set_text(span, "b");
        dom.append_child(code, span);

        assert_eq!(dom.text_content(root), "a\nb");
    }

    #[test]
    fn classes_are_unique() {
        let mut dom = Dom::new();
        let el = dom.create_element_with_class("div", "a b a");

        assert_eq!(dom.classes(el), &["a".to_string(), "b".to_string()]);
        dom.remove_class(el, "a");
        assert!(!dom.has_class(el, "a"));
        assert!(dom.has_class(el, "b"));
    }

    #[test]
    fn computed_style_inherits_only_inherited_properties() {
        let mut dom = Dom::new();
        let (root, pre, code) = pre_with_code(&mut dom, "x");
        dom.set_style(root, "font-size", "14px");
        dom.set_style(pre, "padding-top", "8px");

        assert_eq!(dom.computed_style(code, "font-size"), Some("14px"));
        assert_eq!(dom.computed_style(code, "padding-top"), None);
        assert_eq!(dom.computed_style(pre, "padding-top"), Some("8px"));
    }

    #[test]
    fn query_all_is_document_order() {
        let mut dom = Dom::new();
        let root = dom.create_element("div");
        let first = dom.create_element("pre");
        let inner = dom.create_element("div");
        let second = dom.create_element("pre");
        let third = dom.create_element("pre");
        dom.append_child(root, first);
        dom.append_child(root, inner);
        dom.append_child(inner, second);
        dom.append_child(root, third);

        assert_eq!(
            dom.query_all(root, |d, n| d.is_element(n, "pre")),
            vec![first, second, third]
        );
    }

    #[test]
    fn take_added_drains_insertions() {
        let mut dom = Dom::new();
        let (root, pre, code) = pre_with_code(&mut dom, "x");

        let added = dom.take_added();
        assert_eq!(added.len(), 3);
        assert_eq!(added[..2], [pre, code]);
        assert!(dom.contains(root, added[2]));
        assert!(dom.take_added().is_empty());
    }
}

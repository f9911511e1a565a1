use super::{Dom, NodeId, NodeKind};

const VOID: &[&str] = &["br", "hr", "img", "input", "meta", "link"];

/// Serializes `id` and its subtree as HTML.
pub fn html(dom: &Dom, id: NodeId) -> String {
    let mut buf = String::new();
    write_node(&mut buf, dom, id);
    buf
}

fn write_node(buf: &mut String, dom: &Dom, id: NodeId) {
    match dom.kind(id) {
        NodeKind::Text(text) => buf.push_str(&html_escape::encode_text(text)),
        NodeKind::Element(el) => {
            buf.push('<');
            buf.push_str(&el.tag);

            if !el.classes.is_empty() {
                write_attr(buf, "class", &el.classes.join(" "));
            }
            for (name, value) in &el.attrs {
                write_attr(buf, name, value);
            }
            if !el.style.is_empty() {
                let style = el
                    .style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                write_attr(buf, "style", &style);
            }
            buf.push('>');

            if VOID.contains(&el.tag.as_str()) {
                return;
            }
            for &child in dom.children(id) {
                write_node(buf, dom, child);
            }
            buf.push_str("</");
            buf.push_str(&el.tag);
            buf.push('>');
        }
    }
}

fn write_attr(buf: &mut String, name: &str, value: &str) {
    buf.push(' ');
    buf.push_str(name);
    buf.push_str("=\"");
    buf.push_str(&html_escape::encode_double_quoted_attribute(value));
    buf.push('"');
}

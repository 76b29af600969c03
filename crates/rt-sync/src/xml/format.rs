//! Canonical serialization of parsed storage format.

use std::fmt::Write;

use super::tree::{Element, Node};

const INDENT: &str = "  ";

/// XML whitespace. Unlike `char::is_whitespace` this excludes U+00A0, which
/// is content.
const XML_WHITESPACE: [char; 4] = [' ', '\t', '\n', '\r'];

/// Elements whose content is never re-indented.
const PRESERVE_WHITESPACE: &[&str] = &["pre", "ac:plain-text-body"];

/// Phrasing elements. A parent holding any of these keeps its content on
/// one line, since whitespace between them is significant.
const INLINE_ELEMENTS: &[&str] = &[
    "a",
    "abbr",
    "b",
    "br",
    "cite",
    "code",
    "del",
    "em",
    "i",
    "img",
    "ins",
    "kbd",
    "mark",
    "q",
    "s",
    "small",
    "span",
    "strike",
    "strong",
    "sub",
    "sup",
    "time",
    "u",
    "ac:emoticon",
    "ac:image",
    "ac:inline-comment-marker",
    "ac:link",
    "ac:link-body",
    "ac:placeholder",
    "ac:plain-text-link-body",
];

/// Serialize top-level nodes, one per line.
pub(crate) fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();

    if is_block(nodes) {
        for node in nodes {
            write_block_node(&mut out, node, 0);
        }
    } else {
        let mut line = String::new();
        for node in nodes {
            write_inline(&mut line, node);
        }
        let line = line.trim_matches(XML_WHITESPACE);
        if !line.is_empty() {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Whether children can be laid out one per line without changing content.
fn is_block(children: &[Node]) -> bool {
    children.iter().all(|child| match child {
        Node::Text(text) => is_layout(text),
        Node::CData(_) => false,
        Node::Element(element) => !is_inline(&element.name),
        Node::Comment(_) => true,
    })
}

/// Whether text is only indentation and line breaks.
fn is_layout(text: &str) -> bool {
    text.chars().all(|c| XML_WHITESPACE.contains(&c))
}

fn is_inline(name: &str) -> bool {
    name.starts_with("ri:") || INLINE_ELEMENTS.contains(&name)
}

fn is_block_element(element: &Element) -> bool {
    !PRESERVE_WHITESPACE.contains(&element.name.as_str())
        && element
            .children
            .iter()
            .any(|c| matches!(c, Node::Element(_) | Node::Comment(_)))
        && is_block(&element.children)
}

fn write_block_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        // Whitespace between block children
        Node::Text(_) => {}
        Node::Element(element) if is_block_element(element) => {
            indent(out, depth);
            write_start(out, element);
            out.push('>');
            out.push('\n');
            for child in &element.children {
                write_block_node(out, child, depth + 1);
            }
            indent(out, depth);
            let _ = write!(out, "</{}>", element.name);
            out.push('\n');
        }
        other => {
            indent(out, depth);
            write_inline(out, other);
            out.push('\n');
        }
    }
}

fn write_inline(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => escape_text(out, text),
        Node::Comment(text) => {
            let _ = write!(out, "<!--{text}-->");
        }
        Node::CData(text) => {
            let _ = write!(out, "<![CDATA[{text}]]>");
        }
        Node::Element(element) => {
            write_start(out, element);
            if element.children.is_empty() {
                out.push_str(" />");
                return;
            }
            out.push('>');
            for child in &element.children {
                write_inline(out, child);
            }
            let _ = write!(out, "</{}>", element.name);
        }
    }
}

fn write_start(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attrs {
        let _ = write!(out, " {key}=\"");
        escape_attr(out, value);
        out.push('"');
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Node {
        Node::Text(s.to_owned())
    }

    fn el(name: &str, children: Vec<Node>) -> Node {
        Node::Element(Element {
            name: name.to_owned(),
            attrs: Vec::new(),
            children,
        })
    }

    #[test]
    fn test_serialize_block_children_indented() {
        let nodes = vec![el(
            "ul",
            vec![text("\n"), el("li", vec![text("a")]), el("li", vec![text("b")])],
        )];
        assert_eq!(serialize(&nodes), "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n");
    }

    #[test]
    fn test_serialize_mixed_content_inline() {
        let nodes = vec![el("p", vec![text("a "), el("b", vec![text("x")]), text(" c")])];
        assert_eq!(serialize(&nodes), "<p>a <b>x</b> c</p>\n");
    }

    #[test]
    fn test_serialize_empty_element() {
        assert_eq!(serialize(&[el("br", Vec::new())]), "<br />\n");
    }

    #[test]
    fn test_serialize_escapes() {
        let nodes = vec![Node::Element(Element {
            name: "a".to_owned(),
            attrs: vec![("title".to_owned(), "say \"hi\" & <go>".to_owned())],
            children: vec![text("1 < 2 & 3 > 2 \"q\"")],
        })];
        assert_eq!(
            serialize(&nodes),
            "<a title=\"say &quot;hi&quot; &amp; &lt;go>\">1 &lt; 2 &amp; 3 &gt; 2 \"q\"</a>\n"
        );
    }

    #[test]
    fn test_serialize_inline_siblings_stay_on_one_line() {
        let nodes = vec![el(
            "p",
            vec![el("b", vec![text("x")]), text(" "), el("i", vec![text("y")])],
        )];
        assert_eq!(serialize(&nodes), "<p><b>x</b> <i>y</i></p>\n");
    }

    #[test]
    fn test_serialize_pre_untouched() {
        let nodes = vec![el("pre", vec![el("code", vec![text("x")]), text("\n")])];
        assert_eq!(serialize(&nodes), "<pre><code>x</code>\n</pre>\n");
    }

    #[test]
    fn test_serialize_top_level_text() {
        let nodes = vec![text("  Hello "), el("b", vec![text("x")]), text("\n")];
        assert_eq!(serialize(&nodes), "Hello <b>x</b>\n");
    }

    #[test]
    fn test_serialize_keeps_nbsp_at_edges() {
        let nodes = vec![text("\u{a0}Hello\u{a0}\n")];
        assert_eq!(serialize(&nodes), "\u{a0}Hello\u{a0}\n");
    }

    #[test]
    fn test_nbsp_beside_block_children_is_content() {
        let nodes = vec![el("td", vec![text("\u{a0}"), el("p", vec![text("x")])])];
        assert_eq!(serialize(&nodes), "<td>\u{a0}<p>x</p></td>\n");
    }

    #[test]
    fn test_serialize_nothing() {
        assert_eq!(serialize(&[]), "");
        assert_eq!(serialize(&[text(" \n ")]), "");
    }
}

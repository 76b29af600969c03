//! Lenient storage-format parser.
//!
//! Tokenizes with quick-xml but keeps its own element stack, so unclosed
//! elements can be closed at the right place instead of failing the parse.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use super::XmlError;

/// HTML elements that never have content. Editors often write them without
/// a closing tag, so a start tag is taken as the whole element.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Parsed storage-format node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
}

/// Element with attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) children: Vec<Node>,
}

impl Element {
    fn new(reader: &Reader<&[u8]>, start: &BytesStart) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| XmlError::syntax(reader, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| XmlError::syntax(reader, e))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }
}

/// Parse a fragment into top-level nodes, repairing unclosed elements.
pub(crate) fn parse_fragment(xml: &str) -> Result<Vec<Node>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut root: Vec<Node> = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::syntax(&reader, e))?;
        match event {
            Event::Start(e) => {
                let element = Element::new(&reader, &e)?;
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    push_node(&mut root, &mut open, Node::Element(element));
                } else {
                    open.push(element);
                }
            }
            Event::Empty(e) => {
                let element = Element::new(&reader, &e)?;
                push_node(&mut root, &mut open, Node::Element(element));
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let Some(depth) = open.iter().rposition(|el| el.name == name) else {
                    // `<br></br>`: the start tag already produced the element
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        continue;
                    }
                    return Err(XmlError::UnmatchedEndTag {
                        name,
                        position: reader.buffer_position(),
                    });
                };
                while open.len() > depth {
                    close_top(&mut root, &mut open);
                }
            }
            Event::Text(e) => {
                let text = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|e| XmlError::syntax(&reader, e))?;
                push_text(&mut root, &mut open, &text);
            }
            Event::GeneralRef(e) => {
                let name = reader
                    .decoder()
                    .decode(&e)
                    .map_err(|e| XmlError::syntax(&reader, e))?;
                push_text(&mut root, &mut open, &resolve_reference(&name));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_node(&mut root, &mut open, Node::CData(text));
            }
            Event::Comment(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_node(&mut root, &mut open, Node::Comment(text));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !open.is_empty() {
        debug!(unclosed = open.len(), "Closing elements left open at end of input");
    }
    while !open.is_empty() {
        close_top(&mut root, &mut open);
    }
    Ok(root)
}

fn close_top(root: &mut Vec<Node>, open: &mut Vec<Element>) {
    if let Some(element) = open.pop() {
        push_node(root, open, Node::Element(element));
    }
}

fn push_node(root: &mut Vec<Node>, open: &mut [Element], node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

/// Append text, merging with a preceding text node.
fn push_text(root: &mut Vec<Node>, open: &mut [Element], text: &str) {
    let siblings = match open.last_mut() {
        Some(parent) => &mut parent.children,
        None => root,
    };
    if let Some(Node::Text(last)) = siblings.last_mut() {
        last.push_str(text);
    } else {
        siblings.push(Node::Text(text.to_owned()));
    }
}

/// Resolve a predefined entity or character reference to its text.
fn resolve_reference(name: &str) -> String {
    match name {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = match s.strip_prefix("#x").or_else(|| s.strip_prefix("#X")) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => s[1..].parse::<u32>().ok(),
            };
            code.filter(|&c| is_xml_char(c))
                .and_then(char::from_u32)
                .map_or_else(|| format!("&{name};"), |c| c.to_string())
        }
        _ => format!("&{name};"),
    }
}

/// Code points allowed in an XML 1.0 document.
fn is_xml_char(code: u32) -> bool {
    matches!(
        code,
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x1_0000..=0x10_FFFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(nodes: &[Node], index: usize) -> &Element {
        match &nodes[index] {
            Node::Element(el) => el,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_element() {
        let nodes = parse_fragment("<p>Hello</p>").unwrap();
        let p = element(&nodes, 0);
        assert_eq!(p.name, "p");
        assert_eq!(p.children, vec![Node::Text("Hello".to_owned())]);
    }

    #[test]
    fn test_parse_closes_unclosed_at_eof() {
        let nodes = parse_fragment("<p>Hello").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(element(&nodes, 0).children, vec![Node::Text("Hello".to_owned())]);
    }

    #[test]
    fn test_parse_closes_intermediate_elements() {
        let nodes = parse_fragment("<p><b>x</p><p>y</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        let b = element(&element(&nodes, 0).children, 0);
        assert_eq!(b.name, "b");
        assert_eq!(b.children, vec![Node::Text("x".to_owned())]);
    }

    #[test]
    fn test_parse_unmatched_end_tag() {
        let err = parse_fragment("<p>x</p></div>").unwrap_err();
        assert!(matches!(err, XmlError::UnmatchedEndTag { ref name, .. } if name == "div"));
    }

    #[test]
    fn test_parse_attributes_in_order() {
        let nodes =
            parse_fragment(r#"<ac:structured-macro ac:name="code" ac:schema-version="1" />"#)
                .unwrap();
        let el = element(&nodes, 0);
        assert_eq!(
            el.attrs,
            vec![
                ("ac:name".to_owned(), "code".to_owned()),
                ("ac:schema-version".to_owned(), "1".to_owned()),
            ]
        );
        assert!(el.children.is_empty());
    }

    #[test]
    fn test_parse_references_merge_into_text() {
        let nodes = parse_fragment("<p>a &amp; b &#169; &lt;c&gt;</p>").unwrap();
        assert_eq!(
            element(&nodes, 0).children,
            vec![Node::Text("a & b \u{a9} <c>".to_owned())]
        );
    }

    #[test]
    fn test_parse_keeps_cdata_and_comments() {
        let nodes = parse_fragment("<!-- note --><x><![CDATA[a < b]]></x>").unwrap();
        assert_eq!(nodes[0], Node::Comment(" note ".to_owned()));
        assert_eq!(
            element(&nodes, 1).children,
            vec![Node::CData("a < b".to_owned())]
        );
    }

    #[test]
    fn test_parse_drops_declaration() {
        let nodes = parse_fragment("<?xml version=\"1.0\"?><p>x</p>").unwrap();
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_parse_syntax_error() {
        assert!(matches!(
            parse_fragment("<p class=>x</p>"),
            Err(XmlError::Syntax { .. })
        ));
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(resolve_reference("quot"), "\"");
        assert_eq!(resolve_reference("#x41"), "A");
        assert_eq!(resolve_reference("#65"), "A");
        assert_eq!(resolve_reference("#xZZ"), "&#xZZ;");
    }

    #[test]
    fn test_resolve_reference_keeps_illegal_chars_literal() {
        assert_eq!(resolve_reference("#0"), "&#0;");
        assert_eq!(resolve_reference("#x1"), "&#x1;");
        assert_eq!(resolve_reference("#xFFFE"), "&#xFFFE;");
        assert_eq!(resolve_reference("#xD800"), "&#xD800;");
        assert_eq!(resolve_reference("#9"), "\t");
    }

    #[test]
    fn test_parse_void_element_without_end_tag() {
        let nodes = parse_fragment("<td>a<br>b</td>").unwrap();
        let td = element(&nodes, 0);
        assert_eq!(td.children.len(), 3);
        assert_eq!(td.children[0], Node::Text("a".to_owned()));
        assert!(element(&td.children, 1).children.is_empty());
        assert_eq!(td.children[2], Node::Text("b".to_owned()));
    }

    #[test]
    fn test_parse_void_element_with_end_tag() {
        let nodes = parse_fragment("<p>a<br></br>b<hr/></p>").unwrap();
        let p = element(&nodes, 0);
        assert_eq!(p.children.len(), 4);
        assert_eq!(element(&p.children, 1).name, "br");
        assert_eq!(p.children[2], Node::Text("b".to_owned()));
        assert_eq!(element(&p.children, 3).name, "hr");
    }
}

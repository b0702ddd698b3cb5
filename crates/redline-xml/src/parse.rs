//! XML fragment parsing
//!
//! Builds the owned tree from quick-xml events. Text is never trimmed, so
//! run content whitespace survives; whitespace-only text nodes sitting
//! between element children (pretty-printing noise) are dropped when the
//! enclosing element closes.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, XmlError};
use crate::node::{Element, XmlNode};

/// Parse an XML fragment into a sequence of root nodes
pub fn parse_fragment(xml: &str) -> Result<Vec<XmlNode>> {
    let mut reader = Reader::from_str(xml);
    // Don't trim text - preserve whitespace in runs
    reader.config_mut().trim_text(false);

    let mut roots: Vec<XmlNode> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(element_from_start(&e)?);
            }
            Event::Empty(e) => {
                let element = element_from_start(&e)?;
                attach(XmlNode::Element(element), &mut stack, &mut roots);
            }
            Event::End(_) => {
                let mut element = stack.pop().ok_or(XmlError::Unbalanced)?;
                strip_ignorable_whitespace(&mut element);
                attach(XmlNode::Element(element), &mut stack, &mut roots);
            }
            Event::Text(t) => {
                let raw = String::from_utf8_lossy(t.as_ref()).into_owned();
                let text = unescape(&raw)?.into_owned();
                if stack.is_empty() {
                    // Between roots only whitespace is meaningful-free
                    if !text.trim().is_empty() {
                        roots.push(XmlNode::Text(text));
                    }
                } else {
                    attach(XmlNode::Text(text), &mut stack, &mut roots);
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                attach(XmlNode::Text(text), &mut stack, &mut roots);
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Unbalanced);
    }
    Ok(roots)
}

/// Parse an XML fragment and return its first root element
pub fn parse_element(xml: &str) -> Result<Element> {
    parse_fragment(xml)?
        .into_iter()
        .find_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
        .ok_or(XmlError::MissingRoot)
}

fn attach(node: XmlNode, stack: &mut [Element], roots: &mut Vec<XmlNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn element_from_start(e: &BytesStart) -> Result<Element> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = unescape(&raw)?.into_owned();
        element.attrs.push((key, value));
    }
    Ok(element)
}

/// Drop whitespace-only text children of elements that have element
/// children; an element whose children are all text keeps them verbatim.
fn strip_ignorable_whitespace(element: &mut Element) {
    let has_element_children = element
        .children
        .iter()
        .any(|c| matches!(c, XmlNode::Element(_)));
    if has_element_children {
        element.children.retain(|c| match c {
            XmlNode::Text(t) => !t.trim().is_empty(),
            XmlNode::Element(_) => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::nodes_to_xml;

    #[test]
    fn test_parse_simple_run() {
        let p = parse_element(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#).unwrap();
        assert!(p.is("p"));
        let r = p.find_child("r").unwrap();
        let t = r.find_child("t").unwrap();
        assert_eq!(t.text(), "Hello");
    }

    #[test]
    fn test_parse_preserves_run_whitespace() {
        let t = parse_element(r#"<w:t xml:space="preserve">  spaced  </w:t>"#).unwrap();
        assert_eq!(t.text(), "  spaced  ");
        assert_eq!(t.attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_pretty_printed_whitespace_is_dropped() {
        let p = parse_element(
            "<w:p>\n    <w:r><w:t>a</w:t></w:r>\n    <w:r><w:t>b</w:t></w:r>\n</w:p>",
        )
        .unwrap();
        assert_eq!(p.children.len(), 2);
        assert!(p.children.iter().all(|c| matches!(c, XmlNode::Element(_))));
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let t = parse_element(r#"<w:t>1 &lt; 2 &amp; 3</w:t>"#).unwrap();
        assert_eq!(t.text(), "1 < 2 & 3");
    }

    #[test]
    fn test_roundtrip_serialization() {
        let xml = r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r></w:p>"#;
        let nodes = parse_fragment(xml).unwrap();
        assert_eq!(nodes_to_xml(&nodes), xml);
    }

    #[test]
    fn test_parse_multiple_roots() {
        let nodes = parse_fragment(r#"<w:p><w:r><w:t>a</w:t></w:r></w:p><w:p/>"#).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_unbalanced_input_is_an_error() {
        assert!(parse_fragment("<w:p><w:r></w:p>").is_err());
    }

    #[test]
    fn test_declaration_and_comments_are_skipped() {
        let nodes = parse_fragment(
            r#"<?xml version="1.0" encoding="UTF-8"?><!-- note --><w:p/>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
    }
}

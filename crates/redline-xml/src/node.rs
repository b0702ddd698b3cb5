//! Owned XML tree model
//!
//! Elements keep their qualified names verbatim ("w:r", "w:t"); matching is
//! done on the local name so documents with unusual prefixes still work.
//! Structural equality (derived `PartialEq`) is the comparison used for
//! formatting descriptors.

use quick_xml::escape::escape;

/// A node in the content tree: an element or a text node
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// An XML element with attributes and children
    Element(Element),
    /// Character data
    Text(String),
}

impl XmlNode {
    /// Borrow this node as an element, if it is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// Mutably borrow this node as an element, if it is one
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// Serialize this node back to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        match self {
            XmlNode::Element(e) => e.write_xml(out),
            XmlNode::Text(t) => out.push_str(&escape(t.as_str())),
        }
    }
}

impl From<Element> for XmlNode {
    fn from(element: Element) -> Self {
        XmlNode::Element(element)
    }
}

/// An XML element: qualified name, attributes in document order, children
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written in the source (e.g. "w:r")
    pub name: String,
    /// Attributes in document order (qualified name, unescaped value)
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl Element {
    /// Create an empty element with the given qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style child appender
    pub fn with_child(mut self, child: impl Into<XmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Local part of the qualified name ("r" for "w:r")
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Check the local name, ignoring any namespace prefix
    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute lookup by qualified name, falling back to a local-name match
    /// (so `attr("w:val")` also finds a bare `val`)
    pub fn attr(&self, name: &str) -> Option<&str> {
        if let Some((_, v)) = self.attrs.iter().find(|(k, _)| k.as_str() == name) {
            return Some(v.as_str());
        }
        let local = name.rsplit(':').next().unwrap_or(name);
        self.attrs
            .iter()
            .find(|(k, _)| k.rsplit(':').next().unwrap_or(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute by exact qualified name
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Iterate over element children
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// First element child with the given local name
    pub fn find_child(&self, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(local))
    }

    /// Concatenated text content of this element's subtree
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Serialize this element back to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    pub(crate) fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Serialize a node sequence back to XML text
pub fn nodes_to_xml(nodes: &[XmlNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.write_xml(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_prefix() {
        let e = Element::new("w:rPr");
        assert_eq!(e.local_name(), "rPr");
        assert!(e.is("rPr"));
        let bare = Element::new("rPr");
        assert_eq!(bare.local_name(), "rPr");
    }

    #[test]
    fn test_attr_fallback_to_local_name() {
        let e = Element::new("w:br").with_attr("type", "page");
        assert_eq!(e.attr("w:type"), Some("page"));

        let e = Element::new("w:br").with_attr("w:type", "page");
        assert_eq!(e.attr("w:type"), Some("page"));
        assert_eq!(e.attr("type"), Some("page"));
    }

    #[test]
    fn test_set_attr_replaces_existing() {
        let mut e = Element::new("w:ins").with_attr("w:id", "1");
        e.set_attr("w:id", "7");
        assert_eq!(e.attr("w:id"), Some("7"));
        assert_eq!(e.attrs.len(), 1);
    }

    #[test]
    fn test_serialization_escapes_content() {
        let e = Element::new("w:t")
            .with_attr("note", "a<b")
            .with_child(XmlNode::Text("1 < 2 & 3".to_string()));
        assert_eq!(e.to_xml(), r#"<w:t note="a&lt;b">1 &lt; 2 &amp; 3</w:t>"#);
    }

    #[test]
    fn test_empty_element_self_closes() {
        assert_eq!(Element::new("w:tab").to_xml(), "<w:tab/>");
    }

    #[test]
    fn test_structural_equality_of_properties() {
        let a = Element::new("w:rPr").with_child(Element::new("w:b"));
        let b = Element::new("w:rPr").with_child(Element::new("w:b"));
        let c = Element::new("w:rPr").with_child(Element::new("w:i"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

//! Paragraph segmentation
//!
//! Expands a paragraph into an ordered cell list: one atom per atomic
//! content unit (a single text character or one special construct), each
//! carrying its run's formatting descriptor and its revision-wrapper path,
//! interleaved with the paragraph's non-run children preserved in place.
//! After segmentation the matchable stream index equals the index into the
//! list of non-deleted atoms, which is what lets a regex match be sliced
//! back onto the tree at character granularity.

use redline_xml::{Element, XmlNode};

use crate::projection::{RunContent, SymbolTable};

/// Kind of a revision-tracking wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WrapperKind {
    Insertion,
    Deletion,
}

/// One revision-tracking wrapper (`w:ins` / `w:del`) observed or created
/// during a pass
#[derive(Debug, Clone)]
pub(crate) struct RevisionWrapper {
    pub kind: WrapperKind,
    pub author: String,
    pub date: Option<String>,
    pub id: Option<String>,
}

/// One atomic content unit with its formatting and wrapper context
#[derive(Debug, Clone)]
pub(crate) struct Atom {
    /// Exactly one glyph until mutation; replacement synthesis may coalesce
    /// literal text into longer `Text` atoms
    pub content: RunContent,
    /// Cloned formatting descriptor (`w:rPr`) of the originating run
    pub props: Option<Element>,
    /// Indices into [`Segmented::wrappers`], outermost first
    pub wrappers: Vec<usize>,
}

/// A paragraph child after segmentation
#[derive(Debug, Clone)]
pub(crate) enum Cell {
    Atom(Atom),
    /// Non-run content preserved positionally (paragraph properties,
    /// bookmarks, hyperlinks, drawings, ...)
    Other(XmlNode),
}

/// The segmented form of one paragraph
#[derive(Debug)]
pub(crate) struct Segmented {
    pub cells: Vec<Cell>,
    pub wrappers: Vec<RevisionWrapper>,
}

impl Segmented {
    /// True when the atom sits inside a deletion wrapper at any depth
    pub fn is_deleted(&self, atom: &Atom) -> bool {
        atom.wrappers
            .iter()
            .any(|&i| self.wrappers[i].kind == WrapperKind::Deletion)
    }

    /// Build the logical character stream and its index map. The map takes
    /// a stream character index to the cell index of the atom that
    /// produced it; deleted atoms and non-run cells do not contribute.
    pub fn stream(&self, symbols: &mut SymbolTable) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut map = Vec::new();
        for (i, cell) in self.cells.iter().enumerate() {
            if let Cell::Atom(atom) = cell {
                if self.is_deleted(atom) {
                    continue;
                }
                text.push(atom.content.glyph(symbols));
                map.push(i);
            }
        }
        (text, map)
    }

    fn push_wrapper(&mut self, element: &Element) -> usize {
        let kind = if element.is("del") {
            WrapperKind::Deletion
        } else {
            WrapperKind::Insertion
        };
        self.wrappers.push(RevisionWrapper {
            kind,
            author: element.attr("w:author").unwrap_or("").to_string(),
            date: element.attr("w:date").map(str::to_string),
            id: element.attr("w:id").map(str::to_string),
        });
        self.wrappers.len() - 1
    }
}

/// Segment one paragraph-equivalent container
pub(crate) fn segment(paragraph: &Element) -> Segmented {
    let mut seg = Segmented {
        cells: Vec::new(),
        wrappers: Vec::new(),
    };
    segment_children(&paragraph.children, &[], &mut seg);
    seg
}

fn segment_children(children: &[XmlNode], path: &[usize], seg: &mut Segmented) {
    for child in children {
        match child {
            XmlNode::Element(e) if e.is("r") => explode_run(e, path, seg),
            XmlNode::Element(e) if e.is("ins") || e.is("del") => {
                let idx = seg.push_wrapper(e);
                let mut inner = path.to_vec();
                inner.push(idx);
                segment_children(&e.children, &inner, seg);
            }
            other => seg.cells.push(Cell::Other(other.clone())),
        }
    }
}

fn explode_run(run: &Element, path: &[usize], seg: &mut Segmented) {
    let props = run.find_child("rPr").cloned();
    for child in &run.children {
        let Some(content) = RunContent::classify(child) else {
            continue;
        };
        match content {
            RunContent::Text(s) => {
                for ch in s.chars() {
                    seg.cells.push(Cell::Atom(Atom {
                        content: RunContent::Text(ch.to_string()),
                        props: props.clone(),
                        wrappers: path.to_vec(),
                    }));
                }
            }
            other => seg.cells.push(Cell::Atom(Atom {
                content: other,
                props: props.clone(),
                wrappers: path.to_vec(),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_xml::parse_element;

    #[test]
    fn test_segment_explodes_text_per_character() {
        let p = parse_element(r#"<w:p><w:r><w:t>abc</w:t></w:r></w:p>"#).unwrap();
        let seg = segment(&p);
        assert_eq!(seg.cells.len(), 3);
        let mut symbols = SymbolTable::new();
        let (stream, map) = seg.stream(&mut symbols);
        assert_eq!(stream, "abc");
        assert_eq!(map, vec![0, 1, 2]);
    }

    #[test]
    fn test_segment_inherits_formatting_per_atom() {
        let p = parse_element(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>ab</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        for cell in &seg.cells {
            let Cell::Atom(atom) = cell else {
                panic!("expected atom");
            };
            let props = atom.props.as_ref().unwrap();
            assert!(props.find_child("b").is_some());
        }
    }

    #[test]
    fn test_segment_preserves_non_run_children_positionally() {
        let p = parse_element(
            r#"<w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:bookmarkStart w:id="0" w:name="x"/><w:r><w:t>a</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        assert_eq!(seg.cells.len(), 3);
        assert!(matches!(seg.cells[0], Cell::Other(_)));
        assert!(matches!(seg.cells[1], Cell::Other(_)));
        assert!(matches!(seg.cells[2], Cell::Atom(_)));
    }

    #[test]
    fn test_empty_run_disappears() {
        let p = parse_element(r#"<w:p><w:r><w:rPr><w:b/></w:rPr></w:r></w:p>"#).unwrap();
        let seg = segment(&p);
        assert!(seg.cells.is_empty());
    }

    #[test]
    fn test_deleted_runs_are_segmented_but_not_matchable() {
        let p = parse_element(
            r#"<w:p><w:r><w:t>ab</w:t></w:r><w:del w:id="3" w:author="A"><w:r><w:delText>x</w:delText></w:r></w:del><w:r><w:t>cd</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        // Deleted atom is present in the cell list
        assert_eq!(seg.cells.len(), 5);
        let mut symbols = SymbolTable::new();
        let (stream, map) = seg.stream(&mut symbols);
        // "abcd" is contiguous in the stream; the deleted cell (index 2) is skipped
        assert_eq!(stream, "abcd");
        assert_eq!(map, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_insertion_wrapper_content_stays_matchable() {
        let p = parse_element(
            r#"<w:p><w:ins w:id="1" w:author="X" w:date="2024-01-01T00:00:00Z"><w:r><w:t>hi</w:t></w:r></w:ins></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        assert_eq!(seg.wrappers.len(), 1);
        assert_eq!(seg.wrappers[0].author, "X");
        assert_eq!(seg.wrappers[0].id.as_deref(), Some("1"));
        let mut symbols = SymbolTable::new();
        let (stream, _) = seg.stream(&mut symbols);
        assert_eq!(stream, "hi");
        let Cell::Atom(atom) = &seg.cells[0] else {
            panic!("expected atom");
        };
        assert_eq!(atom.wrappers, vec![0]);
    }

    #[test]
    fn test_nested_deletion_inside_insertion() {
        let p = parse_element(
            r#"<w:p><w:ins w:id="1" w:author="X"><w:del w:id="2" w:author="Y"><w:r><w:delText>z</w:delText></w:r></w:del></w:ins></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        let Cell::Atom(atom) = &seg.cells[0] else {
            panic!("expected atom");
        };
        assert_eq!(atom.wrappers.len(), 2);
        assert!(seg.is_deleted(atom));
        let mut symbols = SymbolTable::new();
        let (stream, _) = seg.stream(&mut symbols);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_special_constructs_are_single_atoms() {
        let p = parse_element(
            r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:br/><w:t>b</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let seg = segment(&p);
        assert_eq!(seg.cells.len(), 4);
        let mut symbols = SymbolTable::new();
        let (stream, _) = seg.stream(&mut symbols);
        assert_eq!(stream, "a\t\rb");
    }
}

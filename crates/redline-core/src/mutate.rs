//! Mutation of the segmented paragraph
//!
//! Two variants: direct replacement (remove covered atoms, synthesize new
//! ones at the first covered position) and tracked replacement (wrap the
//! removed content in deletion wrappers and the new content in an insertion
//! wrapper, honoring pre-existing insertion wrappers). Both operate on the
//! cell list; [`rebuild`] turns the result back into paragraph children and
//! [`coalesce`] merges adjacent text runs with identical formatting.

use std::collections::{BTreeMap, HashMap};

use redline_xml::{Element, XmlNode};

use crate::matcher::MatchSpan;
use crate::projection::{
    RunContent, SymbolTable, LINE_BREAK, NO_BREAK_HYPHEN, PAGE_BREAK, SOFT_HYPHEN, TAB,
};
use crate::segment::{Atom, Cell, RevisionWrapper, Segmented, WrapperKind};

/// Apply accepted matches by direct mutation. `map` is the stream-to-cell
/// index map produced alongside the stream the matches were found in.
pub(crate) fn apply_direct(
    seg: &mut Segmented,
    matches: &[MatchSpan],
    map: &[usize],
    symbols: &SymbolTable,
) {
    let mut covered = vec![false; seg.cells.len()];
    let mut replace_at: HashMap<usize, &MatchSpan> = HashMap::new();
    for m in matches {
        let cells = &map[m.start..m.start + m.len];
        for &ci in cells {
            covered[ci] = true;
        }
        replace_at.insert(cells[0], m);
    }

    let old = std::mem::take(&mut seg.cells);
    let mut out = Vec::with_capacity(old.len());
    for (i, cell) in old.into_iter().enumerate() {
        if let Some(m) = replace_at.get(&i) {
            // This cell is the first covered atom: it donates formatting and
            // position to the synthesized replacement, then vanishes.
            let (props, wrappers) = match &cell {
                Cell::Atom(a) => (a.props.clone(), a.wrappers.clone()),
                Cell::Other(_) => (None, Vec::new()),
            };
            let text = m.replacement.as_deref().unwrap_or("");
            out.extend(
                synthesize_atoms(text, &props, &wrappers, symbols)
                    .into_iter()
                    .map(Cell::Atom),
            );
            continue;
        }
        if covered[i] {
            // Covered atoms are consumed by the match; anything else inside
            // the range (deleted runs, bookmarks) is preserved in place.
            match cell {
                Cell::Atom(_) => continue,
                Cell::Other(_) => out.push(cell),
            }
            continue;
        }
        out.push(cell);
    }
    seg.cells = out;
}

/// Apply accepted matches as tracked revisions by `author`
pub(crate) fn apply_tracked(
    seg: &mut Segmented,
    matches: &[MatchSpan],
    map: &[usize],
    author: &str,
    date: Option<&str>,
    symbols: &SymbolTable,
) {
    // Wrappers present before this call; only those count as pre-existing
    // when deciding insertion positions and same-author cancellation.
    let preexisting = seg.wrappers.len();

    let mut inserts: BTreeMap<usize, Vec<Atom>> = BTreeMap::new();
    let mut drops = vec![false; seg.cells.len()];
    let mut rewires: Vec<(usize, Vec<usize>)> = Vec::new();

    for m in matches {
        let cells = &map[m.start..m.start + m.len];
        let donor_props = match &seg.cells[cells[0]] {
            Cell::Atom(a) => a.props.clone(),
            Cell::Other(_) => None,
        };

        if let Some(replacement) = m.replacement.as_deref() {
            if !replacement.is_empty() {
                let ins_idx = push_wrapper(seg, WrapperKind::Insertion, author, date);
                let atoms = synthesize_atoms(replacement, &donor_props, &[ins_idx], symbols);
                let pos = insertion_position(seg, cells[0], preexisting);
                inserts.entry(pos).or_default().extend(atoms);
            }
        }

        let mut plain_del: Option<usize> = None;
        let mut nested_del: HashMap<usize, usize> = HashMap::new();
        for &ci in cells {
            let outer = match &seg.cells[ci] {
                Cell::Atom(a) => a.wrappers.first().copied(),
                Cell::Other(_) => continue,
            };
            match outer {
                None => {
                    let del_idx = *plain_del.get_or_insert_with(|| {
                        push_wrapper_idx(&mut seg.wrappers, WrapperKind::Deletion, author, date)
                    });
                    rewires.push((ci, vec![del_idx]));
                }
                Some(w) if seg.wrappers[w].kind == WrapperKind::Insertion
                    && seg.wrappers[w].author == author =>
                {
                    // Insert-then-delete by the same author cancels out
                    drops[ci] = true;
                }
                Some(w) if seg.wrappers[w].kind == WrapperKind::Insertion => {
                    // Foreign insertion: record the deletion inside it
                    let del_idx = *nested_del.entry(w).or_insert_with(|| {
                        push_wrapper_idx(&mut seg.wrappers, WrapperKind::Deletion, author, date)
                    });
                    rewires.push((ci, vec![w, del_idx]));
                }
                // Deleted content never reaches the matchable stream
                Some(_) => {}
            }
        }
    }

    for (ci, path) in rewires {
        if let Cell::Atom(atom) = &mut seg.cells[ci] {
            atom.wrappers = path;
        }
    }

    let old = std::mem::take(&mut seg.cells);
    let mut out = Vec::with_capacity(old.len());
    for (i, cell) in old.into_iter().enumerate() {
        if let Some(atoms) = inserts.remove(&i) {
            out.extend(atoms.into_iter().map(Cell::Atom));
        }
        if drops[i] {
            continue;
        }
        out.push(cell);
    }
    for (_, atoms) in inserts {
        out.extend(atoms.into_iter().map(Cell::Atom));
    }
    seg.cells = out;
}

/// Cell position a new insertion wrapper should be emitted at: immediately
/// before the first covered atom, or before the whole pre-existing
/// insertion group it belongs to so the group is not split in two.
fn insertion_position(seg: &Segmented, first_covered: usize, preexisting: usize) -> usize {
    let Cell::Atom(first) = &seg.cells[first_covered] else {
        return first_covered;
    };
    let Some(&outer) = first.wrappers.first() else {
        return first_covered;
    };
    if outer >= preexisting || seg.wrappers[outer].kind != WrapperKind::Insertion {
        return first_covered;
    }
    let mut pos = first_covered;
    while pos > 0 {
        match &seg.cells[pos - 1] {
            Cell::Atom(prev) if prev.wrappers.first() == Some(&outer) => pos -= 1,
            _ => break,
        }
    }
    pos
}

fn push_wrapper(seg: &mut Segmented, kind: WrapperKind, author: &str, date: Option<&str>) -> usize {
    push_wrapper_idx(&mut seg.wrappers, kind, author, date)
}

fn push_wrapper_idx(
    wrappers: &mut Vec<RevisionWrapper>,
    kind: WrapperKind,
    author: &str,
    date: Option<&str>,
) -> usize {
    wrappers.push(RevisionWrapper {
        kind,
        author: author.to_string(),
        date: date.map(str::to_string),
        id: None,
    });
    wrappers.len() - 1
}

/// Reverse projection: turn a replacement string back into atoms.
/// Consecutive literal characters coalesce into one text atom; sentinel
/// characters become their constructs again; newline-separated lines get an
/// explicit line break between them.
pub(crate) fn synthesize_atoms(
    text: &str,
    props: &Option<Element>,
    wrappers: &[usize],
    symbols: &SymbolTable,
) -> Vec<Atom> {
    let make = |content: RunContent| Atom {
        content,
        props: props.clone(),
        wrappers: wrappers.to_vec(),
    };

    let mut atoms = Vec::new();
    for (line_no, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line_no > 0 {
            atoms.push(make(RunContent::LineBreak));
        }
        let mut literal = String::new();
        for ch in line.chars() {
            let special = match ch {
                TAB => Some(RunContent::Tab),
                PAGE_BREAK => Some(RunContent::PageBreak),
                LINE_BREAK => Some(RunContent::LineBreak),
                NO_BREAK_HYPHEN => Some(RunContent::NoBreakHyphen),
                SOFT_HYPHEN => Some(RunContent::SoftHyphen),
                _ => symbols.symbol_for(ch).map(|(font, code)| RunContent::Symbol {
                    font: font.to_string(),
                    code,
                }),
            };
            match special {
                Some(content) => {
                    if !literal.is_empty() {
                        atoms.push(make(RunContent::Text(std::mem::take(&mut literal))));
                    }
                    atoms.push(make(content));
                }
                None => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            atoms.push(make(RunContent::Text(literal)));
        }
    }
    atoms
}

/// Merge adjacent text atoms sharing the same formatting descriptor and
/// wrapper context
pub(crate) fn coalesce(seg: &mut Segmented) {
    let old = std::mem::take(&mut seg.cells);
    let mut out: Vec<Cell> = Vec::with_capacity(old.len());
    for cell in old {
        let mut merged = false;
        if let (Some(Cell::Atom(prev)), Cell::Atom(next)) = (out.last_mut(), &cell) {
            if prev.wrappers == next.wrappers && prev.props == next.props {
                if let (RunContent::Text(acc), RunContent::Text(add)) =
                    (&mut prev.content, &next.content)
                {
                    acc.push_str(add);
                    merged = true;
                }
            }
        }
        if !merged {
            out.push(cell);
        }
    }
    seg.cells = out;
}

/// Rebuild paragraph children from the cell list, regrouping consecutive
/// atoms that share a wrapper back into a single `w:ins`/`w:del` element
pub(crate) fn rebuild(seg: &Segmented) -> Vec<XmlNode> {
    build_level(&seg.cells, 0, false, seg)
}

fn build_level(cells: &[Cell], depth: usize, deleted: bool, seg: &Segmented) -> Vec<XmlNode> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < cells.len() {
        match &cells[i] {
            Cell::Other(node) => {
                out.push(node.clone());
                i += 1;
            }
            Cell::Atom(atom) => match atom.wrappers.get(depth).copied() {
                None => {
                    out.push(atom_to_node(atom, deleted));
                    i += 1;
                }
                Some(w) => {
                    let mut j = i + 1;
                    while j < cells.len() {
                        match &cells[j] {
                            Cell::Atom(a) if a.wrappers.get(depth) == Some(&w) => j += 1,
                            _ => break,
                        }
                    }
                    let info = &seg.wrappers[w];
                    let inner_deleted = deleted || info.kind == WrapperKind::Deletion;
                    let children = build_level(&cells[i..j], depth + 1, inner_deleted, seg);
                    let mut wrapper = Element::new(match info.kind {
                        WrapperKind::Insertion => "w:ins",
                        WrapperKind::Deletion => "w:del",
                    });
                    if let Some(id) = &info.id {
                        wrapper.set_attr("w:id", id.clone());
                    }
                    wrapper.set_attr("w:author", info.author.clone());
                    if let Some(date) = &info.date {
                        wrapper.set_attr("w:date", date.clone());
                    }
                    wrapper.children = children;
                    out.push(XmlNode::Element(wrapper));
                    i = j;
                }
            },
        }
    }
    out
}

fn atom_to_node(atom: &Atom, deleted: bool) -> XmlNode {
    let mut run = Element::new("w:r");
    if let Some(props) = &atom.props {
        run.children.push(XmlNode::Element(props.clone()));
    }
    run.children.push(content_node(&atom.content, deleted));
    XmlNode::Element(run)
}

fn content_node(content: &RunContent, deleted: bool) -> XmlNode {
    match content {
        RunContent::Text(s) => {
            let name = if deleted { "w:delText" } else { "w:t" };
            let mut el = Element::new(name);
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                el.set_attr("xml:space", "preserve");
            }
            el.children.push(XmlNode::Text(s.clone()));
            XmlNode::Element(el)
        }
        RunContent::LineBreak => Element::new("w:br").into(),
        RunContent::PageBreak => Element::new("w:br").with_attr("w:type", "page").into(),
        RunContent::Tab => Element::new("w:tab").into(),
        RunContent::NoBreakHyphen => Element::new("w:noBreakHyphen").into(),
        RunContent::SoftHyphen => Element::new("w:softHyphen").into(),
        RunContent::FieldBegin => Element::new("w:fldChar")
            .with_attr("w:fldCharType", "begin")
            .into(),
        RunContent::FieldSeparate => Element::new("w:fldChar")
            .with_attr("w:fldCharType", "separate")
            .into(),
        RunContent::FieldEnd => Element::new("w:fldChar")
            .with_attr("w:fldCharType", "end")
            .into(),
        RunContent::InstrText(s) => Element::new("w:instrText")
            .with_attr("xml:space", "preserve")
            .with_child(XmlNode::Text(s.clone()))
            .into(),
        RunContent::Symbol { font, code } => Element::new("w:sym")
            .with_attr("w:font", font.clone())
            .with_attr("w:char", format!("{code:04X}"))
            .into(),
        RunContent::Opaque(node) => node.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;
    use redline_xml::{nodes_to_xml, parse_element};

    fn synthesized_xml(text: &str) -> String {
        let symbols = SymbolTable::new();
        let atoms = synthesize_atoms(text, &None, &[], &symbols);
        let seg = Segmented {
            cells: atoms.into_iter().map(Cell::Atom).collect(),
            wrappers: Vec::new(),
        };
        nodes_to_xml(&rebuild(&seg))
    }

    #[test]
    fn test_synthesize_coalesces_literal_text() {
        let symbols = SymbolTable::new();
        let atoms = synthesize_atoms("hello", &None, &[], &symbols);
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].content, RunContent::Text("hello".to_string()));
    }

    #[test]
    fn test_synthesize_maps_sentinels_back() {
        let symbols = SymbolTable::new();
        let atoms = synthesize_atoms("a\tb", &None, &[], &symbols);
        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[1].content, RunContent::Tab);
    }

    #[test]
    fn test_synthesize_multiline_emits_breaks_between_lines() {
        assert_eq!(
            synthesized_xml("one\ntwo"),
            "<w:r><w:t>one</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>two</w:t></w:r>"
        );
    }

    #[test]
    fn test_synthesize_crlf_lines() {
        let symbols = SymbolTable::new();
        let atoms = synthesize_atoms("one\r\ntwo", &None, &[], &symbols);
        let texts: Vec<_> = atoms.iter().map(|a| a.content.clone()).collect();
        assert_eq!(
            texts,
            vec![
                RunContent::Text("one".to_string()),
                RunContent::LineBreak,
                RunContent::Text("two".to_string()),
            ]
        );
    }

    #[test]
    fn test_synthesize_symbol_roundtrip() {
        let mut symbols = SymbolTable::new();
        let c = symbols.char_for("Wingdings", 0xF0E0);
        let atoms = synthesize_atoms(&c.to_string(), &None, &[], &symbols);
        assert_eq!(
            atoms[0].content,
            RunContent::Symbol {
                font: "Wingdings".to_string(),
                code: 0xF0E0,
            }
        );
    }

    #[test]
    fn test_rebuild_marks_whitespace_sensitive_text() {
        assert_eq!(
            synthesized_xml("padded "),
            r#"<w:r><w:t xml:space="preserve">padded </w:t></w:r>"#
        );
    }

    #[test]
    fn test_coalesce_merges_only_matching_neighbors() {
        let p = parse_element(
            r#"<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:t>cd</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>EF</w:t></w:r></w:p>"#,
        )
        .unwrap();
        let mut seg = segment(&p);
        coalesce(&mut seg);
        // "abcd" merges; the bold run stays separate
        assert_eq!(seg.cells.len(), 2);
        let Cell::Atom(first) = &seg.cells[0] else {
            panic!("expected atom");
        };
        assert_eq!(first.content, RunContent::Text("abcd".to_string()));
    }

    #[test]
    fn test_rebuild_restores_deletion_wrapper() {
        let p = parse_element(
            r#"<w:p><w:del w:id="5" w:author="A" w:date="2024-01-01T00:00:00Z"><w:r><w:delText>old</w:delText></w:r></w:del></w:p>"#,
        )
        .unwrap();
        let mut seg = segment(&p);
        coalesce(&mut seg);
        let xml = nodes_to_xml(&rebuild(&seg));
        assert_eq!(
            xml,
            r#"<w:del w:id="5" w:author="A" w:date="2024-01-01T00:00:00Z"><w:r><w:delText>old</w:delText></w:r></w:del>"#
        );
    }

    #[test]
    fn test_rebuild_keeps_adjacent_wrappers_separate() {
        let p = parse_element(
            r#"<w:p><w:ins w:id="1" w:author="X"><w:r><w:t>a</w:t></w:r></w:ins><w:ins w:id="2" w:author="Y"><w:r><w:t>b</w:t></w:r></w:ins></w:p>"#,
        )
        .unwrap();
        let mut seg = segment(&p);
        coalesce(&mut seg);
        let nodes = rebuild(&seg);
        assert_eq!(nodes.len(), 2);
    }
}

//! Revision identifier management
//!
//! `w:ins` and `w:del` are the id-bearing revision kinds this engine
//! creates. After a tracked pass every such element must carry a unique
//! `w:id`: elements without one get the next unused integer, and among
//! duplicates every occurrence after the first is renumbered. The scan is
//! a single pre-order walk of the whole subtree, so ids are unique
//! document-wide when the caller passes the document roots.

use std::collections::HashSet;

use redline_xml::{Element, XmlNode};

fn is_revision_element(e: &Element) -> bool {
    e.is("ins") || e.is("del")
}

/// Assign missing revision ids and renumber duplicates, in document order
pub fn assign_revision_ids(nodes: &mut [XmlNode]) {
    let mut ids: Vec<Option<u32>> = Vec::new();
    walk(nodes, &mut |e| {
        if is_revision_element(e) {
            ids.push(e.attr("w:id").and_then(|v| v.parse().ok()));
        }
    });

    let max_id = ids.iter().flatten().copied().max().unwrap_or(0);
    let mut next = max_id + 1;
    let mut seen: HashSet<u32> = HashSet::new();
    let assigned: Vec<Option<u32>> = ids
        .iter()
        .map(|id| match id {
            Some(v) if seen.insert(*v) => None,
            _ => {
                let fresh = next;
                next += 1;
                Some(fresh)
            }
        })
        .collect();

    let mut index = 0;
    walk_mut(nodes, &mut |e| {
        if is_revision_element(e) {
            if let Some(Some(fresh)) = assigned.get(index) {
                e.set_attr("w:id", fresh.to_string());
            }
            index += 1;
        }
    });
}

fn walk(nodes: &[XmlNode], f: &mut impl FnMut(&Element)) {
    for node in nodes {
        if let XmlNode::Element(e) = node {
            f(e);
            walk(&e.children, f);
        }
    }
}

fn walk_mut(nodes: &mut [XmlNode], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let XmlNode::Element(e) = node {
            f(e);
            walk_mut(&mut e.children, f);
        }
    }
}

//! Text projection
//!
//! Maps run content onto the logical character stream a regex operates
//! over. Each recognized construct projects to exactly one character; text
//! projects verbatim. Constructs a regex should never match into project to
//! a reserved placeholder. Symbols (`w:sym`) project into the private use
//! area through a caller-owned [`SymbolTable`] so the assignment stays
//! stable within a session and can be reversed when synthesizing
//! replacement text.

use std::collections::HashMap;

use redline_xml::{Element, XmlNode};

/// Placeholder for constructs that are opaque to matching
pub const OPAQUE: char = '\u{FFFC}';
/// Projection of a line or text-wrapping break
pub const LINE_BREAK: char = '\r';
/// Projection of a page break
pub const PAGE_BREAK: char = '\u{000C}';
/// Projection of a horizontal tab
pub const TAB: char = '\t';
/// Projection of a non-breaking hyphen
pub const NO_BREAK_HYPHEN: char = '\u{2011}';
/// Projection of a soft hyphen
pub const SOFT_HYPHEN: char = '\u{00AD}';
/// Projection of a field-boundary begin mark
pub const FIELD_BEGIN: char = '{';
/// Projection of a field-boundary end mark
pub const FIELD_END: char = '}';

const PUA_FIRST: u32 = 0xE000;
const PUA_LAST: u32 = 0xF8FF;

/// Classified content of a single run child
#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    /// Literal text (`w:t` or `w:delText`)
    Text(String),
    /// Line or text-wrapping break (`w:br`, `w:cr`)
    LineBreak,
    /// Page break (`w:br w:type="page"`)
    PageBreak,
    /// Horizontal tab (`w:tab`)
    Tab,
    /// Non-breaking hyphen (`w:noBreakHyphen`)
    NoBreakHyphen,
    /// Soft hyphen (`w:softHyphen`)
    SoftHyphen,
    /// Field-boundary begin mark (`w:fldChar w:fldCharType="begin"`)
    FieldBegin,
    /// Field-boundary separator mark
    FieldSeparate,
    /// Field-boundary end mark
    FieldEnd,
    /// Field instruction text (`w:instrText`), opaque to matching
    InstrText(String),
    /// Symbol reference (`w:sym`)
    Symbol { font: String, code: u32 },
    /// Anything unrecognized; the original node is retained so rewrites
    /// never drop it
    Opaque(XmlNode),
}

impl RunContent {
    /// Classify one run child. Returns `None` for the formatting descriptor
    /// (`w:rPr`) and for ignorable whitespace, which are not content.
    pub fn classify(node: &XmlNode) -> Option<RunContent> {
        let e = match node {
            XmlNode::Text(t) if t.trim().is_empty() => return None,
            XmlNode::Text(_) => return Some(RunContent::Opaque(node.clone())),
            XmlNode::Element(e) => e,
        };
        match e.local_name() {
            "rPr" => None,
            "t" | "delText" => Some(RunContent::Text(e.text())),
            "br" => match e.attr("w:type") {
                Some("page") | Some("column") => Some(RunContent::PageBreak),
                _ => Some(RunContent::LineBreak),
            },
            "cr" => Some(RunContent::LineBreak),
            "tab" => Some(RunContent::Tab),
            "noBreakHyphen" => Some(RunContent::NoBreakHyphen),
            "softHyphen" => Some(RunContent::SoftHyphen),
            "fldChar" => match e.attr("w:fldCharType") {
                Some("begin") => Some(RunContent::FieldBegin),
                Some("end") => Some(RunContent::FieldEnd),
                _ => Some(RunContent::FieldSeparate),
            },
            "instrText" => Some(RunContent::InstrText(e.text())),
            "sym" => {
                let font = e.attr("w:font").unwrap_or("").to_string();
                let code = e
                    .attr("w:char")
                    .and_then(|v| u32::from_str_radix(v, 16).ok())
                    .unwrap_or(0);
                Some(RunContent::Symbol { font, code })
            }
            _ => Some(RunContent::Opaque(node.clone())),
        }
    }

    /// Single-character projection. For `Text` this is the first character;
    /// segmented atoms hold exactly one.
    pub fn glyph(&self, symbols: &mut SymbolTable) -> char {
        match self {
            RunContent::Text(s) => s.chars().next().unwrap_or(OPAQUE),
            RunContent::LineBreak => LINE_BREAK,
            RunContent::PageBreak => PAGE_BREAK,
            RunContent::Tab => TAB,
            RunContent::NoBreakHyphen => NO_BREAK_HYPHEN,
            RunContent::SoftHyphen => SOFT_HYPHEN,
            RunContent::FieldBegin => FIELD_BEGIN,
            RunContent::FieldEnd => FIELD_END,
            RunContent::Symbol { font, code } => symbols.char_for(font, *code),
            RunContent::FieldSeparate | RunContent::InstrText(_) | RunContent::Opaque(_) => OPAQUE,
        }
    }

    /// Append this content's projection to `out`
    pub fn project_into(&self, out: &mut String, symbols: &mut SymbolTable) {
        match self {
            RunContent::Text(s) => out.push_str(s),
            other => out.push(other.glyph(symbols)),
        }
    }
}

/// Session-stable symbol-to-character mapping.
///
/// Owned by the caller and threaded through every call so independent runs
/// stay testable; the table only grows.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    by_symbol: HashMap<(String, u32), char>,
    by_char: HashMap<char, (String, u32)>,
    next_free: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        SymbolTable {
            by_symbol: HashMap::new(),
            by_char: HashMap::new(),
            next_free: PUA_FIRST,
        }
    }

    /// Private-use character for a (font, code) pair. The preferred slot is
    /// `U+E000 + (code & 0x0FFF)`; on collision with a different pair the
    /// next free private-use slot is taken instead.
    pub fn char_for(&mut self, font: &str, code: u32) -> char {
        let key = (font.to_string(), code);
        if let Some(&c) = self.by_symbol.get(&key) {
            return c;
        }
        let preferred = char::from_u32(PUA_FIRST + (code & 0x0FFF)).unwrap_or(OPAQUE);
        let slot = if !self.by_char.contains_key(&preferred) {
            Some(preferred)
        } else {
            self.next_free_slot()
        };
        let Some(slot) = slot else {
            // Private use area exhausted; the symbol stays unmatchable
            return OPAQUE;
        };
        self.by_symbol.insert(key.clone(), slot);
        self.by_char.insert(slot, key);
        slot
    }

    /// Reverse lookup: the (font, code) pair a private-use character stands for
    pub fn symbol_for(&self, c: char) -> Option<(&str, u32)> {
        self.by_char
            .get(&c)
            .map(|(font, code)| (font.as_str(), *code))
    }

    /// Number of assigned symbol slots
    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    /// True when no symbols have been assigned
    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }

    fn next_free_slot(&mut self) -> Option<char> {
        while self.next_free <= PUA_LAST {
            let candidate = char::from_u32(self.next_free);
            self.next_free += 1;
            if let Some(c) = candidate {
                if !self.by_char.contains_key(&c) {
                    return Some(c);
                }
            }
        }
        None
    }
}

/// Projection of a paragraph's matchable content: every run child projected
/// in document order, descending through insertion wrappers and skipping
/// deleted content. Used as the fast-reject pre-test and handy for callers
/// that only want the text.
pub fn matchable_text(paragraph: &Element, symbols: &mut SymbolTable) -> String {
    let mut out = String::new();
    gather(&paragraph.children, &mut out, symbols);
    out
}

fn gather(children: &[XmlNode], out: &mut String, symbols: &mut SymbolTable) {
    for node in children {
        let Some(e) = node.as_element() else { continue };
        if e.is("del") {
            continue;
        }
        if e.is("r") {
            for child in &e.children {
                if let Some(content) = RunContent::classify(child) {
                    content.project_into(out, symbols);
                }
            }
        } else if e.is("ins") {
            gather(&e.children, out, symbols);
        }
    }
}

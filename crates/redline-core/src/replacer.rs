//! The public search/replace surface
//!
//! [`TextReplacer`] drives one pass over a sequence of content roots: for
//! every paragraph whose bulk text survives a cheap regex pre-test, the
//! paragraph is segmented, matched, and rewritten either directly or as
//! tracked revisions. A caller-supplied predicate can approve or veto each
//! match, and doubles as an inspection side channel in match-only mode.

use regex::Regex;
use redline_xml::{Element, XmlNode};

use crate::error::{ReplaceError, Result};
use crate::matcher::{find_matches, MatchSpan};
use crate::mutate::{apply_direct, apply_tracked, coalesce, rebuild};
use crate::projection::{matchable_text, SymbolTable};
use crate::revisions::assign_revision_ids;
use crate::segment::segment;

/// The kind of document part the content roots belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Main document body
    MainDocument,
    /// Header part
    Header,
    /// Footer part
    Footer,
    /// Footnotes part
    Footnotes,
    /// Endnotes part
    Endnotes,
    /// Comments part
    Comments,
    /// Presentation slide content (DrawingML)
    SlideContent,
}

impl PartKind {
    /// Whether this part kind supports tracked revisions. Presentation
    /// content never does.
    pub fn supports_tracked_revisions(self) -> bool {
        !matches!(self, PartKind::SlideContent)
    }
}

/// A match handed to the caller's predicate
#[derive(Debug, Clone)]
pub struct MatchInfo {
    /// Zero-based index of the match within its paragraph
    pub index: usize,
    /// Start offset in logical characters
    pub start: usize,
    /// Length in logical characters
    pub len: usize,
    /// The matched text
    pub text: String,
}

/// Caller-supplied approval/inspection callback. Returning `Ok(false)`
/// skips the match; errors propagate unmodified.
pub type MatchPredicate<'a> = dyn FnMut(&Element, &MatchInfo) -> Result<bool> + 'a;

/// Regex-driven structural search and replace over run-oriented markup
///
/// # Example
///
/// ```
/// use redline_core::{PartKind, SymbolTable, TextReplacer};
/// use redline_xml::parse_fragment;
/// use regex::Regex;
///
/// let mut nodes = parse_fragment(r#"<w:p><w:r><w:t>Hello World</w:t></w:r></w:p>"#)?;
/// let regex = Regex::new(r"World").unwrap();
/// let mut symbols = SymbolTable::new();
///
/// let count = TextReplacer::new(&regex)
///     .replacement("Rust")
///     .apply(PartKind::MainDocument, &mut nodes, &mut symbols, None)?;
/// assert_eq!(count, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct TextReplacer<'a> {
    regex: &'a Regex,
    replacement: Option<String>,
    author: Option<String>,
    date: Option<String>,
    coalesce: bool,
}

impl<'a> TextReplacer<'a> {
    /// Create a match-only replacer for a compiled regex
    pub fn new(regex: &'a Regex) -> Self {
        TextReplacer {
            regex,
            replacement: None,
            author: None,
            date: None,
            coalesce: true,
        }
    }

    /// Set the replacement template (`$1`-style back-references are
    /// expanded per match). Without a template the pass is match-only.
    pub fn replacement(mut self, template: impl Into<String>) -> Self {
        self.replacement = Some(template.into());
        self
    }

    /// Record changes as tracked revisions attributed to `author` instead
    /// of mutating directly
    pub fn track_revisions(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Timestamp written onto new revision wrappers (`w:date`)
    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Whether to merge adjacent identically formatted text runs after
    /// rewriting (default true). Callers planning further structural
    /// passes may prefer the segmented output.
    pub fn coalesce(mut self, enabled: bool) -> Self {
        self.coalesce = enabled;
        self
    }

    /// Run one pass over the content roots of a document part, mutating
    /// them in place. Returns the number of matches found (match-only) or
    /// processed (replace).
    pub fn apply(
        &self,
        kind: PartKind,
        nodes: &mut [XmlNode],
        symbols: &mut SymbolTable,
        mut predicate: Option<&mut MatchPredicate<'_>>,
    ) -> Result<usize> {
        let tracking = match &self.author {
            Some(author) if author.is_empty() => return Err(ReplaceError::MissingAuthor),
            Some(author) => {
                if !kind.supports_tracked_revisions() {
                    return Err(ReplaceError::TrackedRevisionsUnsupported { kind });
                }
                Some(author.as_str())
            }
            None => None,
        };

        let mut count = 0;
        let mut mutated = false;
        self.walk(nodes, tracking, symbols, &mut predicate, &mut count, &mut mutated)?;

        if tracking.is_some() && mutated {
            assign_revision_ids(nodes);
        }
        Ok(count)
    }

    fn walk(
        &self,
        nodes: &mut [XmlNode],
        tracking: Option<&str>,
        symbols: &mut SymbolTable,
        predicate: &mut Option<&mut MatchPredicate<'_>>,
        count: &mut usize,
        mutated: &mut bool,
    ) -> Result<()> {
        for node in nodes {
            if let XmlNode::Element(e) = node {
                if e.is("p") {
                    self.process_paragraph(e, tracking, symbols, predicate, count, mutated)?;
                }
                self.walk(&mut e.children, tracking, symbols, predicate, count, mutated)?;
            }
        }
        Ok(())
    }

    fn process_paragraph(
        &self,
        paragraph: &mut Element,
        tracking: Option<&str>,
        symbols: &mut SymbolTable,
        predicate: &mut Option<&mut MatchPredicate<'_>>,
        count: &mut usize,
        mutated: &mut bool,
    ) -> Result<()> {
        // Fast reject before paying for segmentation
        let bulk = matchable_text(paragraph, symbols);
        if !self.regex.is_match(&bulk) {
            return Ok(());
        }

        let mut seg = segment(paragraph);
        let (stream, map) = seg.stream(symbols);
        let spans = find_matches(self.regex, &stream, self.replacement.as_deref());
        if spans.is_empty() {
            return Ok(());
        }

        let mut accepted: Vec<MatchSpan> = Vec::new();
        for (index, span) in spans.iter().enumerate() {
            let info = MatchInfo {
                index,
                start: span.start,
                len: span.len,
                text: span.text.clone(),
            };

            if self.replacement.is_none() {
                // Match-only: the predicate is an inspection side channel;
                // a veto drops the match from the count
                let approved = match predicate {
                    Some(p) => p(paragraph, &info)?,
                    None => true,
                };
                if approved {
                    *count += 1;
                }
                continue;
            }

            if span.len == 0 {
                // Legal for counting, but covers no runs
                *count += 1;
                continue;
            }
            let approved = match predicate {
                Some(p) => p(paragraph, &info)?,
                None => true,
            };
            if !approved {
                continue;
            }
            if span.start + span.len > map.len() {
                return Err(ReplaceError::MatchOutOfBounds {
                    start: span.start,
                    end: span.start + span.len,
                    runs: map.len(),
                });
            }
            *count += 1;
            accepted.push(span.clone());
        }

        if accepted.is_empty() {
            return Ok(());
        }

        match tracking {
            None => apply_direct(&mut seg, &accepted, &map, symbols),
            Some(author) => {
                apply_tracked(&mut seg, &accepted, &map, author, self.date.as_deref(), symbols)
            }
        }
        if self.coalesce {
            coalesce(&mut seg);
        }
        paragraph.children = rebuild(&seg);
        *mutated = true;
        Ok(())
    }
}

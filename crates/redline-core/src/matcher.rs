//! Regex matching over the logical character stream
//!
//! Matches are reported in logical character coordinates so they can be
//! sliced directly onto the segmented run list. Replacement templates are
//! expanded per match (`$1`, `${name}` back-references) while the captures
//! are in scope.

use regex::Regex;

/// One match over the logical character stream
#[derive(Debug, Clone)]
pub(crate) struct MatchSpan {
    /// Start, in logical characters
    pub start: usize,
    /// Length, in logical characters; zero-length matches are legal but
    /// never trigger a replace action
    pub len: usize,
    /// The matched text
    pub text: String,
    /// Expanded replacement, when a template was supplied
    pub replacement: Option<String>,
}

/// Find all matches, leftmost-first and non-overlapping, with the host
/// engine's standard semantics
pub(crate) fn find_matches(regex: &Regex, stream: &str, template: Option<&str>) -> Vec<MatchSpan> {
    let byte_starts: Vec<usize> = stream.char_indices().map(|(b, _)| b).collect();
    let char_index = |byte: usize| byte_starts.partition_point(|&b| b < byte);

    let mut spans = Vec::new();
    for caps in regex.captures_iter(stream) {
        let Some(whole) = caps.get(0) else { continue };
        let start = char_index(whole.start());
        let len = char_index(whole.end()) - start;
        let replacement = template.map(|t| {
            let mut expanded = String::new();
            caps.expand(t, &mut expanded);
            expanded
        });
        spans.push(MatchSpan {
            start,
            len,
            text: whole.as_str().to_string(),
            replacement,
        });
    }
    spans
}

//! Error types for search/replace operations

use thiserror::Error;

use crate::replacer::PartKind;

/// Errors that can occur during a search/replace pass
#[derive(Error, Debug)]
pub enum ReplaceError {
    /// The host part kind does not support tracked revisions
    #[error("tracked revisions are not supported for {kind:?} content")]
    TrackedRevisionsUnsupported { kind: PartKind },

    /// Revision tracking was requested without an author
    #[error("tracked revisions require a non-empty author")]
    MissingAuthor,

    /// A match resolved outside the segmented run range. This indicates a
    /// segmentation defect, not a caller error.
    #[error("match at {start}..{end} lies outside the segmented run range ({runs} runs)")]
    MatchOutOfBounds {
        start: usize,
        end: usize,
        runs: usize,
    },

    /// Error raised by a caller-supplied match predicate; propagated unmodified
    #[error("match predicate error: {0}")]
    Callback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Error from the underlying XML tree layer
    #[error("XML error: {0}")]
    Xml(#[from] redline_xml::XmlError),
}

/// Result type for search/replace operations
pub type Result<T> = std::result::Result<T, ReplaceError>;

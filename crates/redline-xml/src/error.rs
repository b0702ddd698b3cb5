//! Error types for XML tree operations

use thiserror::Error;

/// Errors that can occur while parsing or serializing XML fragments
#[derive(Error, Debug)]
pub enum XmlError {
    /// Error reported by the underlying XML reader
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Malformed attribute syntax
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Invalid character or entity escape
    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Close tag without a matching open tag
    #[error("unbalanced element nesting")]
    Unbalanced,

    /// The input contained no root element
    #[error("expected a root element")]
    MissingRoot,
}

/// Result type for XML tree operations
pub type Result<T> = std::result::Result<T, XmlError>;

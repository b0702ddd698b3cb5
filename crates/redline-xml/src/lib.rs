//! # redline-xml
//!
//! Owned, mutable XML tree for redline's WordprocessingML rewriting.
//!
//! This crate provides functionality to:
//! - Parse XML fragments into an owned element tree
//! - Navigate and mutate the tree in place
//! - Serialize the tree back to XML text
//!
//! ## Example
//!
//! ```
//! use redline_xml::parse_element;
//!
//! let para = parse_element(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#)?;
//! assert_eq!(para.text(), "Hello");
//! # Ok::<(), redline_xml::XmlError>(())
//! ```

pub mod error;
pub mod node;
pub mod parse;

pub use error::{Result, XmlError};
pub use node::{nodes_to_xml, Element, XmlNode};
pub use parse::{parse_element, parse_fragment};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

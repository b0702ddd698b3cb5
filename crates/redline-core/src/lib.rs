//! # redline-core
//!
//! Regex-driven structural search and replace for run-oriented
//! WordprocessingML, with optional tracked-revision output.
//!
//! A paragraph's text is typically fragmented across many runs (formatting
//! boundaries, revision wrappers, field codes). This crate reconciles that
//! fragmented physical tree with the flat logical string a regex operates
//! over: runs are segmented to character granularity, matches are found on
//! the projected stream, and the covered runs are rewritten, either
//! directly or as authored insert/delete revision wrappers.
//!
//! ## Example
//!
//! ```
//! use redline_core::{PartKind, SymbolTable, TextReplacer};
//! use redline_xml::parse_fragment;
//! use regex::Regex;
//!
//! let mut nodes = parse_fragment(
//!     r#"<w:p><w:r><w:t>Hello World, Hello Moon</w:t></w:r></w:p>"#,
//! )?;
//! let regex = Regex::new(r"Hello \w+").unwrap();
//! let mut symbols = SymbolTable::new();
//!
//! let count = TextReplacer::new(&regex)
//!     .replacement("Hi $0")
//!     .apply(PartKind::MainDocument, &mut nodes, &mut symbols, None)?;
//! assert_eq!(count, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod projection;
pub mod replacer;
pub mod revisions;

mod matcher;
mod mutate;
mod segment;

pub use error::{ReplaceError, Result};
pub use projection::{matchable_text, RunContent, SymbolTable};
pub use replacer::{MatchInfo, MatchPredicate, PartKind, TextReplacer};
pub use revisions::assign_revision_ids;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! # hctx-parser
//!
//! Parsers for the two text formats Hyper Context understands:
//! - the structured knowledge markup stored in every file node
//!   (`<head>`, `<core>`, `<extend>` with `<block>`s), see [`markup`]
//! - name specs such as `docs/intro.md#Glossary`, parsed with a pest
//!   grammar, see [`namespec`]
//!
//! Both parsers are total: malformed input degrades to empty fields.

pub mod document;
pub mod markup;
pub mod namespec;

pub use document::{normalize_whitespace, ExtendBlock, Head, Level, StructuredDocument};
pub use markup::{extract_tag, parse_document, parse_escaped, write_document};
pub use namespec::{parse_name_spec, NameSpec};

//! Name specs: how callers address a document and, optionally, a block.
//!
//! Syntax: `path/segment/.../leaf[#blockName]`. Segments are separated by
//! `/` and trimmed; empty segments are discarded. `#` splits at most once.

use pest::Parser;
use pest_derive::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[grammar = "namespec.pest"]
struct NameSpecParser;

/// A name spec split into its path segments and optional block name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameSpec {
    pub segments: Vec<String>,
    pub block: Option<String>,
}

impl NameSpec {
    /// A single bare segment, e.g. `intro.md` (no `/` involved).
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.segments.len() == 1
    }
}

/// Parse a name spec. Never fails: an empty spec has no segments and no block.
#[must_use]
pub fn parse_name_spec(spec: &str) -> NameSpec {
    let spec = spec.trim();
    if spec.is_empty() {
        return NameSpec::default();
    }

    // The grammar accepts every input; an error here leaves the spec empty.
    let Some(root) = NameSpecParser::parse(Rule::name_spec, spec)
        .ok()
        .and_then(|mut pairs| pairs.next())
    else {
        return NameSpec::default();
    };

    let mut parsed = NameSpec::default();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::path => {
                parsed.segments = pair
                    .into_inner()
                    .map(|seg| seg.as_str().trim())
                    .filter(|seg| !seg.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            Rule::block => {
                let block = pair.as_str().trim();
                if !block.is_empty() {
                    parsed.block = Some(block.to_string());
                }
            }
            _ => {}
        }
    }
    parsed
}

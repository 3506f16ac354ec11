//! Structured knowledge markup.
//!
//! A file node's raw content embeds XML-like sections in plain text:
//! ```text
//! <head>
//!   <name>intro.md</name>
//!   <level>core</level>
//!   <description>Project overview.</description>
//! </head>
//!
//! <core>
//!   <content>Always shown.</content>
//! </core>
//!
//! <extend>
//!   <block>
//!     <name>Glossary</name>
//!     <level>core</level>
//!     <description>Terms.</description>
//!     <content>...</content>
//!   </block>
//! </extend>
//! ```
//!
//! Extraction is lightweight and non-validating: a tag matches its first
//! non-greedy `<tag>...</tag>` occurrence (tag name case-insensitive,
//! whitespace allowed inside the brackets) and the inner text is trimmed.
//! Anything that does not fit the pattern is ignored, never rejected.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::{ExtendBlock, Head, Level, StructuredDocument};

const KNOWN_TAGS: [&str; 8] = [
    "head",
    "core",
    "extend",
    "block",
    "name",
    "level",
    "description",
    "content",
];

static TAG_PATTERNS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| KNOWN_TAGS.iter().map(|t| (*t, tag_pattern(t))).collect());

fn tag_pattern(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?is)<\s*{tag}\s*>(.*?)<\s*/\s*{tag}\s*>"))
        .expect("escaped tag pattern is a valid regex")
}

fn with_pattern<R>(tag: &str, f: impl FnOnce(&Regex) -> R) -> R {
    match TAG_PATTERNS.get(tag) {
        Some(re) => f(re),
        None => f(&tag_pattern(tag)),
    }
}

/// Trimmed inner text of the first `<tag>...</tag>` in `src`, or `""`.
#[must_use]
pub fn extract_tag<'a>(src: &'a str, tag: &str) -> &'a str {
    with_pattern(tag, |re| {
        re.captures(src)
            .and_then(|c| c.get(1))
            .map_or("", |m| m.as_str().trim())
    })
}

/// Inner text of every `<tag>...</tag>` in `src`, in order, untrimmed.
fn extract_all<'a>(src: &'a str, tag: &str) -> Vec<&'a str> {
    with_pattern(tag, |re| {
        re.captures_iter(src)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    })
}

fn parse_block(src: &str) -> Option<ExtendBlock> {
    let name = extract_tag(src, "name");
    if name.is_empty() {
        return None;
    }
    Some(ExtendBlock {
        name: name.to_string(),
        level: Level::parse_or(extract_tag(src, "level"), Level::Extend),
        description: extract_tag(src, "description").to_string(),
        content: extract_tag(src, "content").to_string(),
    })
}

/// Parse raw node content into a [`StructuredDocument`].
///
/// Total: missing sections yield empty strings and lists. Blocks without a
/// name are dropped.
#[must_use]
pub fn parse_document(raw: &str) -> StructuredDocument {
    let head_src = extract_tag(raw, "head");
    let core_src = extract_tag(raw, "core");
    let extend_src = extract_tag(raw, "extend");

    let head = Head {
        name: extract_tag(head_src, "name").to_string(),
        level: Level::parse_or(extract_tag(head_src, "level"), Level::Core),
        description: extract_tag(head_src, "description").to_string(),
        core_content: extract_tag(core_src, "content").to_string(),
    };

    let extend_blocks = extract_all(extend_src, "block")
        .into_iter()
        .filter_map(parse_block)
        .collect();

    StructuredDocument {
        head,
        extend_blocks,
    }
}

/// Decode `&lt;`, `&gt;` and `&amp;`, then parse.
///
/// Used where stored content may have been HTML-escaped by an editor.
#[must_use]
pub fn parse_escaped(raw: &str) -> StructuredDocument {
    let decoded = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    parse_document(&decoded)
}

/// Render a document back into markup that [`parse_document`] reads.
#[must_use]
pub fn write_document(doc: &StructuredDocument) -> String {
    let mut out = String::new();
    out.push_str("<head>\n");
    out.push_str(&format!("  <name>{}</name>\n", doc.head.name));
    out.push_str(&format!("  <level>{}</level>\n", doc.head.level.as_str()));
    out.push_str(&format!(
        "  <description>{}</description>\n",
        doc.head.description
    ));
    out.push_str("</head>\n");

    if !doc.head.core_content.is_empty() {
        out.push_str("\n<core>\n  <content>\n");
        out.push_str(&doc.head.core_content);
        out.push_str("\n  </content>\n</core>\n");
    }

    out.push_str("\n<extend>\n");
    for block in &doc.extend_blocks {
        out.push_str("  <block>\n");
        out.push_str(&format!("    <name>{}</name>\n", block.name));
        out.push_str(&format!("    <level>{}</level>\n", block.level.as_str()));
        out.push_str(&format!(
            "    <description>{}</description>\n",
            block.description
        ));
        out.push_str("    <content>\n");
        out.push_str(&block.content);
        out.push_str("\n    </content>\n  </block>\n");
    }
    out.push_str("</extend>\n");
    out
}

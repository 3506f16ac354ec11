//! Typed model of a parsed knowledge document.

use serde::{Deserialize, Serialize};

/// Visibility level of a document head or block.
///
/// Core knowledge is inlined into previews; extend knowledge is only
/// discoverable through the index tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Core,
    Extend,
}

impl Level {
    /// Interpret a raw `<level>` value. Empty falls back to `default`;
    /// any value other than `core` is treated as non-core.
    #[must_use]
    pub fn parse_or(raw: &str, default: Level) -> Level {
        let raw = raw.trim();
        if raw.is_empty() {
            default
        } else if raw.eq_ignore_ascii_case("core") {
            Level::Core
        } else {
            Level::Extend
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Extend => "extend",
        }
    }
}

/// The `<head>` summary of a document plus its core body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    pub name: String,
    pub level: Level,
    pub description: String,
    pub core_content: String,
}

impl Default for Head {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: Level::Core,
            description: String::new(),
            core_content: String::new(),
        }
    }
}

/// A named sub-unit inside `<extend>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendBlock {
    pub name: String,
    pub level: Level,
    /// Raw (trimmed) description.
    pub description: String,
    pub content: String,
}

impl ExtendBlock {
    /// Description as shown in index listings: whitespace collapsed.
    #[must_use]
    pub fn summary_description(&self) -> String {
        normalize_whitespace(&self.description)
    }
}

/// A parsed knowledge document. Derived from raw content on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub head: Head,
    pub extend_blocks: Vec<ExtendBlock>,
}

impl StructuredDocument {
    /// Blocks whose name is one of `keys`, in document order.
    pub fn blocks_named<'a, K: AsRef<str>>(
        &'a self,
        keys: &'a [K],
    ) -> impl Iterator<Item = &'a ExtendBlock> + 'a {
        self.extend_blocks
            .iter()
            .filter(move |b| keys.iter().any(|k| k.as_ref() == b.name))
    }
}

/// Collapse every whitespace run to a single space and trim.
#[must_use]
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

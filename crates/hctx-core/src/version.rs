//! Versions and the content they own.
//!
//! A version is created as a draft, is published exactly once (which freezes
//! the current tree), and may then be marked stable. At most one version per
//! project is stable at any time.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HctxError;
use crate::node::TreeNode;

/// Lifecycle state of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Draft,
    Published,
}

impl VersionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = HctxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(HctxError::Parse(format!("unknown version status '{other}'"))),
        }
    }
}

/// A version of a project's knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    pub project_id: String,
    /// Semver-like label, unique per project.
    pub version: String,
    pub status: VersionStatus,
    pub is_stable: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Tree frozen at publish time, as JSON.
    #[serde(skip)]
    pub tree_snapshot: Option<String>,
}

impl Version {
    /// Content of a published version is read-only.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.status == VersionStatus::Draft
    }
}

/// Raw contents of one version: the project-level main document plus one
/// entry per node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBundle {
    pub main: String,
    pub nodes: HashMap<String, String>,
}

impl ContentBundle {
    /// Raw content of a node; absent nodes read as empty.
    #[must_use]
    pub fn node(&self, id: &str) -> &str {
        self.nodes.get(id).map(String::as_str).unwrap_or("")
    }
}

/// The complete state of one version: tree plus contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub version: Version,
    pub tree: Vec<TreeNode>,
    pub contents: ContentBundle,
}

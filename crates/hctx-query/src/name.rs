//! Name resolution: from a name spec to a node and an optional block.
//!
//! A spec with a path walks the tree one segment at a time. A single bare
//! segment that does not resolve as a path falls back to a project-wide
//! file-name lookup. Exact names always win over case-insensitive ones, and
//! ties are broken by `(parent_id, sort_order)` order.
//!
//! Absence is never an error here: unresolved parts come back as `None`
//! and the caller decides what that means.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use hctx_core::error::Result;
use hctx_core::node::KnowledgeNode;
use hctx_core::scope::RequestScope;
use hctx_core::store::KnowledgeStore;
use hctx_parser::namespec::parse_name_spec;

/// Outcome of resolving a name spec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedName {
    pub node_id: Option<String>,
    pub node_name: Option<String>,
    pub block_name: Option<String>,
}

fn same_name_ci(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Exact match first, case-insensitive fallback, first in list order.
fn pick<'a, I>(candidates: I, name: &str) -> Option<&'a KnowledgeNode>
where
    I: IntoIterator<Item = &'a KnowledgeNode>,
    I::IntoIter: Clone,
{
    let iter = candidates.into_iter();
    iter.clone()
        .find(|n| n.name == name)
        .or_else(|| iter.clone().find(|n| same_name_ci(&n.name, name)))
}

/// Walk `segments` from the roots. Every segment but the last must be a
/// folder; the last must be a file.
fn walk_path<'a>(nodes: &'a [KnowledgeNode], segments: &[String]) -> Option<&'a KnowledgeNode> {
    let mut by_parent: HashMap<Option<&str>, Vec<&KnowledgeNode>> = HashMap::new();
    for node in nodes {
        by_parent
            .entry(node.parent_id.as_deref())
            .or_default()
            .push(node);
    }

    let mut parent: Option<&str> = None;
    let mut last: Option<&KnowledgeNode> = None;
    for (i, segment) in segments.iter().enumerate() {
        let level = by_parent.get(&parent).map(Vec::as_slice).unwrap_or_default();
        let found = pick(level.iter().copied(), segment)?;
        if i + 1 < segments.len() && !found.is_folder() {
            return None;
        }
        parent = Some(found.id.as_str());
        last = Some(found);
    }
    last.filter(|n| n.is_file())
}

fn find_file<'a>(nodes: &'a [KnowledgeNode], name: &str) -> Option<&'a KnowledgeNode> {
    pick(nodes.iter().filter(|n| n.is_file()), name)
}

/// Resolve a path of segments to a file node.
///
/// # Errors
///
/// Only store failures.
pub fn resolve_by_path<S>(
    store: &S,
    scope: &RequestScope,
    segments: &[String],
) -> Result<Option<KnowledgeNode>>
where
    S: KnowledgeStore + ?Sized,
{
    if segments.is_empty() {
        return Ok(None);
    }
    let nodes = store.list_nodes(&scope.project_id)?;
    Ok(walk_path(&nodes, segments).cloned())
}

/// Find a file anywhere in the project by name.
///
/// # Errors
///
/// Only store failures.
pub fn resolve_by_file_name<S>(
    store: &S,
    scope: &RequestScope,
    name: &str,
) -> Result<Option<KnowledgeNode>>
where
    S: KnowledgeStore + ?Sized,
{
    let nodes = store.list_nodes(&scope.project_id)?;
    Ok(find_file(&nodes, name).cloned())
}

/// Resolve a name spec such as `docs/intro.md#Glossary`.
///
/// # Errors
///
/// Only store failures; an unknown name yields `None` fields.
pub fn resolve_name<S>(store: &S, scope: &RequestScope, spec: &str) -> Result<ResolvedName>
where
    S: KnowledgeStore + ?Sized,
{
    let parsed = parse_name_spec(spec);
    let mut node = None;
    if !parsed.segments.is_empty() {
        let nodes = store.list_nodes(&scope.project_id)?;
        node = walk_path(&nodes, &parsed.segments).cloned();
        if node.is_none() && parsed.is_bare() {
            node = find_file(&nodes, &parsed.segments[0]).cloned();
        }
    }

    debug!(
        project_id = %scope.project_id,
        spec,
        node_id = ?node.as_ref().map(|n| &n.id),
        block = ?parsed.block,
        "resolved name"
    );

    Ok(ResolvedName {
        node_id: node.as_ref().map(|n| n.id.clone()),
        node_name: node.map(|n| n.name),
        block_name: parsed.block,
    })
}

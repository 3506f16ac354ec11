//! Preview compositor: one Markdown document per version.
//!
//! The preview concatenates the main document, a rendering of the tree, and
//! a section per file. Core documents are shown inline; non-core documents
//! and non-core blocks are elided with a pointer to `get-knowledge-index`.

use tracing::{debug, warn};

use hctx_core::error::{HctxError, Result};
use hctx_core::node::{build_tree, NodeType, TreeNode};
use hctx_core::scope::RequestScope;
use hctx_core::store::KnowledgeStore;
use hctx_core::version::{ContentBundle, VersionSnapshot, VersionStatus};
use hctx_parser::document::{Level, StructuredDocument};
use hctx_parser::markup::parse_escaped;

use crate::version::resolve_version;

const DEFAULT_PROJECT_NAME: &str = "Project";
const ELISION_NOTICE: &str = "Some non-core knowledge is omitted. \
Use get-knowledge-index to list the omitted knowledge of this document.";

fn render_tree(nodes: &[TreeNode], depth: usize, out: &mut Vec<String>) {
    let pad = "  ".repeat(depth);
    for node in nodes {
        match node.node_type {
            NodeType::Folder => {
                out.push(format!("{pad}- {}/", node.name));
                render_tree(&node.children, depth + 1, out);
            }
            NodeType::File => out.push(format!("{pad}- {}", node.name)),
        }
    }
}

fn render_file(file: &TreeNode, doc: &StructuredDocument) -> String {
    let name = if doc.head.name.trim().is_empty() {
        file.name.trim()
    } else {
        doc.head.name.trim()
    };
    let description = doc.head.description.trim();

    let mut lines = vec![format!("## {name}")];
    if description.is_empty() {
        lines.push("Description: —".to_string());
    } else {
        lines.push(format!("Description: {description}"));
    }

    if doc.head.level == Level::Core {
        let core = doc.head.core_content.trim();
        if !core.is_empty() {
            lines.push(String::new());
            lines.push(core.to_string());
        }
    } else {
        lines.push(String::new());
        lines.push(ELISION_NOTICE.to_string());
    }

    if !doc.extend_blocks.is_empty() {
        lines.push(String::new());
        lines.push("**Extended knowledge index:**".to_string());
        for block in doc.extend_blocks.iter().filter(|b| b.level == Level::Core) {
            let description = block.summary_description();
            let description = if description.is_empty() {
                "No description"
            } else {
                description.as_str()
            };
            lines.push(format!("- {}: {description}", block.name.trim()));
        }
        if doc.extend_blocks.iter().any(|b| b.level != Level::Core) {
            lines.push("- ...other extended knowledge omitted".to_string());
        }
    }

    lines.join("\n")
}

/// Compose the preview document from a tree and its contents.
#[must_use]
pub fn build_preview(project_name: &str, tree: &[TreeNode], contents: &ContentBundle) -> String {
    let project = match project_name.trim() {
        "" => DEFAULT_PROJECT_NAME,
        name => name,
    };
    let mut parts = Vec::new();

    let main = contents.main.trim();
    if !main.is_empty() {
        parts.push(main.to_string());
    }

    let mut tree_lines = vec![format!("# {project} Knowledge Tree"), String::new()];
    render_tree(tree, 0, &mut tree_lines);
    parts.push(tree_lines.join("\n"));

    let mut details = vec![format!("# {project} Core Knowledge Details")];
    for file in TreeNode::files(tree) {
        let doc = parse_escaped(contents.node(&file.id));
        details.push(render_file(file, &doc));
    }
    parts.push(details.join("\n\n"));

    parts.join("\n\n")
}

/// Load the tree and contents of one version.
///
/// Published versions use the tree frozen at publish time; drafts use the
/// live tree. With `root`, only that node's subtree is kept.
///
/// # Errors
///
/// Returns [`HctxError::NotFound`] if the version does not belong to the
/// project, and store errors as-is.
pub fn load_snapshot<S>(
    store: &S,
    scope: &RequestScope,
    version_id: &str,
    root: Option<&str>,
) -> Result<VersionSnapshot>
where
    S: KnowledgeStore + ?Sized,
{
    let project_id = scope.project_id.as_str();
    let version = store
        .find_version(project_id, version_id)?
        .ok_or_else(|| HctxError::NotFound("Version not found".to_string()))?;

    let mut tree = match (&version.status, version.tree_snapshot.as_deref()) {
        (VersionStatus::Published, Some(frozen)) => {
            serde_json::from_str::<Vec<TreeNode>>(frozen).unwrap_or_else(|e| {
                warn!(version_id, error = %e, "unreadable tree snapshot, using empty tree");
                Vec::new()
            })
        }
        _ => build_tree(&store.list_nodes(project_id)?),
    };
    if let Some(root) = root {
        tree = TreeNode::find(&tree, root).cloned().into_iter().collect();
    }

    let mut contents = ContentBundle {
        main: store.main_content(version_id)?.unwrap_or_default(),
        ..ContentBundle::default()
    };
    for id in tree.iter().flat_map(TreeNode::subtree_ids) {
        let raw = store.node_content(version_id, &id)?.unwrap_or_default();
        contents.nodes.insert(id, raw);
    }
    debug!(project_id, version_id, nodes = contents.nodes.len(), "loaded snapshot");

    Ok(VersionSnapshot {
        version,
        tree,
        contents,
    })
}

/// Preview of the version addressed by `token` (stable when `None`).
///
/// # Errors
///
/// Version resolution failures and store errors.
pub fn preview<S>(store: &S, scope: &RequestScope, token: Option<&str>) -> Result<String>
where
    S: KnowledgeStore + ?Sized,
{
    let version = resolve_version(store, scope, token)?;
    let snapshot = load_snapshot(store, scope, &version.id, None)?;
    let project_name = store.project_name(&scope.project_id)?.unwrap_or_default();
    Ok(build_preview(&project_name, &snapshot.tree, &snapshot.contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::Fixture;

    fn file(id: &str, name: &str) -> TreeNode {
        TreeNode {
            id: id.to_string(),
            name: name.to_string(),
            node_type: NodeType::File,
            parent_id: None,
            children: Vec::new(),
        }
    }

    fn bundle(entries: &[(&str, &str)]) -> ContentBundle {
        ContentBundle {
            main: String::new(),
            nodes: entries
                .iter()
                .map(|(id, raw)| ((*id).to_string(), (*raw).to_string()))
                .collect(),
        }
    }

    #[test]
    fn stable_preview_of_fixture() {
        let fx = Fixture::new();
        let out = preview(&fx.store, &fx.scope, None).unwrap();

        assert!(out.starts_with("# Hyper Docs\n\nMain document.\n\n# Hyper Docs Knowledge Tree"));
        assert!(out.contains("- docs/\n  - intro.md\n  - setup.md"));
        assert!(out.contains("# Hyper Docs Core Knowledge Details"));

        assert!(out.contains("## intro.md\nDescription: Project overview and"));
        assert!(out.contains("Intro core body."));
        assert!(out.contains("**Extended knowledge index:**\n- Glossary: Core terms explained"));
        assert!(!out.contains("secret"));
        assert!(!out.contains("Advanced"));

        assert!(out.contains("## Setup Guide\nDescription: Installation steps.\n\n"));
        assert!(out.contains(ELISION_NOTICE));
        assert!(!out.contains("Setup hidden body."));
        assert!(out.contains("- ...other extended knowledge omitted"));
    }

    #[test]
    fn elides_non_core_head() {
        let tree = vec![file("a", "a.md")];
        let contents = bundle(&[(
            "a",
            "<head><name>A</name><level>extend</level></head><core><content>hidden</content></core>",
        )]);
        let out = build_preview("Demo", &tree, &contents);
        assert!(out.contains("## A\nDescription: —\n\n"));
        assert!(out.contains(ELISION_NOTICE));
        assert!(!out.contains("hidden"));
        assert!(!out.contains("**Extended knowledge index:**"));
    }

    #[test]
    fn lists_core_blocks_and_marks_omissions_once() {
        let tree = vec![file("a", "a.md")];
        let contents = bundle(&[(
            "a",
            "<extend>\
             <block><name>One</name><level>core</level></block>\
             <block><name>Two</name></block>\
             <block><name>Three</name><level>weird</level></block>\
             </extend>",
        )]);
        let out = build_preview("Demo", &tree, &contents);
        assert!(out.contains("- One: No description"));
        assert!(!out.contains("Two"));
        assert_eq!(out.matches("other extended knowledge omitted").count(), 1);
    }

    #[test]
    fn decodes_escaped_markup() {
        let tree = vec![file("a", "a.md")];
        let contents = bundle(&[(
            "a",
            "&lt;head&gt;&lt;name&gt;Escaped&lt;/name&gt;&lt;/head&gt;\
             &lt;core&gt;&lt;content&gt;a &amp;amp; b&lt;/content&gt;&lt;/core&gt;",
        )]);
        let out = build_preview("Demo", &tree, &contents);
        assert!(out.contains("## Escaped"));
        assert!(out.contains("a &amp; b"));
    }

    #[test]
    fn empty_project_name_and_missing_content() {
        let tree = vec![file("a", "a.md")];
        let out = build_preview("", &tree, &ContentBundle::default());
        assert!(out.starts_with("# Project Knowledge Tree\n\n- a.md"));
        assert!(out.contains("# Project Core Knowledge Details\n\n## a.md\nDescription: —"));
    }

    #[test]
    fn published_snapshot_keeps_frozen_tree() {
        let fx = Fixture::new();
        let pid = &fx.scope.project_id;
        fx.store
            .create_node(pid, Some(&fx.docs_id), "late.md", NodeType::File)
            .unwrap();

        let stable = load_snapshot(&fx.store, &fx.scope, &fx.stable_id, None).unwrap();
        let names: Vec<&str> = TreeNode::files(&stable.tree)
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["intro.md", "setup.md"]);

        let draft = load_snapshot(&fx.store, &fx.scope, &fx.draft_id, None).unwrap();
        assert_eq!(TreeNode::files(&draft.tree).len(), 3);
        assert!(preview(&fx.store, &fx.scope, Some("draft")).unwrap().contains("late.md"));
        assert!(!preview(&fx.store, &fx.scope, None).unwrap().contains("late.md"));
    }

    #[test]
    fn snapshot_has_entry_for_every_node() {
        let fx = Fixture::new();
        let snap = load_snapshot(&fx.store, &fx.scope, &fx.stable_id, None).unwrap();
        assert_eq!(snap.contents.nodes.len(), 3);
        assert_eq!(snap.contents.node(&fx.docs_id), "");
        assert!(snap.contents.node(&fx.intro_id).contains("Glossary"));
        assert_eq!(snap.contents.main, "# Hyper Docs\n\nMain document.");
    }

    #[test]
    fn snapshot_root_filter() {
        let fx = Fixture::new();
        let snap = load_snapshot(&fx.store, &fx.scope, &fx.stable_id, Some(&fx.setup_id)).unwrap();
        assert_eq!(snap.tree.len(), 1);
        assert_eq!(snap.tree[0].name, "setup.md");
        assert_eq!(snap.contents.nodes.len(), 1);

        let none = load_snapshot(&fx.store, &fx.scope, &fx.stable_id, Some("unknown")).unwrap();
        assert!(none.tree.is_empty());
        assert!(none.contents.nodes.is_empty());
    }

    #[test]
    fn snapshot_rejects_foreign_version() {
        let fx = Fixture::new();
        let other = RequestScope::new(fx.store.create_project("Other").unwrap());
        let err = load_snapshot(&fx.store, &other, &fx.stable_id, None).unwrap_err();
        assert!(err.is_not_found());
    }
}

//! Knowledge nodes and the materialized tree built from them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HctxError;

/// Whether a node holds content or other nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Folder,
}

impl NodeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = HctxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "folder" => Ok(Self::Folder),
            other => Err(HctxError::Parse(format!("unknown node type '{other}'"))),
        }
    }
}

/// A file or folder in a project's documentation forest, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub parent_id: Option<String>,
    pub sort_order: i64,
}

impl KnowledgeNode {
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.node_type == NodeType::Folder
    }
}

/// A node with its children attached. This is also the JSON shape of the
/// tree frozen into a published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Every file in the forest, depth-first in child order.
    #[must_use]
    pub fn files(forest: &[TreeNode]) -> Vec<&TreeNode> {
        fn walk<'a>(list: &'a [TreeNode], out: &mut Vec<&'a TreeNode>) {
            for node in list {
                if node.node_type == NodeType::File {
                    out.push(node);
                }
                walk(&node.children, out);
            }
        }
        let mut out = Vec::new();
        walk(forest, &mut out);
        out
    }

    /// Ids of this node and all of its descendants.
    #[must_use]
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for child in &self.children {
            ids.extend(child.subtree_ids());
        }
        ids
    }

    /// Find a node anywhere in the forest.
    #[must_use]
    pub fn find<'a>(forest: &'a [TreeNode], id: &str) -> Option<&'a TreeNode> {
        forest.iter().find_map(|node| {
            if node.id == id {
                Some(node)
            } else {
                Self::find(&node.children, id)
            }
        })
    }
}

/// Build the forest from flat rows already ordered by `(parent_id, sort_order)`.
///
/// A row whose parent is unknown, or whose parent is not a folder, becomes a
/// root rather than being lost.
#[must_use]
pub fn build_tree(rows: &[KnowledgeNode]) -> Vec<TreeNode> {
    let by_id: HashMap<&str, &KnowledgeNode> = rows.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut children: HashMap<&str, Vec<&KnowledgeNode>> = HashMap::new();
    let mut roots: Vec<&KnowledgeNode> = Vec::new();
    for row in rows {
        let parent = row
            .parent_id
            .as_deref()
            .and_then(|pid| by_id.get(pid).copied())
            .filter(|p| p.is_folder());
        match parent {
            Some(p) => children.entry(p.id.as_str()).or_default().push(row),
            None => roots.push(row),
        }
    }

    fn attach(row: &KnowledgeNode, children: &HashMap<&str, Vec<&KnowledgeNode>>) -> TreeNode {
        TreeNode {
            id: row.id.clone(),
            name: row.name.clone(),
            node_type: row.node_type,
            parent_id: row.parent_id.clone(),
            children: children
                .get(row.id.as_str())
                .map(|list| list.iter().map(|c| attach(c, children)).collect())
                .unwrap_or_default(),
        }
    }

    roots.iter().map(|r| attach(r, &children)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, name: &str, node_type: NodeType, parent: Option<&str>, order: i64) -> KnowledgeNode {
        KnowledgeNode {
            id: id.to_string(),
            name: name.to_string(),
            node_type,
            parent_id: parent.map(str::to_string),
            sort_order: order,
        }
    }

    fn sample_rows() -> Vec<KnowledgeNode> {
        vec![
            node("f-docs", "docs", NodeType::Folder, None, 0),
            node("n-readme", "readme.md", NodeType::File, None, 1),
            node("n-intro", "intro.md", NodeType::File, Some("f-docs"), 0),
            node("f-deep", "deep", NodeType::Folder, Some("f-docs"), 1),
            node("n-leaf", "leaf.md", NodeType::File, Some("f-deep"), 0),
        ]
    }

    #[test]
    fn build_tree_nests_children_under_folders() {
        let tree = build_tree(&sample_rows());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].name, "docs");
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[1].children[0].name, "leaf.md");
        assert_eq!(tree[1].name, "readme.md");
    }

    #[test]
    fn build_tree_promotes_orphans_and_children_of_files() {
        let rows = vec![
            node("n-a", "a.md", NodeType::File, None, 0),
            node("n-b", "b.md", NodeType::File, Some("n-a"), 0),
            node("n-c", "c.md", NodeType::File, Some("missing"), 0),
        ];
        let tree = build_tree(&rows);
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md", "c.md"]);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn files_are_listed_depth_first() {
        let tree = build_tree(&sample_rows());
        let names: Vec<&str> = TreeNode::files(&tree).iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["intro.md", "leaf.md", "readme.md"]);
    }

    #[test]
    fn find_and_subtree_ids() {
        let tree = build_tree(&sample_rows());
        let deep = TreeNode::find(&tree, "f-deep").unwrap();
        assert_eq!(deep.subtree_ids(), vec!["f-deep".to_string(), "n-leaf".to_string()]);
        assert!(TreeNode::find(&tree, "nope").is_none());
    }

    #[test]
    fn tree_json_uses_camel_case_and_type_key() {
        let tree = build_tree(&sample_rows());
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["type"], "folder");
        assert_eq!(json[0]["children"][0]["parentId"], "f-docs");
        let back: Vec<TreeNode> = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn node_type_parses_known_values_only() {
        assert_eq!("file".parse::<NodeType>().unwrap(), NodeType::File);
        assert_eq!("folder".parse::<NodeType>().unwrap(), NodeType::Folder);
        assert!("dir".parse::<NodeType>().is_err());
    }
}

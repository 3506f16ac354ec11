//! The read interface the retrieval engine consumes.
//!
//! Storage is owned by an external collaborator; the engine only ever reads
//! through this trait, so any backend (SQLite, a remote API, fixtures) can
//! sit behind it.

use crate::error::Result;
use crate::node::KnowledgeNode;
use crate::version::Version;

/// Read access to trees, versions, and contents.
pub trait KnowledgeStore {
    /// Display name of a project, if the project exists.
    fn project_name(&self, project_id: &str) -> Result<Option<String>>;

    /// All nodes of a project ordered by `(parent_id, sort_order)`.
    ///
    /// The order must be stable for a given project state.
    fn list_nodes(&self, project_id: &str) -> Result<Vec<KnowledgeNode>>;

    /// A single node, only if it belongs to the project.
    fn get_node(&self, project_id: &str, node_id: &str) -> Result<Option<KnowledgeNode>>;

    /// The project's stable version.
    fn stable_version(&self, project_id: &str) -> Result<Option<Version>>;

    /// The most recently created draft of the project.
    fn latest_draft(&self, project_id: &str) -> Result<Option<Version>>;

    /// A concrete version, only if it belongs to the project.
    fn find_version(&self, project_id: &str, version_id: &str) -> Result<Option<Version>>;

    /// Raw content of a node in a version.
    fn node_content(&self, version_id: &str, node_id: &str) -> Result<Option<String>>;

    /// Raw main document of a version.
    fn main_content(&self, version_id: &str) -> Result<Option<String>>;
}

impl<S: KnowledgeStore + ?Sized> KnowledgeStore for &S {
    fn project_name(&self, project_id: &str) -> Result<Option<String>> {
        (**self).project_name(project_id)
    }

    fn list_nodes(&self, project_id: &str) -> Result<Vec<KnowledgeNode>> {
        (**self).list_nodes(project_id)
    }

    fn get_node(&self, project_id: &str, node_id: &str) -> Result<Option<KnowledgeNode>> {
        (**self).get_node(project_id, node_id)
    }

    fn stable_version(&self, project_id: &str) -> Result<Option<Version>> {
        (**self).stable_version(project_id)
    }

    fn latest_draft(&self, project_id: &str) -> Result<Option<Version>> {
        (**self).latest_draft(project_id)
    }

    fn find_version(&self, project_id: &str, version_id: &str) -> Result<Option<Version>> {
        (**self).find_version(project_id, version_id)
    }

    fn node_content(&self, version_id: &str, node_id: &str) -> Result<Option<String>> {
        (**self).node_content(version_id, node_id)
    }

    fn main_content(&self, version_id: &str) -> Result<Option<String>> {
        (**self).main_content(version_id)
    }
}

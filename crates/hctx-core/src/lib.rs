//! # hctx-core
//!
//! Core types for the Hyper Context knowledge base.
//!
//! This crate defines the foundational types used across all other crates:
//! - [`KnowledgeNode`] and [`TreeNode`]: the documentation forest of a project
//! - [`Version`] and [`VersionStatus`]: the publish/stable lifecycle
//! - [`VersionSnapshot`] and [`ContentBundle`]: a tree plus its raw contents
//! - [`RequestScope`]: the per-request project scope threaded through every call
//! - [`KnowledgeStore`]: the read interface the retrieval engine consumes
//! - Error hierarchy ([`HctxError`])

pub mod error;
pub mod node;
pub mod scope;
pub mod store;
pub mod version;

pub use error::{HctxError, Result};
pub use node::{build_tree, KnowledgeNode, NodeType, TreeNode};
pub use scope::RequestScope;
pub use store::KnowledgeStore;
pub use version::{ContentBundle, Version, VersionSnapshot, VersionStatus};

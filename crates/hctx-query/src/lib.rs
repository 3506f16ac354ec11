//! # hctx-query
//!
//! Knowledge resolution and retrieval for Hyper Context.
//!
//! Includes:
//! - Name resolution (`path/to/doc.md#Block` → node + block)
//! - Version token resolution (`stable`, `draft`, or a concrete id)
//! - The two retrieval tools, streamed as [`ToolEvent`]s into an [`EventSink`]
//! - The preview compositor that flattens a version into one context document
//!
//! Everything here is a pure read over a [`hctx_core::KnowledgeStore`]; no
//! state is kept between calls and content is reparsed on every read.

pub mod event;
pub mod name;
pub mod preview;
pub mod retrieval;
pub mod version;

#[cfg(test)]
mod testutil;

pub use event::{
    collect_data, Cancelled, DetailBlock, DetailFile, ErrorCode, EventSink, IndexBlock, IndexFile,
    Payload, Tool, ToolEvent, ToolFailure,
};
pub use name::{resolve_by_file_name, resolve_by_path, resolve_name, ResolvedName};
pub use preview::{build_preview, load_snapshot, preview};
pub use retrieval::{get_knowledge, get_knowledge_index, DetailRequest, IndexRequest};
pub use version::{resolve_version, resolve_version_id, VersionToken};

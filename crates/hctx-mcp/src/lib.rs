//! # hctx-mcp
//!
//! MCP (Model Context Protocol) server for Hyper Context.
//!
//! Exposes the two read-only retrieval tools for one project:
//! - `get-knowledge-index`: block names and descriptions of documents
//! - `get-knowledge`: full block content by block name

pub mod tools;

pub use tools::{KnowledgeMcpService, NamesRequest};

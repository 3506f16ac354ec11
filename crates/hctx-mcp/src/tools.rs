//! MCP tool definitions for knowledge retrieval (read-only).

use std::path::PathBuf;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData, ServerHandler,
};
use serde::Deserialize;
use tracing::debug;

use hctx_core::scope::RequestScope;
use hctx_query::{
    collect_data, get_knowledge, get_knowledge_index, DetailRequest, ErrorCode, IndexRequest,
    ToolEvent, ToolFailure,
};
use hctx_store::SqliteStore;

/// Hyper Context MCP server bound to one project and one default version.
#[derive(Debug, Clone)]
pub struct KnowledgeMcpService {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
    /// Project every tool call reads from.
    pub scope: RequestScope,
    /// Version token applied to every call; `None` reads the stable version.
    pub version: Option<String>,
    /// Name reported to clients instead of the crate name.
    pub server_name: Option<String>,
    tool_router: ToolRouter<Self>,
}

impl KnowledgeMcpService {
    pub fn new(db_path: PathBuf, scope: RequestScope, version: Option<String>) -> Self {
        Self {
            db_path,
            scope,
            version,
            server_name: None,
            tool_router: Self::tool_router(),
        }
    }

    #[must_use]
    pub fn with_server_name(mut self, name: Option<String>) -> Self {
        self.server_name = name;
        self
    }

    fn open_store(&self) -> Result<SqliteStore, ErrorData> {
        SqliteStore::open(&self.db_path)
            .map_err(|e| ErrorData::internal_error(format!("Failed to open store: {e}"), None))
    }
}

fn failure_to_error(failure: ToolFailure) -> ErrorData {
    match failure.code {
        ErrorCode::InvalidInput => ErrorData::invalid_params(failure.message, None),
        ErrorCode::NotFound => ErrorData::resource_not_found(failure.message, None),
        ErrorCode::InternalError => ErrorData::internal_error(failure.message, None),
    }
}

/// Collect the `data` payloads of a finished tool run into a JSON text result.
fn into_result(events: Vec<ToolEvent>) -> Result<CallToolResult, ErrorData> {
    let data = collect_data(events).map_err(failure_to_error)?;
    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// === Tool request types ===

/// Request shared by both tools.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NamesRequest {
    /// Document specs for `get-knowledge-index` (e.g. "docs/intro.md" or
    /// "intro.md"), or block names for `get-knowledge` (e.g. "Glossary")
    #[schemars(length(min = 1))]
    pub names: Vec<String>,
}

#[tool_router]
impl KnowledgeMcpService {
    /// List the extended blocks of each named document.
    #[tool(
        name = "get-knowledge-index",
        description = "List the extended knowledge blocks (name and description, no content) of each named document. Accepts paths like 'docs/intro.md' or bare file names."
    )]
    fn knowledge_index(
        &self,
        Parameters(req): Parameters<NamesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let store = self.open_store()?;
        let request = IndexRequest::names(req.names);
        let mut events = Vec::new();
        get_knowledge_index(
            &store,
            &self.scope,
            self.version.as_deref(),
            &request,
            &mut events,
        );
        debug!(events = events.len(), "get-knowledge-index finished");
        into_result(events)
    }

    /// Fetch full block content by block name across the project.
    #[tool(
        name = "get-knowledge",
        description = "Fetch the full content of extended knowledge blocks by block name, searched across every document of the project."
    )]
    fn knowledge(
        &self,
        Parameters(req): Parameters<NamesRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let store = self.open_store()?;
        let request = DetailRequest::keys(req.names);
        let mut events = Vec::new();
        get_knowledge(
            &store,
            &self.scope,
            self.version.as_deref(),
            &request,
            &mut events,
        );
        debug!(events = events.len(), "get-knowledge finished");
        into_result(events)
    }
}

#[tool_handler]
impl ServerHandler for KnowledgeMcpService {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo {
            instructions: Some(
                "Hyper Context knowledge server. Call get-knowledge-index with document names \
                 to see which knowledge blocks exist, then get-knowledge with block names to \
                 read their content."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        };
        if let Some(name) = &self.server_name {
            info.server_info.name.clone_from(name);
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hctx_core::node::NodeType;
    use rmcp::model::ErrorCode as McpErrorCode;
    use tempfile::TempDir;

    const GUIDE: &str = "<head><name>guide.md</name></head>\
        <extend>\
        <block><name>Usage</name><description>How to use</description><content>call it</content></block>\
        </extend>";

    fn seeded() -> (TempDir, KnowledgeMcpService) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hctx.db");
        let store = SqliteStore::open(&path).unwrap();
        let pid = store.create_project("Demo").unwrap();
        let guide = store.create_node(&pid, None, "guide.md", NodeType::File).unwrap();
        let v = store.create_version(&pid, None, None).unwrap();
        store.set_node_content(&pid, &v.id, &guide.id, GUIDE).unwrap();
        store.publish(&pid, &v.id).unwrap();
        store.mark_stable(&pid, &v.id).unwrap();
        let service = KnowledgeMcpService::new(path, RequestScope::new(pid), None);
        (dir, service)
    }

    fn text(result: &CallToolResult) -> serde_json::Value {
        let value = serde_json::to_value(result).unwrap();
        let raw = value["content"][0]["text"].as_str().unwrap().to_string();
        serde_json::from_str(&raw).unwrap()
    }

    fn names(list: &[&str]) -> Parameters<NamesRequest> {
        Parameters(NamesRequest {
            names: list.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    #[test]
    fn index_tool_returns_summaries() {
        let (_dir, service) = seeded();
        let result = service.knowledge_index(names(&["guide.md", "missing.md"])).unwrap();
        let json = text(&result);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["name"], "guide.md");
        assert_eq!(json[0]["blocks"][0]["name"], "Usage");
        assert_eq!(json[0]["blocks"][0]["description"], "How to use");
        assert!(json[0]["blocks"][0].get("content").is_none());
    }

    #[test]
    fn detail_tool_returns_content() {
        let (_dir, service) = seeded();
        let json = text(&service.knowledge(names(&["Usage"])).unwrap());
        assert_eq!(json[0]["blocks"][0]["content"], "call it");
    }

    #[test]
    fn empty_names_are_invalid_params() {
        let (_dir, service) = seeded();
        let err = service.knowledge_index(names(&[])).unwrap_err();
        assert_eq!(err.code, McpErrorCode::INVALID_PARAMS);
        let err = service.knowledge(names(&[])).unwrap_err();
        assert_eq!(err.code, McpErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn missing_version_is_resource_not_found() {
        let (_dir, mut service) = seeded();
        service.version = Some("draft".to_string());
        let err = service.knowledge(names(&["Usage"])).unwrap_err();
        assert_eq!(err.code, McpErrorCode::RESOURCE_NOT_FOUND);
        assert_eq!(err.message, "No draft version");
    }

    #[test]
    fn server_info_enables_tools() {
        let (_dir, service) = seeded();
        let info = service.get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("get-knowledge-index"));
    }

    #[test]
    fn server_name_is_configurable() {
        let (_dir, service) = seeded();
        let info = service.with_server_name(Some("docs-server".to_string())).get_info();
        assert_eq!(info.server_info.name, "docs-server");
    }
}

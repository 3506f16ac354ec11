//! The two retrieval tools.
//!
//! `get-knowledge-index` summarizes documents (block names and descriptions
//! only). `get-knowledge` returns full block content by block name, either
//! within one document or across every file of the version.
//!
//! Both are stateless: they resolve the version once, reparse raw content on
//! every call, and push their events into an [`EventSink`].
//!
//! The unscoped `get-knowledge` lookup loads and parses every file of the
//! version on each call. There is no pagination and no cached index, so its
//! cost grows with the number of files in the project.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hctx_core::error::{HctxError, Result};
use hctx_core::scope::RequestScope;
use hctx_core::store::KnowledgeStore;
use hctx_parser::document::StructuredDocument;
use hctx_parser::markup::parse_document;

use crate::event::{
    Cancelled, DetailBlock, DetailFile, ErrorCode, EventSink, IndexBlock, IndexFile, Payload,
    Tool, ToolEvent,
};
use crate::name::resolve_name;
use crate::version::resolve_version_id;

/// Arguments of `get-knowledge-index`: one spec or a list of specs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
}

impl IndexRequest {
    pub fn names<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: None,
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// `names` when present, otherwise `[name]`.
    fn specs(&self) -> Vec<&str> {
        match (&self.names, &self.name) {
            (Some(names), _) => names.iter().map(String::as_str).collect(),
            (None, Some(name)) => vec![name.as_str()],
            (None, None) => Vec::new(),
        }
    }
}

/// Arguments of `get-knowledge`: a spec (`path#block` or `name#block`)
/// and/or a list of block names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

impl DetailRequest {
    pub fn keys<I, T>(keys: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            name: None,
            keys: Some(keys.into_iter().map(Into::into).collect()),
        }
    }

    pub fn spec(spec: impl Into<String>) -> Self {
        Self {
            name: Some(spec.into()),
            keys: None,
        }
    }
}

/// Map an engine error onto a terminal event.
fn failure_event(err: &HctxError) -> ToolEvent {
    match err {
        HctxError::NotFound(message) => ToolEvent::error(ErrorCode::NotFound, message.clone()),
        HctxError::InvalidInput(message) => {
            ToolEvent::error(ErrorCode::InvalidInput, message.clone())
        }
        other => {
            warn!(error = %other, "retrieval failed");
            ToolEvent::error(ErrorCode::InternalError, other.to_string())
        }
    }
}

fn load_document<S>(store: &S, version_id: &str, node_id: &str) -> Result<StructuredDocument>
where
    S: KnowledgeStore + ?Sized,
{
    let raw = store.node_content(version_id, node_id)?.unwrap_or_default();
    Ok(parse_document(&raw))
}

fn detail_blocks(doc: &StructuredDocument, keys: &[String]) -> Vec<DetailBlock> {
    doc.blocks_named(keys)
        .map(|b| DetailBlock {
            name: b.name.clone(),
            description: b.description.clone(),
            content: b.content.clone(),
        })
        .collect()
}

/// Stream `get-knowledge-index`.
///
/// Unresolvable and blank specs get a `progress` event but no `data`.
pub fn get_knowledge_index<S, K>(
    store: &S,
    scope: &RequestScope,
    version: Option<&str>,
    request: &IndexRequest,
    sink: &mut K,
) where
    S: KnowledgeStore + ?Sized,
    K: EventSink + ?Sized,
{
    if run_index(store, scope, version, request, sink).is_err() {
        debug!(tool = Tool::KnowledgeIndex.name(), "consumer stopped early");
    }
}

fn run_index<S, K>(
    store: &S,
    scope: &RequestScope,
    version: Option<&str>,
    request: &IndexRequest,
    sink: &mut K,
) -> std::result::Result<(), Cancelled>
where
    S: KnowledgeStore + ?Sized,
    K: EventSink + ?Sized,
{
    sink.emit(ToolEvent::start(Tool::KnowledgeIndex, request))?;

    let specs = request.specs();
    if specs.iter().all(|s| s.trim().is_empty()) {
        return sink.emit(ToolEvent::error(
            ErrorCode::InvalidInput,
            "name or names is required",
        ));
    }

    let version_id = match resolve_version_id(store, scope, version) {
        Ok(id) => id,
        Err(e) => return sink.emit(failure_event(&e)),
    };

    for spec in specs {
        sink.emit(ToolEvent::progress(format!("Resolving {spec}")))?;
        let file = match index_file(store, scope, &version_id, spec) {
            Ok(Some(file)) => file,
            Ok(None) => {
                debug!(spec, "skipping unresolved spec");
                continue;
            }
            Err(e) => return sink.emit(failure_event(&e)),
        };
        sink.emit(ToolEvent::Data {
            data: Payload::Index(file),
        })?;
    }

    sink.emit(ToolEvent::end())
}

fn index_file<S>(
    store: &S,
    scope: &RequestScope,
    version_id: &str,
    spec: &str,
) -> Result<Option<IndexFile>>
where
    S: KnowledgeStore + ?Sized,
{
    let resolved = resolve_name(store, scope, spec)?;
    let (Some(node_id), Some(node_name)) = (resolved.node_id, resolved.node_name) else {
        return Ok(None);
    };
    let doc = load_document(store, version_id, &node_id)?;
    let blocks = doc
        .extend_blocks
        .iter()
        .map(|b| IndexBlock {
            name: b.name.clone(),
            description: b.summary_description(),
        })
        .collect();
    Ok(Some(IndexFile {
        name: node_name,
        blocks,
    }))
}

/// Stream `get-knowledge`.
///
/// A resolvable `name` restricts the lookup to that one document; otherwise
/// every file of the version is scanned in store order.
pub fn get_knowledge<S, K>(
    store: &S,
    scope: &RequestScope,
    version: Option<&str>,
    request: &DetailRequest,
    sink: &mut K,
) where
    S: KnowledgeStore + ?Sized,
    K: EventSink + ?Sized,
{
    if run_detail(store, scope, version, request, sink).is_err() {
        debug!(tool = Tool::Knowledge.name(), "consumer stopped early");
    }
}

/// Keys in first-seen order, blank and whitespace-only keys removed.
fn dedup_keys(keys: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in keys {
        if !key.trim().is_empty() && !out.contains(&key) {
            out.push(key);
        }
    }
    out
}

fn run_detail<S, K>(
    store: &S,
    scope: &RequestScope,
    version: Option<&str>,
    request: &DetailRequest,
    sink: &mut K,
) -> std::result::Result<(), Cancelled>
where
    S: KnowledgeStore + ?Sized,
    K: EventSink + ?Sized,
{
    sink.emit(ToolEvent::start(Tool::Knowledge, request))?;

    let mut seeded = Vec::new();
    let mut target: Option<(String, String)> = None;
    if let Some(name) = request.name.as_deref().filter(|n| !n.trim().is_empty()) {
        match resolve_name(store, scope, name) {
            Ok(resolved) => {
                seeded.extend(resolved.block_name);
                target = resolved.node_id.zip(resolved.node_name);
            }
            Err(e) => return sink.emit(failure_event(&e)),
        }
    }
    let keys = dedup_keys(
        seeded
            .into_iter()
            .chain(request.keys.iter().flatten().cloned()),
    );
    if keys.is_empty() {
        return sink.emit(ToolEvent::error(
            ErrorCode::InvalidInput,
            "name (with #block) or keys[] is required",
        ));
    }

    let version_id = match resolve_version_id(store, scope, version) {
        Ok(id) => id,
        Err(e) => return sink.emit(failure_event(&e)),
    };

    match target {
        Some((node_id, node_name)) => {
            let doc = match load_document(store, &version_id, &node_id) {
                Ok(doc) => doc,
                Err(e) => return sink.emit(failure_event(&e)),
            };
            let blocks = detail_blocks(&doc, &keys);
            if !blocks.is_empty() {
                sink.emit(ToolEvent::Data {
                    data: Payload::Detail(DetailFile {
                        name: node_name,
                        blocks,
                    }),
                })?;
            }
        }
        None => {
            let nodes = match store.list_nodes(&scope.project_id) {
                Ok(nodes) => nodes,
                Err(e) => return sink.emit(failure_event(&e)),
            };
            for node in nodes.into_iter().filter(|n| n.is_file()) {
                let doc = match load_document(store, &version_id, &node.id) {
                    Ok(doc) => doc,
                    Err(e) => return sink.emit(failure_event(&e)),
                };
                let blocks = detail_blocks(&doc, &keys);
                if blocks.is_empty() {
                    continue;
                }
                let name = if doc.head.name.is_empty() {
                    node.name
                } else {
                    doc.head.name
                };
                sink.emit(ToolEvent::Data {
                    data: Payload::Detail(DetailFile { name, blocks }),
                })?;
            }
        }
    }

    sink.emit(ToolEvent::end())
}

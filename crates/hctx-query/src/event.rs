//! Event vocabulary shared by the retrieval tools.
//!
//! Every invocation produces `start`, then any number of `progress` and
//! `data` events, then exactly one terminal event: `end` or `error`.
//! Events are pushed into an [`EventSink`]; a sink that refuses an event
//! stops the producer, which then emits nothing further.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

/// The retrieval tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tool {
    #[serde(rename = "get-knowledge-index")]
    KnowledgeIndex,
    #[serde(rename = "get-knowledge")]
    Knowledge,
}

impl Tool {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::KnowledgeIndex => "get-knowledge-index",
            Self::Knowledge => "get-knowledge",
        }
    }
}

/// Machine-readable error codes carried by terminal `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing arguments.
    InvalidInput,
    /// Version or node absent.
    NotFound,
    /// The store failed while reading.
    InternalError,
}

/// Block summary returned by the index tool. Never carries content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBlock {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    pub name: String,
    pub blocks: Vec<IndexBlock>,
}

/// Full block returned by the detail tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailBlock {
    pub name: String,
    pub description: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFile {
    pub name: String,
    pub blocks: Vec<DetailBlock>,
}

/// Payload of a `data` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Detail(DetailFile),
    Index(IndexFile),
}

impl Payload {
    /// Name of the file record.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Detail(f) => &f.name,
            Self::Index(f) => &f.name,
        }
    }
}

/// One frame of a tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolEvent {
    Start {
        tool: Tool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<serde_json::Value>,
    },
    Progress {
        message: String,
    },
    Data {
        data: Payload,
    },
    End {
        ok: bool,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ToolEvent {
    pub fn start<P: Serialize>(tool: Tool, params: &P) -> Self {
        Self::Start {
            tool,
            params: serde_json::to_value(params).ok(),
        }
    }

    pub fn progress(message: impl Into<String>) -> Self {
        Self::Progress {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn end() -> Self {
        Self::End { ok: true }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// `end` and `error` close the sequence.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End { .. } | Self::Error { .. })
    }
}

/// Returned by a sink that no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Receives events in order.
pub trait EventSink {
    /// Accept one event, or refuse it to stop the producer.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when the consumer has gone away.
    fn emit(&mut self, event: ToolEvent) -> Result<(), Cancelled>;
}

impl EventSink for Vec<ToolEvent> {
    fn emit(&mut self, event: ToolEvent) -> Result<(), Cancelled> {
        self.push(event);
        Ok(())
    }
}

impl EventSink for mpsc::Sender<ToolEvent> {
    fn emit(&mut self, event: ToolEvent) -> Result<(), Cancelled> {
        self.send(event).map_err(|_| Cancelled)
    }
}

impl EventSink for mpsc::SyncSender<ToolEvent> {
    fn emit(&mut self, event: ToolEvent) -> Result<(), Cancelled> {
        self.send(event).map_err(|_| Cancelled)
    }
}

/// A terminal `error` event, or a stream that ended without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl std::fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ToolFailure {}

/// Gather the `data` payloads of an event sequence, stopping at the first
/// terminal event.
///
/// # Errors
///
/// Returns the terminal error, or [`ErrorCode::InternalError`] if the
/// sequence ended without any terminal event.
pub fn collect_data<I>(events: I) -> Result<Vec<Payload>, ToolFailure>
where
    I: IntoIterator<Item = ToolEvent>,
{
    let mut gathered = Vec::new();
    for event in events {
        match event {
            ToolEvent::Data { data } => gathered.push(data),
            ToolEvent::End { .. } => return Ok(gathered),
            ToolEvent::Error { code, message } => return Err(ToolFailure { code, message }),
            ToolEvent::Start { .. } | ToolEvent::Progress { .. } => {}
        }
    }
    Err(ToolFailure {
        code: ErrorCode::InternalError,
        message: "event stream ended without a terminal event".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_data(name: &str) -> ToolEvent {
        ToolEvent::Data {
            data: Payload::Index(IndexFile {
                name: name.to_string(),
                blocks: vec![],
            }),
        }
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let start = ToolEvent::start(Tool::KnowledgeIndex, &serde_json::json!({"names": ["a"]}));
        let json = serde_json::to_value(&start).unwrap();
        assert_eq!(json["type"], "start");
        assert_eq!(json["tool"], "get-knowledge-index");
        assert_eq!(json["params"]["names"][0], "a");

        let err = ToolEvent::error(ErrorCode::NotFound, "No stable version");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "NOT_FOUND");

        let json = serde_json::to_value(ToolEvent::end()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "end", "ok": true}));
    }

    #[test]
    fn payload_deserializes_detail_before_index() {
        let detail: Payload = serde_json::from_value(serde_json::json!({
            "name": "a.md",
            "blocks": [{"name": "b", "description": "d", "content": "c"}]
        }))
        .unwrap();
        assert!(matches!(detail, Payload::Detail(_)));

        let index: Payload = serde_json::from_value(serde_json::json!({
            "name": "a.md",
            "blocks": [{"name": "b", "description": "d"}]
        }))
        .unwrap();
        assert!(matches!(index, Payload::Index(_)));
        assert_eq!(index.name(), "a.md");
    }

    #[test]
    fn collect_data_stops_at_terminal_event() {
        let events = vec![
            ToolEvent::start(Tool::Knowledge, &()),
            ToolEvent::progress("working"),
            index_data("a.md"),
            ToolEvent::end(),
            index_data("ignored.md"),
        ];
        let data = collect_data(events).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].name(), "a.md");
    }

    #[test]
    fn collect_data_surfaces_errors_and_truncation() {
        let failure = collect_data(vec![ToolEvent::error(ErrorCode::InvalidInput, "bad")]).unwrap_err();
        assert_eq!(failure.code, ErrorCode::InvalidInput);
        assert_eq!(failure.message, "bad");

        let failure = collect_data(vec![index_data("a.md")]).unwrap_err();
        assert_eq!(failure.code, ErrorCode::InternalError);
    }

    #[test]
    fn channel_sink_refuses_after_receiver_drops() {
        let (mut tx, rx) = mpsc::channel();
        assert!(tx.emit(ToolEvent::end()).is_ok());
        drop(rx);
        assert_eq!(tx.emit(ToolEvent::end()), Err(Cancelled));
    }

    #[test]
    fn terminal_detection() {
        assert!(ToolEvent::end().is_terminal());
        assert!(ToolEvent::error(ErrorCode::NotFound, "x").is_terminal());
        assert!(!ToolEvent::progress("x").is_terminal());
    }
}

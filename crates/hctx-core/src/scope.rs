//! Per-request scope.
//!
//! Every resolver and engine call receives the scope explicitly. It is built
//! once when a request (or an MCP session) starts and is never mutated.

use serde::{Deserialize, Serialize};

/// The project a request operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestScope {
    pub project_id: String,
}

impl RequestScope {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
        }
    }
}

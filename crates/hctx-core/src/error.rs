//! Error types for Hyper Context.

use thiserror::Error;

/// Top-level result type for Hyper Context operations.
pub type Result<T> = std::result::Result<T, HctxError>;

/// Top-level error type for Hyper Context.
#[derive(Debug, Error)]
pub enum HctxError {
    /// The caller supplied nothing usable (no spec, no key, bad state transition).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A version, node, or project is absent.
    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl HctxError {
    /// Whether this error reports a missing entity rather than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for HctxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

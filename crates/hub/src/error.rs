//! Errors crossing the hub boundary.

use thiserror::Error;

/// Errors returned by hub queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The hub has not established a head block yet.
    #[error("hub has no head block yet")]
    NoHead,

    /// The hub cannot answer queries right now.
    #[error("hub unavailable: {0}")]
    Unavailable(String),
}

/// Error returned by a block handler to stop its source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("block delivery failed: {reason}")]
pub struct HandlerError {
    /// What prevented delivery.
    pub reason: String,
}

impl HandlerError {
    /// Create a handler error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Terminal error of a source run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The delivery handler rejected a block.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// The production pipeline behind the source failed.
    #[error("source failed: {0}")]
    Production(String),
}

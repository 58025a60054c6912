//! Active block production bound to a handler.

use async_trait::async_trait;

use crate::error::SourceError;

/// An active, possibly fork-aware, block production process.
///
/// A source is constructed by a hub, bound to a starting block number and a
/// delivery handler. Running it consumes it: the future resolves exactly
/// once, when production terminates because the mandate is exhausted, the
/// handler returned an error, or the process was cancelled externally.
/// `Ok(())` is a clean stop; `Err` carries the terminal error.
///
/// Sources are never shared or restarted. A consumer that wants to resume
/// after termination opens a fresh source.
#[async_trait]
pub trait Source: Send {
    /// Run block production to completion.
    async fn run(self: Box<Self>) -> Result<(), SourceError>;
}

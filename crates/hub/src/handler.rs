//! Per-block delivery callback bound into a source.

use async_trait::async_trait;

use crate::block::{Block, ForkStep};
use crate::error::HandlerError;

/// Callback invoked by a source once per produced block, in emission order.
///
/// The source awaits each call before producing the next block, so the
/// handler is the back-pressure point of the pipeline: slow consumers slow
/// production down rather than queueing blocks.
#[async_trait]
pub trait BlockHandler: Send + Sync {
    /// Deliver one block. Returning an error stops the source, which
    /// reports it as its terminal error.
    async fn handle_block(
        &self,
        block: &Block,
        step: Option<ForkStep>,
    ) -> Result<(), HandlerError>;
}

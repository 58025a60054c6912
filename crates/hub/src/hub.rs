//! The fork-aware hub facade.

use std::sync::Arc;

use crate::block::HeadInfo;
use crate::error::HubError;
use crate::handler::BlockHandler;
use crate::ready::ReadySignal;
use crate::source::Source;

/// Facade over a fork-aware block hub.
///
/// Implementations synchronize internally; every method is safe to call
/// from concurrent tasks without external locking.
pub trait ForkAwareHub: Send + Sync + 'static {
    /// Current head and irreversible block numbers, computed fresh on
    /// every call.
    fn head_info(&self) -> Result<HeadInfo, HubError>;

    /// Lowest block number the hub still retains. Requests for older
    /// blocks must be clamped to this.
    fn lowest_block_num(&self) -> u64;

    /// Open a fork-aware source starting at `start_num`, delivering
    /// through `handler`. Returns `None` when the hub cannot serve that
    /// start point.
    fn source_from_block_num_with_forks(
        &self,
        start_num: u64,
        handler: Arc<dyn BlockHandler>,
    ) -> Option<Box<dyn Source>>;

    /// Subscription to the hub's one-shot readiness gate. The gate fires
    /// once the hub has loaded enough history to answer queries
    /// meaningfully.
    fn ready(&self) -> ReadySignal;
}

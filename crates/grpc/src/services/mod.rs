//! gRPC service implementations.

mod blocks;
mod head_info;

use std::sync::Arc;

use blockhub::ForkAwareHub;

/// Implementation of both blockstream services over one hub.
///
/// The same value backs the unary head-info query and the streaming block
/// feed; the hub is shared read-only across all concurrent calls.
pub struct BlockstreamService<H> {
    hub: Arc<H>,
}

impl<H: ForkAwareHub> BlockstreamService<H> {
    /// Create a new service over the given hub.
    pub fn new(hub: Arc<H>) -> Self {
        Self { hub }
    }
}

//! In-memory hub and source for exercising hub consumers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::block::{Block, ForkStep, HeadInfo};
use crate::error::{HubError, SourceError};
use crate::handler::BlockHandler;
use crate::hub::ForkAwareHub;
use crate::ready::{ReadyGate, ReadySignal};
use crate::source::Source;

/// Scripted in-memory hub.
///
/// Serves a fixed block list and settable head info; records every
/// requested source start number so tests can assert routing decisions.
pub struct MockHub {
    head: Mutex<Option<HeadInfo>>,
    lowest: AtomicU64,
    blocks: Mutex<Vec<Block>>,
    deny_sources: AtomicBool,
    fail_after_replay: Mutex<Option<String>>,
    requested_starts: Mutex<Vec<u64>>,
    gate: ReadyGate,
}

impl MockHub {
    /// Create an empty hub with an unfired readiness gate.
    pub fn new() -> Self {
        Self {
            head: Mutex::new(None),
            lowest: AtomicU64::new(0),
            blocks: Mutex::new(Vec::new()),
            deny_sources: AtomicBool::new(false),
            fail_after_replay: Mutex::new(None),
            requested_starts: Mutex::new(Vec::new()),
            gate: ReadyGate::new(),
        }
    }

    /// Set the head info returned by [`ForkAwareHub::head_info`].
    pub fn set_head_info(&self, info: HeadInfo) {
        *self.head.lock().expect("mock state lock poisoned") = Some(info);
    }

    /// Drop head info; subsequent queries fail with [`HubError::NoHead`].
    pub fn clear_head_info(&self) {
        *self.head.lock().expect("mock state lock poisoned") = None;
    }

    /// Set the lowest retained block number.
    pub fn set_lowest_block_num(&self, num: u64) {
        self.lowest.store(num, Ordering::SeqCst);
    }

    /// Append a block to the scripted list.
    pub fn push_block(&self, block: Block) {
        self.blocks.lock().expect("mock state lock poisoned").push(block);
    }

    /// When set, every source request returns `None`.
    pub fn deny_sources(&self, deny: bool) {
        self.deny_sources.store(deny, Ordering::SeqCst);
    }

    /// When set, sources fail with this production error after replaying
    /// their scripted blocks.
    pub fn fail_sources_after_replay(&self, reason: impl Into<String>) {
        *self.fail_after_replay.lock().expect("mock state lock poisoned") = Some(reason.into());
    }

    /// Start numbers of every source requested so far, in request order.
    pub fn requested_starts(&self) -> Vec<u64> {
        self.requested_starts
            .lock()
            .expect("mock state lock poisoned")
            .clone()
    }

    /// Fire the readiness gate.
    pub fn set_ready(&self) {
        self.gate.set_ready();
    }
}

impl Default for MockHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ForkAwareHub for MockHub {
    fn head_info(&self) -> Result<HeadInfo, HubError> {
        self.head
            .lock()
            .expect("mock state lock poisoned")
            .clone()
            .ok_or(HubError::NoHead)
    }

    fn lowest_block_num(&self) -> u64 {
        self.lowest.load(Ordering::SeqCst)
    }

    fn source_from_block_num_with_forks(
        &self,
        start_num: u64,
        handler: Arc<dyn BlockHandler>,
    ) -> Option<Box<dyn Source>> {
        self.requested_starts
            .lock()
            .expect("mock state lock poisoned")
            .push(start_num);

        if self.deny_sources.load(Ordering::SeqCst) {
            return None;
        }

        let blocks: Vec<Block> = self
            .blocks
            .lock()
            .expect("mock state lock poisoned")
            .iter()
            .filter(|b| b.num >= start_num)
            .cloned()
            .collect();
        let fail_with = self
            .fail_after_replay
            .lock()
            .expect("mock state lock poisoned")
            .clone();

        Some(Box::new(VecSource {
            blocks,
            handler,
            fail_with,
        }))
    }

    fn ready(&self) -> ReadySignal {
        self.gate.subscribe()
    }
}

/// Source that replays a fixed block list in order through its handler.
pub struct VecSource {
    blocks: Vec<Block>,
    handler: Arc<dyn BlockHandler>,
    fail_with: Option<String>,
}

impl VecSource {
    /// Create a source replaying `blocks` through `handler`.
    pub fn new(blocks: Vec<Block>, handler: Arc<dyn BlockHandler>) -> Self {
        Self {
            blocks,
            handler,
            fail_with: None,
        }
    }
}

#[async_trait]
impl Source for VecSource {
    async fn run(self: Box<Self>) -> Result<(), SourceError> {
        for block in &self.blocks {
            tracing::debug!("replaying block {}", block.num);
            self.handler.handle_block(block, Some(ForkStep::New)).await?;
        }
        match self.fail_with {
            Some(reason) => Err(SourceError::Production(reason)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::SystemTime;

    use crate::error::HandlerError;

    use super::*;

    fn block(num: u64) -> Block {
        Block {
            num,
            id: format!("{num:08x}aa"),
            previous_id: format!("{:08x}aa", num.saturating_sub(1)),
            timestamp: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(num),
            lib_num: num.saturating_sub(10),
            payload: bytes::Bytes::from_static(b"payload"),
        }
    }

    struct CountingHandler {
        delivered: AtomicUsize,
        fail_at: Option<usize>,
    }

    #[async_trait]
    impl BlockHandler for CountingHandler {
        async fn handle_block(
            &self,
            _block: &Block,
            _step: Option<ForkStep>,
        ) -> Result<(), HandlerError> {
            let n = self.delivered.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(n) == self.fail_at {
                return Err(HandlerError::new("refused"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn replays_blocks_at_or_above_start_in_order() {
        let hub = MockHub::new();
        for n in 1..=5 {
            hub.push_block(block(n));
        }

        struct Recorder(Mutex<Vec<u64>>);

        #[async_trait]
        impl BlockHandler for Recorder {
            async fn handle_block(
                &self,
                block: &Block,
                _step: Option<ForkStep>,
            ) -> Result<(), HandlerError> {
                self.0.lock().expect("lock poisoned").push(block.num);
                Ok(())
            }
        }

        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let source = hub
            .source_from_block_num_with_forks(3, recorder.clone())
            .expect("source should be available");
        source.run().await.expect("replay should succeed");

        assert_eq!(*recorder.0.lock().expect("lock poisoned"), vec![3, 4, 5]);
        assert_eq!(hub.requested_starts(), vec![3]);
    }

    #[tokio::test]
    async fn handler_error_stops_replay() {
        let hub = MockHub::new();
        for n in 1..=5 {
            hub.push_block(block(n));
        }

        let handler = Arc::new(CountingHandler {
            delivered: AtomicUsize::new(0),
            fail_at: Some(2),
        });
        let source = hub
            .source_from_block_num_with_forks(1, handler.clone())
            .expect("source should be available");
        let err = source.run().await.expect_err("replay should stop");

        assert!(matches!(err, SourceError::Handler(_)));
        // Nothing delivered past the refusal.
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn scripted_production_failure_surfaces_after_replay() {
        let hub = MockHub::new();
        hub.push_block(block(1));
        hub.fail_sources_after_replay("buffer torn down");

        let handler = Arc::new(CountingHandler {
            delivered: AtomicUsize::new(0),
            fail_at: None,
        });
        let source = hub
            .source_from_block_num_with_forks(0, handler.clone())
            .expect("source should be available");
        let err = source.run().await.expect_err("source should fail");

        assert_eq!(err, SourceError::Production("buffer torn down".into()));
        assert_eq!(handler.delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn denied_hub_returns_no_source() {
        let hub = MockHub::new();
        hub.deny_sources(true);

        let handler = Arc::new(CountingHandler {
            delivered: AtomicUsize::new(0),
            fail_at: None,
        });
        assert!(hub.source_from_block_num_with_forks(1, handler).is_none());
        assert_eq!(hub.requested_starts(), vec![1]);
    }
}

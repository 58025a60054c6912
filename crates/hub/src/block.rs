//! Value types crossing the hub boundary.

use std::time::SystemTime;

use bytes::Bytes;

/// A snapshot of the hub's view of the chain tip.
///
/// Produced fresh on every query; never cached by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadInfo {
    /// Number of the current canonical head block.
    pub head_num: u64,
    /// ID of the current canonical head block.
    pub head_id: String,
    /// Timestamp of the current canonical head block.
    pub head_time: SystemTime,
    /// Highest block number guaranteed never to be reverted by a fork.
    pub lib_num: u64,
}

/// A single block as retained by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block number/height.
    pub num: u64,
    /// Block ID.
    pub id: String,
    /// ID of the parent block.
    pub previous_id: String,
    /// Block timestamp.
    pub timestamp: SystemTime,
    /// Irreversible block number as of this block.
    pub lib_num: u64,
    /// Opaque chain-specific block contents. This layer never interprets
    /// the payload.
    pub payload: Bytes,
}

/// Side-channel metadata a fork-aware source may attach to a delivery.
///
/// Handlers that only forward blocks may ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkStep {
    /// Block newly applied to the canonical chain.
    New,
    /// Block unapplied by a chain reorganization.
    Undo,
    /// Block passed the irreversibility threshold.
    Irreversible,
}

//! Fork-aware block hub boundary.
//!
//! A block hub tracks the canonical chain head, the irreversible (library)
//! block number and a window of recent fork history. Consumers never touch
//! that machinery directly: they query head info, ask for the lowest block
//! still retained, and open a [`Source`] bound to a starting block number
//! and a per-block [`BlockHandler`]. The source then drives delivery on its
//! own, fork-aware, until it is exhausted, the handler refuses a block, or
//! it is cancelled externally.
//!
//! This crate defines only that boundary: the traits, the value types that
//! cross it, the one-shot readiness gate hubs expose, and an in-memory
//! scripted hub for testing consumers without real fork logic.

pub mod block;
pub mod error;
pub mod handler;
pub mod hub;
pub mod ready;
pub mod source;
pub mod testing;

pub use block::{Block, ForkStep, HeadInfo};
pub use error::{HandlerError, HubError, SourceError};
pub use handler::BlockHandler;
pub use hub::ForkAwareHub;
pub use ready::{ReadyGate, ReadySignal};
pub use source::Source;

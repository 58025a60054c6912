//! gRPC surface over a fork-aware block hub.
//!
//! Exposes two services on one server: a unary head-info query and a
//! server-streaming block feed. The streaming request's signed `burst`
//! parameter selects the starting point (live-tail from the irreversible
//! block, an absolute block number, or an offset behind the head); from
//! there the hub's fork-aware source drives delivery until it is exhausted
//! or the peer goes away. Serving is gated on the hub's readiness signal.
//!
//! The hub itself (fork choice, block retention, production) lives behind
//! the [`blockhub::ForkAwareHub`] trait; this crate is only the protocol
//! translation between that boundary and the wire.

pub mod conversion;
pub mod error;
pub mod server;
pub mod services;

// Generated protobuf types, vendored tonic-build output for proto/.
pub mod proto {
    pub mod blockhub {
        pub mod v1 {
            include!("generated/blockhub.v1.rs");
        }
    }
}

pub use error::BlockstreamError;
pub use server::{BlockstreamServer, BlockstreamServerConfig};
pub use services::BlockstreamService;

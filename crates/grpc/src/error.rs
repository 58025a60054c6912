//! Adapter error types and conversion to tonic::Status.

use blockhub::{HubError, SourceError};
use thiserror::Error;
use tonic::Status;

use crate::conversion::ConversionError;

/// Errors terminating a blockstream RPC.
///
/// None of these are retried here; retry policy belongs to the hub or to
/// the client.
#[derive(Debug, Error)]
pub enum BlockstreamError {
    /// Head info could not be retrieved; the hub's own error is surfaced
    /// verbatim.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The hub could not open a source for the request.
    #[error("no source available for request (requester: {requester:?}, burst: {burst})")]
    NoSource {
        /// Requester label from the original request.
        requester: String,
        /// Burst directive from the original request.
        burst: i64,
    },

    /// Block delivery terminated with an error.
    #[error(transparent)]
    Delivery(#[from] SourceError),

    /// A value could not be rendered in its wire form.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl From<BlockstreamError> for Status {
    fn from(err: BlockstreamError) -> Self {
        match err {
            BlockstreamError::Hub(e) => Status::unavailable(e.to_string()),
            e @ BlockstreamError::NoSource { .. } => Status::not_found(e.to_string()),
            BlockstreamError::Delivery(e) => Status::aborted(e.to_string()),
            BlockstreamError::Conversion(e) => Status::internal(e.to_string()),
        }
    }
}

/// Result type for blockstream operations.
pub type BlockstreamResult<T> = Result<T, BlockstreamError>;

//! Conversion between hub types and protobuf types.

use std::time::{SystemTime, UNIX_EPOCH};

use blockhub::{Block, HeadInfo};
use thiserror::Error;

use crate::proto::blockhub::v1 as proto;

/// Failure to render an internal value in its wire form.
///
/// The hub only retains blocks it accepted from the chain, so an
/// inconvertible block means corrupt data upstream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The timestamp predates the unix epoch and has no protobuf form.
    #[error("timestamp predates the unix epoch")]
    TimestampOutOfRange,
}

/// Convert a timestamp to its protobuf form.
pub fn timestamp_to_proto(t: SystemTime) -> Result<prost_types::Timestamp, ConversionError> {
    let since_epoch = t
        .duration_since(UNIX_EPOCH)
        .map_err(|_| ConversionError::TimestampOutOfRange)?;
    Ok(prost_types::Timestamp {
        seconds: since_epoch.as_secs() as i64,
        nanos: since_epoch.subsec_nanos() as i32,
    })
}

/// Convert a hub block to its wire form.
pub fn block_to_proto(block: &Block) -> Result<proto::Block, ConversionError> {
    Ok(proto::Block {
        num: block.num,
        id: block.id.clone(),
        previous_id: block.previous_id.clone(),
        timestamp: Some(timestamp_to_proto(block.timestamp)?),
        lib_num: block.lib_num,
        payload: block.payload.to_vec(),
    })
}

/// Convert hub head info to the wire response.
pub fn head_info_to_proto(info: &HeadInfo) -> Result<proto::HeadInfoResponse, ConversionError> {
    Ok(proto::HeadInfoResponse {
        lib_num: info.lib_num,
        head_num: info.head_num,
        head_id: info.head_id.clone(),
        head_time: Some(timestamp_to_proto(info.head_time)?),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;

    #[test]
    fn converts_block_fields() {
        let block = Block {
            num: 42,
            id: "0042aa".to_string(),
            previous_id: "0041aa".to_string(),
            timestamp: UNIX_EPOCH + Duration::new(1_700_000_000, 250),
            lib_num: 30,
            payload: Bytes::from_static(b"contents"),
        };

        let wire = block_to_proto(&block).expect("block should convert");
        assert_eq!(wire.num, 42);
        assert_eq!(wire.id, "0042aa");
        assert_eq!(wire.previous_id, "0041aa");
        assert_eq!(wire.lib_num, 30);
        assert_eq!(wire.payload, b"contents");
        let ts = wire.timestamp.expect("timestamp should be set");
        assert_eq!(ts.seconds, 1_700_000_000);
        assert_eq!(ts.nanos, 250);
    }

    #[test]
    fn pre_epoch_timestamp_has_no_wire_form() {
        let t = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(
            timestamp_to_proto(t),
            Err(ConversionError::TimestampOutOfRange)
        );
    }
}

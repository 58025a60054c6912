//! Example: serving a scripted hub over the blockstream gRPC surface.
//!
//! Boots the server on 127.0.0.1:9015 with a handful of synthetic blocks,
//! then answers head-info queries and block streams until interrupted.
//!
//! Run with:
//! ```bash
//! cargo run --example run_server -p blockhub-grpc
//! ```
//!
//! Then, for instance:
//! ```bash
//! grpcurl -plaintext -d '{"burst": -1}' 127.0.0.1:9015 blockhub.v1.BlockStream/Blocks
//! ```

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use blockhub::testing::MockHub;
use blockhub::{Block, HeadInfo};
use blockhub_grpc::{BlockstreamServer, BlockstreamServerConfig};
use bytes::Bytes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let hub = Arc::new(MockHub::new());
    for num in 90..=100u64 {
        hub.push_block(Block {
            num,
            id: format!("{num:08x}aa"),
            previous_id: format!("{:08x}aa", num - 1),
            timestamp: UNIX_EPOCH + Duration::from_secs(1_700_000_000 + num),
            lib_num: num.saturating_sub(10),
            payload: Bytes::from_static(b"example payload"),
        });
    }
    hub.set_head_info(HeadInfo {
        head_num: 100,
        head_id: format!("{:08x}aa", 100u64),
        head_time: UNIX_EPOCH + Duration::from_secs(1_700_000_100),
        lib_num: 90,
    });
    hub.set_lowest_block_num(90);
    hub.set_ready();

    let config = BlockstreamServerConfig::default();
    tracing::info!("Serving scripted hub on {}", config.addr);
    BlockstreamServer::new(config, hub).serve().await?;
    Ok(())
}

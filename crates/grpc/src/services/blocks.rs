//! Server-streaming block feed: request routing and delivery.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use blockhub::{Block, BlockHandler, ForkAwareHub, ForkStep, HandlerError};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::conversion::block_to_proto;
use crate::error::BlockstreamError;
use crate::proto::blockhub::v1::{self as proto, block_stream_server::BlockStream};

use super::BlockstreamService;

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Map a burst directive onto a concrete starting block number.
///
/// `-1` tails from the irreversible block. Below `-1`, the magnitude is an
/// absolute block number. `0` and above is an offset behind the current
/// head. Absolute and offset starts clamp to the lowest block the hub
/// still retains.
fn resolve_start_block<H: ForkAwareHub>(hub: &H, burst: i64) -> Result<u64, BlockstreamError> {
    if burst == -1 {
        return Ok(hub.head_info()?.lib_num);
    }
    let desired = if burst < -1 {
        burst.unsigned_abs()
    } else {
        // An offset reaching past genesis clamps instead of wrapping.
        hub.head_info()?.head_num.saturating_sub(burst as u64)
    };
    Ok(desired.max(hub.lowest_block_num()))
}

/// Bridges a source onto the outbound RPC stream.
///
/// The channel capacity keeps exactly one converted block in flight: the
/// source's next delivery waits until the transport has taken the previous
/// one.
struct StreamHandler {
    tx: mpsc::Sender<Result<proto::Block, Status>>,
    requester: String,
}

#[async_trait]
impl BlockHandler for StreamHandler {
    async fn handle_block(&self, block: &Block, _step: Option<ForkStep>) -> Result<(), HandlerError> {
        // A block the hub retained must have a wire form; anything else is
        // corrupt data upstream and must not be dropped silently.
        let wire = block_to_proto(block)
            .unwrap_or_else(|err| panic!("block {} has no wire form: {err}", block.num));

        self.tx
            .send(Ok(wire))
            .await
            .map_err(|_| HandlerError::new("block stream consumer is gone"))?;
        tracing::debug!(requester = %self.requester, "sent block {} to stream", block.num);
        Ok(())
    }
}

#[async_trait]
impl<H: ForkAwareHub> BlockStream for BlockstreamService<H> {
    type BlocksStream = ResponseStream<proto::Block>;

    async fn blocks(
        &self,
        request: Request<proto::BlockRequest>,
    ) -> Result<Response<Self::BlocksStream>, Status> {
        let req = request.into_inner();
        tracing::info!(requester = %req.requester, burst = req.burst, "receive block request");

        let start_num = resolve_start_block(self.hub.as_ref(), req.burst).map_err(Status::from)?;

        let (tx, rx) = mpsc::channel(1);
        let handler = Arc::new(StreamHandler {
            tx: tx.clone(),
            requester: req.requester.clone(),
        });

        let source = self
            .hub
            .source_from_block_num_with_forks(start_num, handler)
            .ok_or_else(|| {
                Status::from(BlockstreamError::NoSource {
                    requester: req.requester.clone(),
                    burst: req.burst,
                })
            })?;

        // The session owns exactly one source and never retries it; the
        // terminal error, if any, becomes the final stream item.
        tokio::spawn(async move {
            if let Err(err) = source.run().await {
                tracing::warn!(requester = %req.requester, "block stream terminated: {}", err);
                let _ = tx
                    .send(Err(Status::from(BlockstreamError::Delivery(err))))
                    .await;
            }
        });

        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use blockhub::testing::MockHub;
    use blockhub::HeadInfo;
    use bytes::Bytes;
    use tokio_stream::StreamExt;

    use super::*;

    fn block(num: u64) -> Block {
        Block {
            num,
            id: format!("{num:08x}aa"),
            previous_id: format!("{:08x}aa", num.saturating_sub(1)),
            timestamp: UNIX_EPOCH + Duration::from_secs(1_700_000_000 + num),
            lib_num: num.saturating_sub(10),
            payload: Bytes::from_static(b"payload"),
        }
    }

    fn hub_at(head_num: u64, lib_num: u64, lowest: u64) -> Arc<MockHub> {
        let hub = Arc::new(MockHub::new());
        hub.set_head_info(HeadInfo {
            head_num,
            head_id: format!("{head_num:08x}aa"),
            head_time: UNIX_EPOCH + Duration::from_secs(1_700_000_000 + head_num),
            lib_num,
        });
        hub.set_lowest_block_num(lowest);
        hub
    }

    #[tokio::test]
    async fn burst_selects_the_starting_block() {
        let hub = hub_at(100, 80, 50);
        let service = BlockstreamService::new(Arc::clone(&hub));

        for burst in [-1, -40, 30, 200] {
            service
                .blocks(Request::new(proto::BlockRequest {
                    burst,
                    requester: "routing-test".to_string(),
                }))
                .await
                .expect("request should open a stream");
        }

        // -1 -> lib; -40 -> max(40, 50); 30 -> max(100-30, 50);
        // 200 -> offset past genesis, clamped to lowest.
        assert_eq!(hub.requested_starts(), vec![80, 50, 70, 50]);
    }

    #[tokio::test]
    async fn extreme_negative_burst_does_not_overflow() {
        let hub = hub_at(100, 80, 50);
        let service = BlockstreamService::new(Arc::clone(&hub));

        service
            .blocks(Request::new(proto::BlockRequest {
                burst: i64::MIN,
                requester: "overflow-test".to_string(),
            }))
            .await
            .expect("request should open a stream");

        assert_eq!(hub.requested_starts(), vec![i64::MIN.unsigned_abs()]);
    }

    #[tokio::test]
    async fn absolute_burst_does_not_need_head_info() {
        let hub = Arc::new(MockHub::new());
        hub.set_lowest_block_num(50);
        let service = BlockstreamService::new(Arc::clone(&hub));

        service
            .blocks(Request::new(proto::BlockRequest {
                burst: -70,
                requester: "absolute-test".to_string(),
            }))
            .await
            .expect("absolute start must not query head info");

        assert_eq!(hub.requested_starts(), vec![70]);
    }

    #[tokio::test]
    async fn head_info_failure_fails_the_request_before_any_source() {
        let hub = Arc::new(MockHub::new());
        let service = BlockstreamService::new(Arc::clone(&hub));

        for burst in [-1, 0, 30] {
            let status = service
                .blocks(Request::new(proto::BlockRequest {
                    burst,
                    requester: "no-head-test".to_string(),
                }))
                .await
                .err()
                .expect("request should fail without head info");
            assert_eq!(status.code(), tonic::Code::Unavailable);
            assert_eq!(status.message(), "hub has no head block yet");
        }

        assert!(hub.requested_starts().is_empty());
    }

    #[tokio::test]
    async fn denied_source_fails_with_the_original_request() {
        let hub = hub_at(100, 80, 50);
        hub.deny_sources(true);
        let service = BlockstreamService::new(Arc::clone(&hub));

        let status = service
            .blocks(Request::new(proto::BlockRequest {
                burst: 30,
                requester: "denied-test".to_string(),
            }))
            .await
            .err()
            .expect("request should fail without a source");

        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("no source available"));
        assert!(status.message().contains("denied-test"));
        assert!(status.message().contains("30"));
    }

    #[tokio::test]
    async fn blocks_arrive_in_emission_order_then_the_stream_closes() {
        let hub = hub_at(82, 80, 50);
        for n in 78..=82 {
            hub.push_block(block(n));
        }
        let service = BlockstreamService::new(Arc::clone(&hub));

        let mut stream = service
            .blocks(Request::new(proto::BlockRequest {
                burst: -1,
                requester: "order-test".to_string(),
            }))
            .await
            .expect("request should open a stream")
            .into_inner();

        let mut nums = Vec::new();
        while let Some(item) = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should make progress")
        {
            nums.push(item.expect("stream item should be ok").num);
        }
        assert_eq!(nums, vec![80, 81, 82]);
    }

    #[tokio::test]
    async fn source_terminal_error_is_the_final_stream_item() {
        let hub = hub_at(82, 80, 50);
        hub.push_block(block(81));
        hub.push_block(block(82));
        hub.fail_sources_after_replay("buffer torn down");
        let service = BlockstreamService::new(Arc::clone(&hub));

        let mut stream = service
            .blocks(Request::new(proto::BlockRequest {
                burst: 1,
                requester: "error-test".to_string(),
            }))
            .await
            .expect("request should open a stream")
            .into_inner();

        let first = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should yield")
            .expect("stream should not end yet")
            .expect("first item should be a block");
        assert_eq!(first.num, 81);

        let second = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should yield")
            .expect("stream should not end yet")
            .expect("second item should be a block");
        assert_eq!(second.num, 82);

        let status = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should yield")
            .expect("terminal status should arrive before the close")
            .expect_err("final item should be the terminal error");
        assert_eq!(status.code(), tonic::Code::Aborted);
        assert!(status.message().contains("buffer torn down"));

        let end = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream should close");
        assert!(end.is_none(), "nothing may follow the terminal error");
    }

    #[tokio::test]
    async fn dropped_consumer_stops_the_source() {
        let (tx, rx) = mpsc::channel(1);
        let handler = StreamHandler {
            tx,
            requester: "gone-test".to_string(),
        };
        drop(rx);

        let err = handler
            .handle_block(&block(1), Some(ForkStep::New))
            .await
            .expect_err("send to a gone consumer must fail");
        assert_eq!(err, HandlerError::new("block stream consumer is gone"));
    }

    #[test]
    fn resolve_start_block_scenarios() {
        let hub = hub_at(100, 80, 50);
        assert_eq!(resolve_start_block(hub.as_ref(), -1).unwrap(), 80);
        assert_eq!(resolve_start_block(hub.as_ref(), -40).unwrap(), 50);
        assert_eq!(resolve_start_block(hub.as_ref(), -60).unwrap(), 60);
        assert_eq!(resolve_start_block(hub.as_ref(), 0).unwrap(), 100);
        assert_eq!(resolve_start_block(hub.as_ref(), 30).unwrap(), 70);
        assert_eq!(resolve_start_block(hub.as_ref(), 200).unwrap(), 50);
    }

    #[test]
    fn unconvertible_block_panics_in_the_handler() {
        let result = std::panic::catch_unwind(|| {
            let corrupt = Block {
                timestamp: UNIX_EPOCH - Duration::from_secs(1),
                ..block(9)
            };
            // Conversion happens before any send; the panic is the point.
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime should build");
            rt.block_on(async {
                let (tx, _rx) = mpsc::channel(1);
                let handler = StreamHandler {
                    tx,
                    requester: "corrupt-test".to_string(),
                };
                let _ = handler.handle_block(&corrupt, None).await;
            });
        });
        assert!(result.is_err(), "corrupt block must abort the handler");
    }
}

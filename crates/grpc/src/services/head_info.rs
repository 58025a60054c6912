//! Unary head-info query.

use async_trait::async_trait;
use blockhub::ForkAwareHub;
use tonic::{Request, Response, Status};

use crate::conversion::head_info_to_proto;
use crate::error::BlockstreamError;
use crate::proto::blockhub::v1::{self as proto, head_info_server::HeadInfo};

use super::BlockstreamService;

#[async_trait]
impl<H: ForkAwareHub> HeadInfo for BlockstreamService<H> {
    async fn get_head_info(
        &self,
        _request: Request<proto::HeadInfoRequest>,
    ) -> Result<Response<proto::HeadInfoResponse>, Status> {
        // Fresh hub query on every call; the hub's error is the call error.
        let info = self.hub.head_info().map_err(BlockstreamError::from)?;
        let resp = head_info_to_proto(&info).map_err(BlockstreamError::from)?;
        Ok(Response::new(resp))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, UNIX_EPOCH};

    use blockhub::testing::MockHub;
    use blockhub::HeadInfo as HubHeadInfo;

    use super::*;

    #[tokio::test]
    async fn reflects_current_hub_view() {
        let hub = Arc::new(MockHub::new());
        hub.set_head_info(HubHeadInfo {
            head_num: 100,
            head_id: "0064aa".to_string(),
            head_time: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            lib_num: 80,
        });

        let service = BlockstreamService::new(Arc::clone(&hub));
        let resp = service
            .get_head_info(Request::new(proto::HeadInfoRequest {}))
            .await
            .expect("head info should succeed")
            .into_inner();

        assert_eq!(resp.head_num, 100);
        assert_eq!(resp.head_id, "0064aa");
        assert_eq!(resp.lib_num, 80);
        assert_eq!(
            resp.head_time.expect("head time should be set").seconds,
            1_700_000_000
        );

        // No caching: a head change is visible on the next call.
        hub.set_head_info(HubHeadInfo {
            head_num: 101,
            head_id: "0065aa".to_string(),
            head_time: UNIX_EPOCH + Duration::from_secs(1_700_000_001),
            lib_num: 81,
        });
        let resp = service
            .get_head_info(Request::new(proto::HeadInfoRequest {}))
            .await
            .expect("head info should succeed")
            .into_inner();
        assert_eq!(resp.head_num, 101);
    }

    #[tokio::test]
    async fn surfaces_hub_error_verbatim() {
        let hub = Arc::new(MockHub::new());
        let service = BlockstreamService::new(hub);

        let status = service
            .get_head_info(Request::new(proto::HeadInfoRequest {}))
            .await
            .expect_err("head info should fail without a head");

        assert_eq!(status.code(), tonic::Code::Unavailable);
        assert_eq!(status.message(), "hub has no head block yet");
    }
}

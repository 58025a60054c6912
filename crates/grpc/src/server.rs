//! Server startup, readiness gating and lifecycle.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use blockhub::ForkAwareHub;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::CompressionEncoding;
use tonic::transport::server::Router;
use tonic::transport::Server;

use crate::proto::blockhub::v1::{
    block_stream_server::BlockStreamServer, head_info_server::HeadInfoServer,
};
use crate::services::BlockstreamService;

/// Configuration for the blockstream server.
#[derive(Debug, Clone)]
pub struct BlockstreamServerConfig {
    /// Address to bind the gRPC server to.
    pub addr: SocketAddr,
    /// Enable gzip compression.
    pub enable_gzip: bool,
}

impl Default for BlockstreamServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 9015)),
            enable_gzip: true,
        }
    }
}

/// The blockstream gRPC server.
///
/// Every serve variant waits on the hub's readiness gate before the
/// transport starts accepting connections: no call is answered, and no
/// block produced, before the hub has loaded enough history to answer
/// meaningfully.
pub struct BlockstreamServer<H: ForkAwareHub> {
    config: BlockstreamServerConfig,
    hub: Arc<H>,
}

impl<H: ForkAwareHub> BlockstreamServer<H> {
    /// Create a new server over the given hub.
    pub fn new(config: BlockstreamServerConfig, hub: Arc<H>) -> Self {
        Self { config, hub }
    }

    /// Serve until the transport stops.
    pub async fn serve(self) -> Result<(), tonic::transport::Error> {
        let addr = self.config.addr;
        self.wait_ready().await;
        tracing::info!("Starting blockstream server on {}", addr);
        self.router().serve(addr).await
    }

    /// Serve until `signal` resolves, then stop accepting and drain
    /// in-flight RPCs.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.config.addr;
        self.wait_ready().await;
        tracing::info!("Starting blockstream server on {}", addr);
        self.router().serve_with_shutdown(addr, signal).await
    }

    /// Serve on a pre-bound listener (ephemeral ports, socket activation).
    /// The configured bind address is ignored.
    pub async fn serve_with_incoming(
        self,
        listener: TcpListener,
    ) -> Result<(), tonic::transport::Error> {
        self.wait_ready().await;
        tracing::info!("Starting blockstream server on {:?}", listener.local_addr());
        self.router()
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
    }

    /// [`Self::serve_with_incoming`] with graceful shutdown on `signal`.
    pub async fn serve_with_incoming_shutdown<F>(
        self,
        listener: TcpListener,
        signal: F,
    ) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()> + Send,
    {
        self.wait_ready().await;
        tracing::info!("Starting blockstream server on {:?}", listener.local_addr());
        self.router()
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
    }

    async fn wait_ready(&self) {
        let mut ready = self.hub.ready();
        if !ready.is_ready() {
            tracing::info!("Waiting for hub readiness before serving");
        }
        ready.wait().await;
    }

    fn router(&self) -> Router {
        let service = Arc::new(BlockstreamService::new(Arc::clone(&self.hub)));

        let mut head_info = HeadInfoServer::from_arc(Arc::clone(&service));
        let mut block_stream = BlockStreamServer::from_arc(service);
        if self.config.enable_gzip {
            head_info = head_info
                .accept_compressed(CompressionEncoding::Gzip)
                .send_compressed(CompressionEncoding::Gzip);
            block_stream = block_stream
                .accept_compressed(CompressionEncoding::Gzip)
                .send_compressed(CompressionEncoding::Gzip);
        }

        Server::builder()
            .add_service(head_info)
            .add_service(block_stream)
    }
}

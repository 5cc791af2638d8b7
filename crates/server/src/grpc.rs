//! gRPC server implementation using Tonic
//!
//! The server binds its own listener so an ephemeral port (0) can be used and
//! the real address reported through [`Server::address`].

use async_trait::async_trait;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::traits::Server;

/// Runs a tonic router on an already bound listener until the token fires.
type TonicServerFn = Box<
    dyn Fn(TcpListener, CancellationToken) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>
        + Send
        + Sync,
>;

/// gRPC server hosting tonic services
///
/// Build it with [`GrpcServerBuilder`].
#[derive(Clone)]
pub struct GrpcServer {
    config: ServerConfig,
    tonic_runner: Option<Arc<TonicServerFn>>,
    running: Arc<AtomicBool>,
    bound_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl GrpcServer {
    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Check if this server has tonic services configured
    pub fn has_services(&self) -> bool {
        self.tonic_runner.is_some()
    }

    fn stopped(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;
    }
}

#[async_trait]
impl Server for GrpcServer {
    fn name(&self) -> &str {
        "grpc"
    }

    fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let runner = self
            .tonic_runner
            .as_ref()
            .ok_or_else(|| ServerError::ConfigError("no gRPC services registered".into()))?;

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }

        let addr = match self.config.grpc_addr() {
            Ok(addr) => addr,
            Err(e) => {
                self.stopped();
                return Err(e);
            }
        };

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.stopped();
                return Err(ServerError::bind(addr.to_string(), e));
            }
        };

        let local_addr = listener.local_addr()?;
        *self.bound_addr.write() = Some(local_addr);
        info!(%local_addr, "gRPC server listening");

        let result = runner(listener, shutdown_token).await;

        self.stopped();
        info!("gRPC server shutdown complete");
        result
    }
}

/// Builder for creating a gRPC server with tonic services.
///
/// ```ignore
/// let server = GrpcServerBuilder::new(config)
///     .with_tonic_server(move |mut b| b.add_service(TraderServer::new(service.clone())))
///     .build();
/// ```
pub struct GrpcServerBuilder {
    config: ServerConfig,
    tonic_runner: Option<Arc<TonicServerFn>>,
}

impl GrpcServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            tonic_runner: None,
        }
    }

    /// Configure the tonic server with services.
    ///
    /// `setup_fn` receives `tonic::transport::Server::builder()` and returns
    /// the router with services added. It is called on every `run`.
    pub fn with_tonic_server<F>(mut self, setup_fn: F) -> Self
    where
        F: Fn(tonic::transport::Server) -> tonic::transport::server::Router + Send + Sync + 'static,
    {
        let setup = Arc::new(setup_fn);

        let runner: TonicServerFn = Box::new(move |listener: TcpListener, shutdown_token: CancellationToken| {
            let setup = setup.clone();
            Box::pin(async move {
                let router = setup(tonic::transport::Server::builder());
                router
                    .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                        shutdown_token.cancelled().await;
                    })
                    .await?;
                Ok(())
            })
        });

        self.tonic_runner = Some(Arc::new(runner));
        self
    }

    pub fn build(self) -> GrpcServer {
        GrpcServer {
            config: self.config,
            tonic_runner: self.tonic_runner,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(RwLock::new(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ServerExt;

    #[test]
    fn test_grpc_server_name() {
        let server = GrpcServerBuilder::new(ServerConfig::default()).build();
        assert_eq!(server.name(), "grpc");
        assert!(!server.has_services());
        assert!(server.address().is_none());
    }

    #[tokio::test]
    async fn test_run_without_services_fails() {
        let server = GrpcServerBuilder::new(ServerConfig::new("127.0.0.1", 0)).build();
        let (handle, _token) = server.clone().spawn();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ServerError::ConfigError(_))));
        assert!(!server.is_running());
    }
}

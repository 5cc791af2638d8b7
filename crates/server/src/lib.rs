//! Server infrastructure for bth-trader
//!
//! Lifecycle management for the gRPC endpoint with graceful shutdown.
//!
//! # Architecture
//!
//! Servers implement the [`Server`] trait; [`ServerExt`] adds `spawn()`.
//! Shutdown is coordinated with a `CancellationToken`
//! from `tokio_util`, so cancelling the root token stops every child.
//!
//! ```ignore
//! use server::{GrpcServerBuilder, Server, ServerConfig, ShutdownController};
//!
//! let server = GrpcServerBuilder::new(ServerConfig::new("127.0.0.1", 5500))
//!     .with_tonic_server(move |mut b| b.add_service(TraderServer::new(service.clone())))
//!     .build();
//! server.run(ShutdownController::with_ctrl_c().token()).await?;
//! ```

pub mod config;
pub mod error;
pub mod grpc;
pub mod shutdown;
pub mod traits;

pub use config::{ports, ServerConfig};
pub use error::{Result, ServerError};
pub use grpc::{GrpcServer, GrpcServerBuilder};
pub use shutdown::ShutdownController;
pub use traits::{Server, ServerExt};

//! Trading service for bth-trader
//!
//! Ties the Kraken feed to the `bth.Trader` gRPC API.
//!
//! # Features
//!
//! - [`Pipeline`]: decodes feed frames and fans orders and trades out to
//!   their dispatchers, and sweeps the order cache
//! - [`TraderService`]: AddOrder, CancelOrder, OrderStatus and StreamOrders
//! - `proto`: wire messages plus the generated `trader_server` and
//!   `trader_client` modules

pub mod error;
pub mod pipeline;
pub mod proto;
pub mod service;

pub use error::{Result, TraderError};
pub use pipeline::{spawn_cache_sweep, Pipeline, PipelineSettings};
pub use proto::trader_client::TraderClient;
pub use proto::trader_server::{Trader, TraderServer};
pub use service::{ServiceSettings, TraderService};

//! Kraken connectivity for bth-trader
//!
//! # Features
//!
//! - Feed decoding (`openOrders`, `ownTrades`, order acknowledgments)
//! - Authenticated WebSocket client used as the order command transport
//! - REST client for the WebSocket session token

pub mod error;
pub mod decoder;
pub mod messages;
pub mod ws;
pub mod rest;

pub use error::{DecodeError, KrakenError, Result};
pub use decoder::{classify, decode, decode_stream, FeedMessage, MessageKind, Outputs};
pub use messages::{AddOrderMessage, CancelOrderMessage, SubscribeMessage};
pub use ws::KrakenWsClient;
pub use rest::{KrakenRestClient, WsAuthToken};

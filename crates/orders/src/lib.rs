//! Order plumbing for bth-trader
//!
//! This crate holds everything between the decoded exchange feed and the
//! RPC surface.
//!
//! # Features
//!
//! - Order and trade domain types
//! - Generic publish/subscribe dispatcher
//! - One-shot waiters correlating a submission with its confirmation
//! - In-memory order cache with delayed eviction of terminal orders
//! - Exchange command client trait (with a mock for tests)

pub mod types;
pub mod error;
pub mod dispatcher;
pub mod waiter;
pub mod storage;
pub mod exchange;

// Re-export commonly used types
pub use types::{Order, OrderStatus, RefId, Side, Trade};
pub use error::{OrdersError, Result};
pub use dispatcher::{Dispatcher, Observer};
pub use waiter::Waiter;
pub use storage::{OrderCache, DEFAULT_GRACE_PERIOD};

// Client exports
pub use exchange::{CancelOrders, ExchangeClient, MockExchangeClient, PlaceOrder};

//! Order plumbing error types

use thiserror::Error;

/// Errors raised by the order layer and its exchange collaborators
#[derive(Error, Debug)]
pub enum OrdersError {
    /// The exchange command transport failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Outbound request could not be encoded
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Result type for order operations
pub type Result<T> = std::result::Result<T, OrdersError>;

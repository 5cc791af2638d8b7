//! Kraken error types

use thiserror::Error;

/// Failure to decode one feed payload or entry
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// Errors from the Kraken transports
#[derive(Error, Debug)]
pub enum KrakenError {
    /// WebSocket connect or write failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The connection's writer is gone
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error list returned by the REST API
    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid API secret: {0}")]
    InvalidSecret(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<KrakenError> for orders::OrdersError {
    fn from(err: KrakenError) -> Self {
        match err {
            KrakenError::Serialization(e) => orders::OrdersError::Encoding(e.to_string()),
            other => orders::OrdersError::Transport(other.to_string()),
        }
    }
}

/// Result type for Kraken transport operations
pub type Result<T> = std::result::Result<T, KrakenError>;

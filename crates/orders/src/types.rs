//! Order and trade domain types
//!
//! These are the normalized shapes the feed decoder produces and every
//! downstream consumer (cache, waiters, streams) works with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client-generated correlation token. Zero means "not yet correlated".
pub type RefId = i32;

/// Order status as reported by the exchange
///
/// Values the exchange may add later pass through verbatim as [`OrderStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Accepted, not yet working
    Pending,
    /// Working on the book
    #[default]
    Open,
    /// Acknowledged as opened
    Opened,
    /// Cancelled
    Canceled,
    /// Fully filled
    Closed,
    /// Expired
    Expired,
    /// Rejected by the exchange
    Error,
    /// Any other exchange value
    Other(String),
}

impl OrderStatus {
    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Open => "open",
            OrderStatus::Opened => "opened",
            OrderStatus::Canceled => "canceled",
            OrderStatus::Closed => "closed",
            OrderStatus::Expired => "expired",
            OrderStatus::Error => "error",
            OrderStatus::Other(s) => s.as_str(),
        }
    }

    /// Terminal orders no longer change and become eligible for eviction.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            OrderStatus::Pending | OrderStatus::Open | OrderStatus::Opened
        )
    }
}

impl From<&str> for OrderStatus {
    fn from(s: &str) -> Self {
        match s {
            "pending" => OrderStatus::Pending,
            "open" => OrderStatus::Open,
            "opened" => OrderStatus::Opened,
            "canceled" => OrderStatus::Canceled,
            "closed" => OrderStatus::Closed,
            "expired" => OrderStatus::Expired,
            "error" => OrderStatus::Error,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(s: String) -> Self {
        OrderStatus::from(s.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buy or sell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown side '{}'", other)),
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed state of one exchange order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Order {
    /// Exchange-assigned id, empty until assigned
    pub order_id: String,
    /// Correlation token, zero if unknown
    pub ref_id: RefId,
    /// Current status
    pub status: OrderStatus,
    /// Failure detail, only set when `status == Error`
    pub error: Option<String>,
}

impl Order {
    /// Create an order snapshot
    pub fn new(order_id: impl Into<String>, ref_id: RefId, status: OrderStatus) -> Self {
        Self {
            order_id: order_id.into(),
            ref_id,
            status,
            error: None,
        }
    }

    /// Create a rejected order carrying the exchange's error text
    pub fn rejected(ref_id: RefId, message: impl Into<String>) -> Self {
        Self {
            order_id: String::new(),
            ref_id,
            status: OrderStatus::Error,
            error: Some(message.into()),
        }
    }

    /// Whether the correlation token is set
    pub fn is_correlated(&self) -> bool {
        self.ref_id != 0
    }
}

/// A fill reported on the own-trades channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub order_id: String,
    pub position_id: String,
    pub pair: String,
    pub timestamp: DateTime<Utc>,
    pub side: Side,
    pub order_type: String,
    pub price: f64,
    pub cost: f64,
    pub fee: f64,
    pub volume: f64,
    pub margin: f64,
    /// Correlation token if the exchange echoed one
    pub ref_id: RefId,
}

//! Exchange command client - trait and mock implementation

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RefId, Side};

/// Limit order placement request
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub ref_id: RefId,
    pub pair: String,
    pub side: Side,
    pub price: f64,
    pub volume: f64,
    pub token: String,
}

/// Cancellation of one or more exchange orders
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOrders {
    pub order_ids: Vec<String>,
    pub token: String,
}

/// Outbound command channel to the exchange
///
/// Both calls are fire-and-forget: success means the request was handed to
/// the transport. Confirmations arrive later on the order feed.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn add_order(&self, request: PlaceOrder) -> Result<()>;

    async fn cancel_order(&self, request: CancelOrders) -> Result<()>;
}

// ==================== Mock Implementation ====================

/// Mock exchange client for testing
pub struct MockExchangeClient {
    placed: std::sync::Mutex<Vec<PlaceOrder>>,
    cancelled: std::sync::Mutex<Vec<CancelOrders>>,
    fail_with: std::sync::Mutex<Option<String>>,
}

impl MockExchangeClient {
    /// Create a new mock exchange client
    pub fn new() -> Self {
        Self {
            placed: std::sync::Mutex::new(Vec::new()),
            cancelled: std::sync::Mutex::new(Vec::new()),
            fail_with: std::sync::Mutex::new(None),
        }
    }

    /// Make every subsequent call fail with a transport error
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock().unwrap() = Some(message.to_string());
    }

    /// Get list of placement requests
    pub fn get_placed_orders(&self) -> Vec<PlaceOrder> {
        self.placed.lock().unwrap().clone()
    }

    /// Get list of cancellation requests
    pub fn get_cancelled_orders(&self) -> Vec<CancelOrders> {
        self.cancelled.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<()> {
        match self.fail_with.lock().unwrap().as_ref() {
            Some(message) => Err(crate::error::OrdersError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

impl Default for MockExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for MockExchangeClient {
    async fn add_order(&self, request: PlaceOrder) -> Result<()> {
        self.check_failure()?;
        tracing::debug!("Mock exchange: add order ref_id={}", request.ref_id);
        self.placed.lock().unwrap().push(request);
        Ok(())
    }

    async fn cancel_order(&self, request: CancelOrders) -> Result<()> {
        self.check_failure()?;
        tracing::debug!("Mock exchange: cancel orders {:?}", request.order_ids);
        self.cancelled.lock().unwrap().push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrdersError;
    use assert_matches::assert_matches;

    fn place(ref_id: RefId) -> PlaceOrder {
        PlaceOrder {
            ref_id,
            pair: "ETH/EUR".to_string(),
            side: Side::Buy,
            price: 1728.4,
            volume: 0.05,
            token: "token".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = MockExchangeClient::new();
        client.add_order(place(1)).await.unwrap();
        client
            .cancel_order(CancelOrders {
                order_ids: vec!["OID".to_string()],
                token: "token".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(client.get_placed_orders(), vec![place(1)]);
        assert_eq!(client.get_cancelled_orders()[0].order_ids, vec!["OID"]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let client = MockExchangeClient::new();
        client.fail_with("connection reset");

        let err = client.add_order(place(2)).await.unwrap_err();
        assert_matches!(err, OrdersError::Transport(msg) if msg == "connection reset");
        assert!(client.get_placed_orders().is_empty());
    }
}

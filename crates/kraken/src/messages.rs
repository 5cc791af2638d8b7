//! Outbound WebSocket messages

use serde::Serialize;

use orders::{CancelOrders, PlaceOrder};

/// `subscribe` request for a private channel
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeMessage {
    pub event: &'static str,
    pub subscription: Subscription,
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    pub name: String,
    pub token: String,
}

impl SubscribeMessage {
    pub fn new(channel: &str, token: &str) -> Self {
        Self {
            event: "subscribe",
            subscription: Subscription {
                name: channel.to_string(),
                token: token.to_string(),
            },
        }
    }
}

/// Limit order placement. Prices and volumes travel as decimal strings.
#[derive(Debug, Clone, Serialize)]
pub struct AddOrderMessage {
    pub event: &'static str,
    pub ordertype: &'static str,
    pub pair: String,
    pub price: String,
    pub reqid: i32,
    pub token: String,
    #[serde(rename = "type")]
    pub side: String,
    pub userref: String,
    pub volume: String,
}

impl From<&PlaceOrder> for AddOrderMessage {
    fn from(request: &PlaceOrder) -> Self {
        Self {
            event: "addOrder",
            ordertype: "limit",
            pair: request.pair.clone(),
            price: request.price.to_string(),
            reqid: request.ref_id,
            token: request.token.clone(),
            side: request.side.as_str().to_string(),
            userref: request.ref_id.to_string(),
            volume: request.volume.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderMessage {
    pub event: &'static str,
    pub token: String,
    pub txid: Vec<String>,
}

impl From<&CancelOrders> for CancelOrderMessage {
    fn from(request: &CancelOrders) -> Self {
        Self {
            event: "cancelOrder",
            token: request.token.clone(),
            txid: request.order_ids.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orders::Side;
    use serde_json::json;

    #[test]
    fn test_add_order_wire_format() {
        let request = PlaceOrder {
            ref_id: 112233,
            pair: "ETH/EUR".to_string(),
            side: Side::Sell,
            price: 1728.4,
            volume: 0.05793931,
            token: "secret-token".to_string(),
        };

        let value = serde_json::to_value(AddOrderMessage::from(&request)).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "addOrder",
                "ordertype": "limit",
                "pair": "ETH/EUR",
                "price": "1728.4",
                "reqid": 112233,
                "token": "secret-token",
                "type": "sell",
                "userref": "112233",
                "volume": "0.05793931"
            })
        );
    }

    #[test]
    fn test_cancel_order_wire_format() {
        let request = CancelOrders {
            order_ids: vec!["OABCDE-1".to_string()],
            token: "t".to_string(),
        };

        let value = serde_json::to_value(CancelOrderMessage::from(&request)).unwrap();
        assert_eq!(value, json!({"event": "cancelOrder", "token": "t", "txid": ["OABCDE-1"]}));
    }

    #[test]
    fn test_subscribe_wire_format() {
        let value = serde_json::to_value(SubscribeMessage::new("ownTrades", "t")).unwrap();
        assert_eq!(
            value,
            json!({"event": "subscribe", "subscription": {"name": "ownTrades", "token": "t"}})
        );
    }
}

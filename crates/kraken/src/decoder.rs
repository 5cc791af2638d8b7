//! Kraken feed decoder
//!
//! The private feed multiplexes everything on one socket. List payloads carry
//! their channel name as the second-to-last element
//! (`[[...entries], "openOrders", {"sequence": 1}]`), object payloads carry an
//! `event` field. `decode` turns one raw frame into a [`FeedMessage`];
//! `decode_stream` runs that over a channel of frames and pushes orders and
//! trades onto their outputs without ever waiting on a slow consumer.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use observability::TraderMetrics;
use orders::{Order, OrderStatus, RefId, Side, Trade};

use crate::error::DecodeError;

pub const OPEN_ORDERS: &str = "openOrders";
pub const OWN_TRADES: &str = "ownTrades";

/// Shape-level classification of a feed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    OrderBatch,
    TradeBatch,
    Heartbeat,
    SubscriptionStatus,
    SystemStatus,
    AddOrderStatus,
    CancelOrderStatus,
    Unknown,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::OrderBatch => "order_batch",
            MessageKind::TradeBatch => "trade_batch",
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::SubscriptionStatus => "subscription_status",
            MessageKind::SystemStatus => "system_status",
            MessageKind::AddOrderStatus => "add_order_status",
            MessageKind::CancelOrderStatus => "cancel_order_status",
            MessageKind::Unknown => "unknown",
        }
    }
}

/// A decoded feed payload
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Order updates from `openOrders`; malformed entries already skipped
    Orders(Vec<Order>),
    /// Fills from `ownTrades`; malformed entries already skipped
    Trades(Vec<Trade>),
    /// Acknowledgment of an `addOrder` request
    AddOrderStatus(Order),
    Heartbeat,
    SubscriptionStatus {
        channel: Option<String>,
        status: String,
        error: Option<String>,
    },
    SystemStatus {
        status: String,
    },
    CancelOrderStatus,
    /// Anything unrecognized, kept verbatim
    Unknown(String),
}

impl FeedMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            FeedMessage::Orders(_) => MessageKind::OrderBatch,
            FeedMessage::Trades(_) => MessageKind::TradeBatch,
            FeedMessage::AddOrderStatus(_) => MessageKind::AddOrderStatus,
            FeedMessage::Heartbeat => MessageKind::Heartbeat,
            FeedMessage::SubscriptionStatus { .. } => MessageKind::SubscriptionStatus,
            FeedMessage::SystemStatus { .. } => MessageKind::SystemStatus,
            FeedMessage::CancelOrderStatus => MessageKind::CancelOrderStatus,
            FeedMessage::Unknown(_) => MessageKind::Unknown,
        }
    }
}

/// Classify a parsed payload by its shape and tag
pub fn classify(value: &Value) -> MessageKind {
    match value {
        Value::Array(items) if items.len() >= 2 => match items[items.len() - 2].as_str() {
            Some(OPEN_ORDERS) => MessageKind::OrderBatch,
            Some(OWN_TRADES) => MessageKind::TradeBatch,
            _ => MessageKind::Unknown,
        },
        Value::Object(map) => match map.get("event").and_then(Value::as_str) {
            Some("heartbeat") => MessageKind::Heartbeat,
            Some("subscriptionStatus") => MessageKind::SubscriptionStatus,
            Some("systemStatus") => MessageKind::SystemStatus,
            Some("addOrderStatus") | Some("addOrderStatusStatus") => MessageKind::AddOrderStatus,
            Some("cancelOrderStatus") => MessageKind::CancelOrderStatus,
            _ => MessageKind::Unknown,
        },
        _ => MessageKind::Unknown,
    }
}

/// Decode one raw feed frame
pub fn decode(raw: &str) -> Result<FeedMessage, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;

    let message = match classify(&value) {
        MessageKind::OrderBatch => FeedMessage::Orders(parse_order_batch(&value)?),
        MessageKind::TradeBatch => FeedMessage::Trades(parse_trade_batch(&value)?),
        MessageKind::AddOrderStatus => FeedMessage::AddOrderStatus(parse_add_order_status(&value)?),
        MessageKind::Heartbeat => FeedMessage::Heartbeat,
        MessageKind::SubscriptionStatus => FeedMessage::SubscriptionStatus {
            channel: value.get("channelName").and_then(Value::as_str).map(str::to_string),
            status: value.get("status").and_then(Value::as_str).unwrap_or_default().to_string(),
            error: value.get("errorMessage").and_then(Value::as_str).map(str::to_string),
        },
        MessageKind::SystemStatus => FeedMessage::SystemStatus {
            status: value.get("status").and_then(Value::as_str).unwrap_or_default().to_string(),
        },
        MessageKind::CancelOrderStatus => FeedMessage::CancelOrderStatus,
        MessageKind::Unknown => FeedMessage::Unknown(raw.to_string()),
    };

    Ok(message)
}

fn batch_entries(value: &Value) -> Result<&Vec<Value>, DecodeError> {
    value
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| DecodeError::Malformed("batch payload is not a list".to_string()))
}

fn parse_order_batch(value: &Value) -> Result<Vec<Order>, DecodeError> {
    let mut orders = Vec::new();
    for entry in batch_entries(value)? {
        let Some(entry) = entry.as_object() else {
            tracing::warn!(entry = %entry, "Skipping non-object order entry");
            continue;
        };
        for (order_id, info) in entry {
            match parse_order(order_id, info) {
                Ok(order) => orders.push(order),
                Err(e) => tracing::warn!(order_id = %order_id, error = %e, "Skipping malformed order entry"),
            }
        }
    }
    Ok(orders)
}

fn parse_order(order_id: &str, info: &Value) -> Result<Order, DecodeError> {
    let info = as_object(info, order_id)?;

    let ref_id = match info.get("userref") {
        None | Some(Value::Null) => 0,
        Some(raw) => parse_ref_id("userref", raw).unwrap_or_else(|e| {
            tracing::warn!(order_id, error = %e, "Unparseable userref, leaving order uncorrelated");
            0
        }),
    };

    let status = match info.get("status") {
        None => OrderStatus::Open,
        Some(raw) => raw
            .as_str()
            .map(OrderStatus::from)
            .ok_or_else(|| invalid("status", raw))?,
    };

    Ok(Order::new(order_id, ref_id, status))
}

fn parse_add_order_status(value: &Value) -> Result<Order, DecodeError> {
    let reqid = value.get("reqid").ok_or(DecodeError::MissingField("reqid"))?;
    let ref_id = parse_ref_id("reqid", reqid)?;
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingField("status"))?;

    if status == "ok" {
        let txid = value.get("txid").and_then(Value::as_str).unwrap_or_default();
        Ok(Order::new(txid, ref_id, OrderStatus::Open))
    } else {
        let message = value.get("errorMessage").and_then(Value::as_str).unwrap_or(status);
        Ok(Order::rejected(ref_id, message))
    }
}

fn parse_trade_batch(value: &Value) -> Result<Vec<Trade>, DecodeError> {
    let mut trades = Vec::new();
    for entry in batch_entries(value)? {
        let Some(entry) = entry.as_object() else {
            tracing::warn!(entry = %entry, "Skipping non-object trade entry");
            continue;
        };
        for (trade_id, info) in entry {
            match parse_trade(trade_id, info) {
                Ok(trade) => trades.push(trade),
                Err(e) => tracing::warn!(trade_id = %trade_id, error = %e, "Skipping malformed trade entry"),
            }
        }
    }
    Ok(trades)
}

fn parse_trade(trade_id: &str, info: &Value) -> Result<Trade, DecodeError> {
    let info = as_object(info, trade_id)?;

    let side_raw = text_field(info, "type")?;
    let side = side_raw
        .parse::<Side>()
        .map_err(|_| DecodeError::InvalidField { field: "type", value: side_raw.clone() })?;

    let ref_id = match info.get("userref") {
        None | Some(Value::Null) => 0,
        Some(raw) => parse_ref_id("userref", raw)?,
    };

    Ok(Trade {
        trade_id: trade_id.to_string(),
        order_id: text_field(info, "ordertxid")?,
        position_id: text_field(info, "postxid").unwrap_or_default(),
        pair: text_field(info, "pair")?,
        timestamp: parse_timestamp(&text_field(info, "time")?)?,
        side,
        order_type: text_field(info, "ordertype")?,
        price: number_field(info, "price")?,
        cost: number_field(info, "cost")?,
        fee: number_field(info, "fee")?,
        volume: number_field(info, "vol")?,
        margin: number_field(info, "margin").unwrap_or_default(),
        ref_id,
    })
}

fn as_object<'a>(info: &'a Value, id: &str) -> Result<&'a Map<String, Value>, DecodeError> {
    info.as_object()
        .ok_or_else(|| DecodeError::Malformed(format!("entry {} is not an object", id)))
}

fn invalid(field: &'static str, raw: &Value) -> DecodeError {
    DecodeError::InvalidField {
        field,
        value: raw.to_string(),
    }
}

/// Accepts a JSON number or a numeric string
fn parse_ref_id(field: &'static str, raw: &Value) -> Result<RefId, DecodeError> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| RefId::try_from(n).ok())
        .ok_or_else(|| invalid(field, raw))
}

fn text_field(info: &Map<String, Value>, field: &'static str) -> Result<String, DecodeError> {
    match info.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(invalid(field, other)),
        None => Err(DecodeError::MissingField(field)),
    }
}

fn number_field(info: &Map<String, Value>, field: &'static str) -> Result<f64, DecodeError> {
    let text = text_field(info, field)?;
    text.parse::<f64>()
        .map_err(|_| DecodeError::InvalidField { field, value: text })
}

/// Fractional epoch seconds, e.g. `"1650000011.061588"`
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field: "time",
        value: raw.to_string(),
    };

    let (secs, frac) = raw.split_once('.').unwrap_or((raw, ""));
    let secs: i64 = secs.parse().map_err(|_| invalid())?;

    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let digits = &frac[..frac.len().min(9)];
    let nanos = if digits.is_empty() {
        0
    } else {
        let value: u32 = digits.parse().map_err(|_| invalid())?;
        value * 10u32.pow(9 - digits.len() as u32)
    };

    DateTime::from_timestamp(secs, nanos).ok_or_else(invalid)
}

/// Destinations of decoded events
pub struct Outputs {
    pub orders: mpsc::Sender<Order>,
    pub trades: mpsc::Sender<Trade>,
    pub metrics: TraderMetrics,
}

impl Outputs {
    fn emit<T>(&self, tx: &mpsc::Sender<T>, output: &'static str, event: T) {
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(output, "Output channel full, dropping event");
                self.metrics.event_dropped(output);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(output, "Output channel closed, dropping event");
            }
        }
    }
}

/// Decode frames until `input` closes, routing events to `outputs`.
///
/// Decode failures are logged and skipped. Sends never wait: an event that
/// does not fit in its output channel is dropped.
pub async fn decode_stream(mut input: mpsc::Receiver<String>, outputs: Outputs) {
    while let Some(raw) = input.recv().await {
        let message = match decode(&raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode feed message");
                outputs.metrics.decode_error();
                continue;
            }
        };

        outputs.metrics.feed_message(message.kind().as_str());

        match message {
            FeedMessage::Orders(orders) => {
                for order in orders {
                    outputs.emit(&outputs.orders, "orders", order);
                }
            }
            FeedMessage::AddOrderStatus(order) => {
                if let Some(error) = &order.error {
                    tracing::warn!(ref_id = order.ref_id, error = %error, "Order rejected by exchange");
                } else {
                    tracing::info!(ref_id = order.ref_id, order_id = %order.order_id, "Order accepted by exchange");
                }
                outputs.emit(&outputs.orders, "orders", order);
            }
            FeedMessage::Trades(trades) => {
                for trade in trades {
                    outputs.emit(&outputs.trades, "trades", trade);
                }
            }
            FeedMessage::SubscriptionStatus { channel, status, error } => {
                if status == "error" {
                    tracing::warn!(?channel, ?error, "Subscription failed");
                } else {
                    tracing::info!(?channel, status = %status, "Subscription status");
                }
            }
            FeedMessage::SystemStatus { status } => {
                tracing::info!(status = %status, "Exchange system status");
            }
            FeedMessage::Heartbeat | FeedMessage::CancelOrderStatus => {}
            FeedMessage::Unknown(raw) => {
                tracing::debug!(payload = %raw, "Unknown feed message");
            }
        }
    }

    tracing::info!("Feed closed, decoder stopping");
}

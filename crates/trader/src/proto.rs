//! `bth.Trader` wire messages
//!
//! Messages are declared here with prost derives; the service and client glue
//! (`trader_server`, `trader_client`) is generated by `build.rs`.

use orders::Order;

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddOrderRequest {
    #[prost(string, tag = "1")]
    pub pair: String,
    /// "buy" or "sell"
    #[prost(string, tag = "2")]
    pub direction: String,
    #[prost(double, tag = "3")]
    pub price: f64,
    #[prost(double, tag = "4")]
    pub volume: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AddOrderResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(int32, tag = "2")]
    pub ref_id: i32,
    #[prost(string, tag = "3")]
    pub order_id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CancelOrderRequest {
    #[prost(int32, tag = "1")]
    pub ref_id: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CancelOrderResponse {
    #[prost(string, tag = "1")]
    pub status: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderStatusRequest {
    #[prost(int32, tag = "1")]
    pub ref_id: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OrderStatusResponse {
    #[prost(int32, tag = "1")]
    pub ref_id: i32,
    #[prost(string, tag = "2")]
    pub order_id: String,
    #[prost(string, tag = "3")]
    pub status: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Empty {}

impl From<Order> for OrderStatusResponse {
    fn from(order: Order) -> Self {
        Self {
            ref_id: order.ref_id,
            order_id: order.order_id,
            status: order.status.to_string(),
        }
    }
}

impl From<Order> for AddOrderResponse {
    fn from(order: Order) -> Self {
        Self {
            status: order.status.to_string(),
            ref_id: order.ref_id,
            order_id: order.order_id,
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/bth.Trader.rs"));

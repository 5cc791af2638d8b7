//! Generates the `bth.Trader` service glue for the hand-written prost
//! messages in `src/proto.rs`, so no protoc is needed.

use tonic_build::manual::{Builder, Method, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{}", input))
        .output_type(format!("crate::proto::{}", output))
        .codec_path(CODEC)
}

fn main() {
    let service = Service::builder()
        .name("Trader")
        .package("bth")
        .method(method("add_order", "AddOrder", "AddOrderRequest", "AddOrderResponse").build())
        .method(method("cancel_order", "CancelOrder", "CancelOrderRequest", "CancelOrderResponse").build())
        .method(method("order_status", "OrderStatus", "OrderStatusRequest", "OrderStatusResponse").build())
        .method(
            method("stream_orders", "StreamOrders", "Empty", "OrderStatusResponse")
                .server_streaming()
                .build(),
        )
        .build();

    Builder::new().compile(&[service]);
    println!("cargo:rerun-if-changed=build.rs");
}

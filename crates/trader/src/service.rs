//! The `bth.Trader` service
//!
//! Submit parks on a [`Waiter`] subscribed to the order dispatcher until the
//! exchange echoes the ref id back. Cancel and query read the order cache.
//! Streams register a forwarding observer per client.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use observability::{RpcTimer, TraderMetrics};
use orders::{
    CancelOrders, Dispatcher, ExchangeClient, Observer, Order, OrderCache, OrderStatus, PlaceOrder,
    RefId, Side, Waiter,
};

use crate::error::{Result, TraderError};
use crate::proto::trader_server::Trader;
use crate::proto::{
    AddOrderRequest, AddOrderResponse, CancelOrderRequest, CancelOrderResponse, Empty,
    OrderStatusRequest, OrderStatusResponse,
};

/// Tunables of the service
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// How long Submit waits for the exchange acknowledgment
    pub submit_timeout: Duration,
    /// Per-client queue of the order stream
    pub stream_buffer: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(30),
            stream_buffer: 100,
        }
    }
}

/// Order gateway exposed over gRPC
pub struct TraderService {
    exchange: Arc<dyn ExchangeClient>,
    dispatcher: Arc<Dispatcher<Order>>,
    cache: Arc<OrderCache>,
    token: String,
    in_flight: Mutex<HashSet<RefId>>,
    settings: ServiceSettings,
    metrics: TraderMetrics,
    shutdown: CancellationToken,
}

/// Ref id reservation plus waiter subscription, undone on drop
struct Submission<'a> {
    service: &'a TraderService,
    ref_id: RefId,
    observer: Arc<dyn Observer<Order>>,
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.service.dispatcher.unsubscribe(&self.observer);
        self.service.in_flight.lock().remove(&self.ref_id);
    }
}

/// Copies order events into one stream client's queue
struct StreamForwarder {
    tx: mpsc::Sender<Order>,
}

impl Observer<Order> for StreamForwarder {
    fn notify(&self, order: &Order) {
        if let Err(TrySendError::Full(order)) = self.tx.try_send(order.clone()) {
            tracing::warn!(ref_id = order.ref_id, "Stream client too slow, dropping order update");
        }
    }
}

impl TraderService {
    pub fn new(
        exchange: Arc<dyn ExchangeClient>,
        dispatcher: Arc<Dispatcher<Order>>,
        cache: Arc<OrderCache>,
        token: impl Into<String>,
        settings: ServiceSettings,
        metrics: TraderMetrics,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            exchange,
            dispatcher,
            cache,
            token: token.into(),
            in_flight: Mutex::new(HashSet::new()),
            settings,
            metrics,
            shutdown,
        }
    }

    /// Pick a random non-zero ref id that is neither in flight nor cached
    fn reserve_ref_id(&self) -> RefId {
        let mut rng = rand::thread_rng();
        let mut in_flight = self.in_flight.lock();
        loop {
            let candidate = rng.gen_range(1..=RefId::MAX);
            if !in_flight.contains(&candidate) && !self.cache.contains(candidate) {
                in_flight.insert(candidate);
                return candidate;
            }
        }
    }

    /// Place a limit order and wait for the exchange to acknowledge it
    pub async fn submit(&self, pair: &str, side: Side, price: f64, volume: f64) -> Result<Order> {
        if pair.trim().is_empty() {
            return Err(TraderError::InvalidArgument("pair is required".to_string()));
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(TraderError::InvalidArgument(format!("price must be positive, got {}", price)));
        }
        if !(volume.is_finite() && volume > 0.0) {
            return Err(TraderError::InvalidArgument(format!("volume must be positive, got {}", volume)));
        }

        let ref_id = self.reserve_ref_id();
        let waiter = Arc::new(Waiter::new(ref_id));
        let submission = Submission {
            service: self,
            ref_id,
            observer: waiter.clone(),
        };
        // Subscribed before sending so the acknowledgment cannot be missed
        self.dispatcher.subscribe(submission.observer.clone());

        tracing::info!(ref_id, pair, %side, price, volume, "Submitting order");
        self.exchange
            .add_order(PlaceOrder {
                ref_id,
                pair: pair.to_string(),
                side,
                price,
                volume,
                token: self.token.clone(),
            })
            .await?;
        self.metrics.order_submitted();

        let order = match tokio::time::timeout(self.settings.submit_timeout, waiter.wait()).await {
            Ok(Some(order)) => order,
            Ok(None) => return Err(TraderError::Internal("order waiter closed".to_string())),
            Err(_) => {
                tracing::warn!(ref_id, "Timed out waiting for order acknowledgment");
                self.metrics.order_timed_out();
                return Err(TraderError::Timeout(ref_id));
            }
        };
        drop(submission);

        if order.status == OrderStatus::Error {
            self.metrics.order_rejected();
            return Err(TraderError::Rejected(order.error.unwrap_or_else(|| "order rejected".to_string())));
        }

        tracing::info!(ref_id, order_id = %order.order_id, status = %order.status, "Order acknowledged");
        Ok(order)
    }

    /// Cancel a cached order by ref id
    pub async fn cancel(&self, ref_id: RefId) -> Result<()> {
        let order = self.cache.find(ref_id).ok_or(TraderError::NotFound(ref_id))?;
        if order.order_id.is_empty() {
            return Err(TraderError::NotCancellable(ref_id));
        }

        tracing::info!(ref_id, order_id = %order.order_id, "Cancelling order");
        self.exchange
            .cancel_order(CancelOrders {
                order_ids: vec![order.order_id],
                token: self.token.clone(),
            })
            .await?;
        self.metrics.order_cancelled();
        Ok(())
    }

    /// Last known state of an order
    pub fn query(&self, ref_id: RefId) -> Result<Order> {
        self.cache.find(ref_id).ok_or(TraderError::NotFound(ref_id))
    }

    /// Open an order stream.
    ///
    /// The receiver first gets the cached orders, then every live update. The
    /// forwarder is unsubscribed when the receiver is dropped or on shutdown.
    pub fn subscribe_orders(&self) -> mpsc::Receiver<Order> {
        let buffer = self.settings.stream_buffer.max(1);
        let (forward_tx, mut forward_rx) = mpsc::channel(buffer);
        let (client_tx, client_rx) = mpsc::channel(buffer);

        let observer: Arc<dyn Observer<Order>> = Arc::new(StreamForwarder { tx: forward_tx });
        self.dispatcher.subscribe(observer.clone());
        self.metrics.stream_opened();

        let seed = self.cache.snapshot();
        let dispatcher = self.dispatcher.clone();
        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            for order in seed {
                match client_tx.try_send(order) {
                    Ok(()) => {}
                    Err(TrySendError::Full(order)) => {
                        tracing::warn!(ref_id = order.ref_id, "Stream queue full, skipping rest of cached orders");
                        metrics.event_dropped("stream");
                        break;
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = client_tx.closed() => break,
                    next = forward_rx.recv() => match next {
                        Some(order) => {
                            if client_tx.send(order).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }

            dispatcher.unsubscribe(&observer);
            metrics.stream_closed();
            tracing::debug!("Order stream closed");
        });

        client_rx
    }
}

type OrderStream = Pin<Box<dyn Stream<Item = std::result::Result<OrderStatusResponse, Status>> + Send>>;

#[tonic::async_trait]
impl Trader for TraderService {
    type StreamOrdersStream = OrderStream;

    async fn add_order(
        &self,
        request: Request<AddOrderRequest>,
    ) -> std::result::Result<Response<AddOrderResponse>, Status> {
        let _timer = RpcTimer::new(&self.metrics, "AddOrder");
        let req = request.into_inner();
        let side = req
            .direction
            .parse::<Side>()
            .map_err(Status::invalid_argument)?;

        let order = self.submit(&req.pair, side, req.price, req.volume).await?;
        Ok(Response::new(order.into()))
    }

    async fn cancel_order(
        &self,
        request: Request<CancelOrderRequest>,
    ) -> std::result::Result<Response<CancelOrderResponse>, Status> {
        let _timer = RpcTimer::new(&self.metrics, "CancelOrder");
        self.cancel(request.into_inner().ref_id).await?;
        Ok(Response::new(CancelOrderResponse {
            status: "success".to_string(),
        }))
    }

    async fn order_status(
        &self,
        request: Request<OrderStatusRequest>,
    ) -> std::result::Result<Response<OrderStatusResponse>, Status> {
        let _timer = RpcTimer::new(&self.metrics, "OrderStatus");
        let order = self.query(request.into_inner().ref_id)?;
        Ok(Response::new(order.into()))
    }

    async fn stream_orders(
        &self,
        _request: Request<Empty>,
    ) -> std::result::Result<Response<Self::StreamOrdersStream>, Status> {
        let stream: OrderStream = Box::pin(
            ReceiverStream::new(self.subscribe_orders()).map(|order| Ok(OrderStatusResponse::from(order))),
        );
        Ok(Response::new(stream))
    }
}

//! Event pipeline: feed frames in, decoded orders and trades fanned out
//!
//! ```text
//! feed ─► decode_stream ─┬─► orders ─► Dispatcher<Order> ─► cache, waiters, streams
//!                        └─► trades ─► Dispatcher<Trade> ─► trade log
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use kraken::{decode_stream, Outputs};
use observability::TraderMetrics;
use orders::{Dispatcher, Observer, Order, OrderCache, Trade};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Capacity of the decoded order and trade channels
    pub event_buffer: usize,
    /// Period of the cache sweep
    pub gc_interval: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            event_buffer: 1024,
            gc_interval: Duration::from_secs(2),
        }
    }
}

/// Logs every execution reported on the trades channel
struct TradeLogger {
    metrics: TraderMetrics,
}

impl Observer<Trade> for TradeLogger {
    fn notify(&self, trade: &Trade) {
        tracing::info!(
            trade_id = %trade.trade_id,
            order_id = %trade.order_id,
            pair = %trade.pair,
            side = %trade.side,
            price = trade.price,
            volume = trade.volume,
            fee = trade.fee,
            "Trade executed"
        );
        self.metrics.trade_received();
    }
}

/// Running pipeline tasks
pub struct Pipeline {
    orders: Arc<Dispatcher<Order>>,
    trades: Arc<Dispatcher<Trade>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Wire the feed to the dispatchers and start the background tasks.
    ///
    /// The cache is subscribed to the order dispatcher before any frame is
    /// decoded. Every task stops when `shutdown` is cancelled; the decoder
    /// also stops when the feed closes.
    pub fn start(
        feed: mpsc::Receiver<String>,
        cache: Arc<OrderCache>,
        settings: PipelineSettings,
        metrics: TraderMetrics,
        shutdown: CancellationToken,
    ) -> Self {
        let buffer = settings.event_buffer.max(1);
        let (order_tx, order_rx) = mpsc::channel(buffer);
        let (trade_tx, trade_rx) = mpsc::channel(buffer);

        let orders: Arc<Dispatcher<Order>> = Arc::new(Dispatcher::new());
        let trades: Arc<Dispatcher<Trade>> = Arc::new(Dispatcher::new());
        orders.subscribe(cache.clone());
        trades.subscribe(Arc::new(TradeLogger {
            metrics: metrics.clone(),
        }));

        let mut tasks = Vec::with_capacity(4);

        let outputs = Outputs {
            orders: order_tx,
            trades: trade_tx,
            metrics: metrics.clone(),
        };
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = decode_stream(feed, outputs) => {
                    tracing::warn!("Exchange feed closed");
                }
            }
        }));

        let dispatcher = orders.clone();
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = dispatcher.read_from(order_rx) => {}
            }
        }));

        let dispatcher = trades.clone();
        let token = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = dispatcher.read_from(trade_rx) => {}
            }
        }));

        tasks.push(spawn_cache_sweep(cache, settings.gc_interval, metrics, shutdown));

        tracing::info!(event_buffer = buffer, gc_interval_ms = settings.gc_interval.as_millis() as u64, "Event pipeline started");

        Self {
            orders,
            trades,
            tasks,
        }
    }

    /// Order dispatcher shared with the service
    pub fn orders(&self) -> Arc<Dispatcher<Order>> {
        self.orders.clone()
    }

    pub fn trades(&self) -> Arc<Dispatcher<Trade>> {
        self.trades.clone()
    }

    /// Wait for every task to finish
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Pipeline task failed");
            }
        }
        tracing::info!("Event pipeline stopped");
    }
}

/// Evict expired terminal orders every `interval` until `shutdown`
pub fn spawn_cache_sweep(
    cache: Arc<OrderCache>,
    interval: Duration,
    metrics: TraderMetrics,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = cache.cleanup();
                    let remaining = cache.len();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining, "Swept order cache");
                    }
                    metrics.cache_swept(evicted, remaining);
                }
            }
        }
    })
}

//! Prometheus metrics
//!
//! `init_metrics` installs the global recorder and its HTTP listener. Without
//! it every handle below is a no-op, which is what tests rely on.

use metrics::{counter, gauge, histogram, Counter, Gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Start the Prometheus exporter on `host:port` (`/metrics`)
pub fn init_metrics(host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metric set for the trading bridge
///
/// # Metrics
///
/// * `trader_feed_messages_total{kind}` - decoded feed messages by kind
/// * `trader_decode_errors_total` - feed messages or entries that failed to decode
/// * `trader_events_dropped_total{output}` - events dropped on a full channel
/// * `trader_trades_total` - fills received
/// * `trader_orders_submitted_total` / `_rejected_total` / `_timed_out_total`
/// * `trader_orders_cancelled_total`
/// * `trader_cache_evictions_total`, `trader_cache_size`
/// * `trader_active_streams`
/// * `trader_rpc_duration_seconds{method}`
#[derive(Clone)]
pub struct TraderMetrics {
    decode_errors: Counter,
    trades: Counter,
    submitted: Counter,
    rejected: Counter,
    timed_out: Counter,
    cancelled: Counter,
    evictions: Counter,
    cache_size: Gauge,
    active_streams: Gauge,
}

impl TraderMetrics {
    pub fn new() -> Self {
        Self {
            decode_errors: counter!("trader_decode_errors_total"),
            trades: counter!("trader_trades_total"),
            submitted: counter!("trader_orders_submitted_total"),
            rejected: counter!("trader_orders_rejected_total"),
            timed_out: counter!("trader_orders_timed_out_total"),
            cancelled: counter!("trader_orders_cancelled_total"),
            evictions: counter!("trader_cache_evictions_total"),
            cache_size: gauge!("trader_cache_size"),
            active_streams: gauge!("trader_active_streams"),
        }
    }

    pub fn feed_message(&self, kind: &'static str) {
        counter!("trader_feed_messages_total", "kind" => kind).increment(1);
    }

    pub fn decode_error(&self) {
        self.decode_errors.increment(1);
    }

    /// An event was dropped because `output` was full
    pub fn event_dropped(&self, output: &'static str) {
        counter!("trader_events_dropped_total", "output" => output).increment(1);
    }

    pub fn trade_received(&self) {
        self.trades.increment(1);
    }

    pub fn order_submitted(&self) {
        self.submitted.increment(1);
    }

    pub fn order_rejected(&self) {
        self.rejected.increment(1);
    }

    pub fn order_timed_out(&self) {
        self.timed_out.increment(1);
    }

    pub fn order_cancelled(&self) {
        self.cancelled.increment(1);
    }

    /// Record one cache sweep
    pub fn cache_swept(&self, evicted: usize, remaining: usize) {
        self.evictions.increment(evicted as u64);
        self.cache_size.set(remaining as f64);
    }

    pub fn stream_opened(&self) {
        self.active_streams.increment(1.0);
    }

    pub fn stream_closed(&self) {
        self.active_streams.decrement(1.0);
    }

    pub fn record_rpc(&self, method: &'static str, duration: Duration) {
        histogram!("trader_rpc_duration_seconds", "method" => method).record(duration.as_secs_f64());
    }
}

impl Default for TraderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Records an RPC's duration when dropped
pub struct RpcTimer<'a> {
    metrics: &'a TraderMetrics,
    method: &'static str,
    start: Instant,
}

impl<'a> RpcTimer<'a> {
    pub fn new(metrics: &'a TraderMetrics, method: &'static str) -> Self {
        Self {
            metrics,
            method,
            start: Instant::now(),
        }
    }
}

impl Drop for RpcTimer<'_> {
    fn drop(&mut self) {
        self.metrics.record_rpc(self.method, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        let metrics = TraderMetrics::new();
        metrics.feed_message("order_batch");
        metrics.event_dropped("orders");
        metrics.cache_swept(2, 10);
        metrics.stream_opened();
        metrics.stream_closed();
        {
            let _timer = RpcTimer::new(&metrics, "AddOrder");
        }
    }

    #[test]
    fn test_init_metrics_rejects_bad_address() {
        assert!(init_metrics("not an address", 9100).is_err());
    }
}

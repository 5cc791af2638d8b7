//! In-memory order cache
//!
//! Keeps the last known state of every correlated order, keyed by ref id.
//! Terminal orders are not removed immediately: the first sweep that sees
//! one records a deadline, and a later sweep past that deadline evicts it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use parking_lot::Mutex;

use crate::dispatcher::Observer;
use crate::types::{Order, RefId};

/// Time a terminal order stays readable after being marked
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

#[derive(Default)]
struct CacheInner {
    orders: HashMap<RefId, Order>,
    deadlines: HashMap<RefId, Instant>,
}

/// Shared order cache, fed as a dispatcher observer
pub struct OrderCache {
    inner: Mutex<CacheInner>,
    grace_period: Duration,
}

impl OrderCache {
    /// Create a cache with the default grace period
    pub fn new() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD)
    }

    /// Create a cache with a custom grace period
    pub fn with_grace_period(grace_period: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Insert or replace the order under its ref id.
    ///
    /// Uncorrelated orders (ref id 0) are ignored. A non-terminal update
    /// clears any pending eviction deadline.
    pub fn add(&self, order: Order) {
        if !order.is_correlated() {
            tracing::debug!(order_id = %order.order_id, "Skipping uncorrelated order");
            return;
        }

        let mut inner = self.inner.lock();
        if !order.status.is_terminal() {
            inner.deadlines.remove(&order.ref_id);
        }
        inner.orders.insert(order.ref_id, order);
    }

    pub fn find(&self, ref_id: RefId) -> Option<Order> {
        self.inner.lock().orders.get(&ref_id).cloned()
    }

    /// Look an order up by its exchange id (linear scan)
    pub fn by_order_id(&self, order_id: &str) -> Option<Order> {
        self.inner
            .lock()
            .orders
            .values()
            .find(|o| o.order_id == order_id)
            .cloned()
    }

    pub fn contains(&self, ref_id: RefId) -> bool {
        self.inner.lock().orders.contains_key(&ref_id)
    }

    /// Remove an order and its eviction deadline unconditionally
    pub fn remove(&self, ref_id: RefId) -> Option<Order> {
        let mut inner = self.inner.lock();
        inner.deadlines.remove(&ref_id);
        inner.orders.remove(&ref_id)
    }

    /// Snapshot of every cached order
    pub fn snapshot(&self) -> Vec<Order> {
        self.inner.lock().orders.values().cloned().collect()
    }

    /// Run one sweep at the current time, returning the number of evicted orders
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    /// Run one sweep as if the time were `now`
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let CacheInner { orders, deadlines } = &mut *inner;

        let mut expired = Vec::new();
        for (ref_id, order) in orders.iter() {
            if !order.status.is_terminal() {
                continue;
            }
            match deadlines.get(ref_id) {
                None => {
                    deadlines.insert(*ref_id, now + self.grace_period);
                }
                Some(deadline) if *deadline <= now => expired.push(*ref_id),
                Some(_) => {}
            }
        }

        for ref_id in &expired {
            orders.remove(ref_id);
            deadlines.remove(ref_id);
            tracing::debug!(ref_id, "Evicted terminal order");
        }

        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().orders.is_empty()
    }
}

impl Default for OrderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer<Order> for OrderCache {
    fn notify(&self, order: &Order) {
        self.add(order.clone());
    }
}

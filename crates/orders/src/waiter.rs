//! One-shot correlation of a submission with its confirming order event

use tokio::sync::{mpsc, Mutex};

use crate::dispatcher::Observer;
use crate::types::{Order, RefId};

/// Observer that resolves once an order with a given ref id is seen.
///
/// The slot holds a single value; later matches are dropped until it is
/// drained, so the first confirmation wins.
pub struct Waiter {
    ref_id: RefId,
    tx: mpsc::Sender<Order>,
    rx: Mutex<mpsc::Receiver<Order>>,
}

impl Waiter {
    pub fn new(ref_id: RefId) -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            ref_id,
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn ref_id(&self) -> RefId {
        self.ref_id
    }

    /// Suspend until a matching order is deposited.
    ///
    /// Returns `None` only if the slot can never be filled.
    pub async fn wait(&self) -> Option<Order> {
        self.rx.lock().await.recv().await
    }
}

impl Observer<Order> for Waiter {
    fn notify(&self, order: &Order) {
        if order.ref_id != self.ref_id {
            return;
        }
        if self.tx.try_send(order.clone()).is_err() {
            tracing::debug!(ref_id = self.ref_id, "Waiter already resolved, dropping duplicate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderStatus;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_on_matching_ref_id() {
        let waiter = Waiter::new(112233);
        waiter.notify(&Order::new("ABCDEF-ABCD2-ABCDE3", 112233, OrderStatus::Open));

        let order = waiter.wait().await.unwrap();
        assert_eq!(order.order_id, "ABCDEF-ABCD2-ABCDE3");
        assert_eq!(order.status, OrderStatus::Open);
    }

    #[tokio::test]
    async fn test_ignores_other_ref_ids() {
        let waiter = Waiter::new(1);
        waiter.notify(&Order::new("X", 2, OrderStatus::Open));

        let result = tokio::time::timeout(Duration::from_millis(20), waiter.wait()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let waiter = Waiter::new(5);
        waiter.notify(&Order::new("FIRST", 5, OrderStatus::Open));
        waiter.notify(&Order::rejected(5, "late"));

        let order = waiter.wait().await.unwrap();
        assert_eq!(order.order_id, "FIRST");

        let second = tokio::time::timeout(Duration::from_millis(20), waiter.wait()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_wait_suspends_until_notified() {
        let waiter = std::sync::Arc::new(Waiter::new(9));
        let pending = {
            let waiter = waiter.clone();
            tokio::spawn(async move { waiter.wait().await })
        };

        tokio::task::yield_now().await;
        waiter.notify(&Order::new("LATE", 9, OrderStatus::Pending));

        let order = pending.await.unwrap().unwrap();
        assert_eq!(order.order_id, "LATE");
    }
}

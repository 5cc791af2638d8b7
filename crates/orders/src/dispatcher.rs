//! Publish/subscribe dispatcher
//!
//! Decouples the single decoded event stream from any number of consumers.
//! Observers are identified by `Arc` pointer identity, so subscribing the
//! same handle twice is a no-op and unsubscribing needs the same handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Receives events fired by a [`Dispatcher`].
///
/// `notify` runs inside the dispatcher's critical section and must not block.
pub trait Observer<E>: Send + Sync {
    fn notify(&self, event: &E);
}

/// Thread-safe fan-out of events to subscribed observers
pub struct Dispatcher<E> {
    observers: Mutex<Vec<Arc<dyn Observer<E>>>>,
}

fn same_observer<E>(a: &Arc<dyn Observer<E>>, b: &Arc<dyn Observer<E>>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl<E> Dispatcher<E> {
    /// Create a dispatcher with no observers
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register an observer. Already registered handles are ignored.
    pub fn subscribe(&self, observer: Arc<dyn Observer<E>>) {
        let mut observers = self.observers.lock();
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return;
        }
        observers.push(observer);
    }

    /// Remove an observer. No-op if it is not registered.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer<E>>) {
        self.observers.lock().retain(|o| !same_observer(o, observer));
    }

    /// Notify every observer in subscription order.
    ///
    /// The whole fan-out happens under one lock, so each event is delivered
    /// to everyone before the next one starts.
    pub fn fire(&self, event: &E) {
        let observers = self.observers.lock();
        for observer in observers.iter() {
            observer.notify(event);
        }
    }

    /// Fire every event received until the channel closes.
    pub async fn read_from(&self, mut events: mpsc::Receiver<E>) {
        while let Some(event) = events.recv().await {
            self.fire(&event);
        }
        tracing::debug!("Dispatcher input closed");
    }

    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.lock().is_empty()
    }
}

impl<E> Default for Dispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        seen: Mutex<Vec<u32>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<u32> {
            self.seen.lock().clone()
        }
    }

    impl Observer<u32> for Recorder {
        fn notify(&self, event: &u32) {
            self.seen.lock().push(*event);
        }
    }

    #[test]
    fn test_observers_receive_every_event_in_order() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let a = Recorder::new();
        let b = Recorder::new();
        dispatcher.subscribe(a.clone());
        dispatcher.subscribe(b.clone());

        for i in 1..=3 {
            dispatcher.fire(&i);
        }

        assert_eq!(a.seen(), vec![1, 2, 3]);
        assert_eq!(b.seen(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unsubscribed_observer_receives_nothing() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let a = Recorder::new();
        let handle: Arc<dyn Observer<u32>> = a.clone();

        dispatcher.subscribe(handle.clone());
        dispatcher.fire(&1);
        dispatcher.unsubscribe(&handle);
        dispatcher.fire(&2);

        assert_eq!(a.seen(), vec![1]);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_subscribe_is_idempotent() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let a = Recorder::new();
        let handle: Arc<dyn Observer<u32>> = a.clone();

        dispatcher.subscribe(handle.clone());
        dispatcher.subscribe(handle.clone());
        assert_eq!(dispatcher.len(), 1);

        dispatcher.fire(&5);
        assert_eq!(a.seen(), vec![5]);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let registered = Recorder::new();
        dispatcher.subscribe(registered.clone());

        let stranger: Arc<dyn Observer<u32>> = Recorder::new();
        dispatcher.unsubscribe(&stranger);

        assert_eq!(dispatcher.len(), 1);
    }

    #[tokio::test]
    async fn test_read_from_drains_channel() {
        let dispatcher: Dispatcher<u32> = Dispatcher::new();
        let a = Recorder::new();
        dispatcher.subscribe(a.clone());

        let (tx, rx) = mpsc::channel(8);
        for i in 0..4 {
            tx.send(i).await.unwrap();
        }
        drop(tx);

        dispatcher.read_from(rx).await;
        assert_eq!(a.seen(), vec![0, 1, 2, 3]);
    }
}

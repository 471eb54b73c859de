//! Exposure event fan-out.
//!
//! The native subsystem pushes a fresh `ExposureInfo` snapshot whenever it
//! finishes matching. Every subscriber gets its own queue and sees the
//! same immutable payload; subscribers share nothing else.
//!
//! Queues are unbounded: a slow subscriber falls behind but never loses an
//! event, so each notification gets exactly one reaction per subscriber.
//! No ordering is guaranteed between different subscribers' reactions to
//! the same event.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::ExposureInfo;

/// Immutable payload delivered to every subscriber.
pub type ExposureEvent = Arc<ExposureInfo>;

/// Sending side of the exposure event stream.
///
/// Clones share the same subscriber list. The stream ends for every
/// subscriber once the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct ExposureEventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<ExposureEvent>>>>,
}

impl ExposureEventBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to all current subscribers.
    ///
    /// Released subscriptions are pruned. Returns the number of subscribers
    /// that will see the event.
    pub fn emit(&self, info: ExposureInfo) -> usize {
        let event = Arc::new(info);
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(Arc::clone(&event)).is_ok());
        debug!(subscribers = subscribers.len(), exposures = event.len(), "exposure event emitted");
        subscribers.len()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> ExposureSubscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        ExposureSubscription { receiver }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().iter().filter(|tx| !tx.is_closed()).count()
    }
}

/// One subscriber's handle on the event stream.
///
/// Dropping it (or calling [`remove`](Self::remove)) releases the
/// subscription.
#[derive(Debug)]
pub struct ExposureSubscription {
    receiver: mpsc::UnboundedReceiver<ExposureEvent>,
}

impl ExposureSubscription {
    /// Wait for the next event, oldest first.
    ///
    /// Returns `None` once the bus is gone and every queued event was taken.
    pub async fn next(&mut self) -> Option<ExposureEvent> {
        self.receiver.recv().await
    }

    /// Events delivered but not yet taken.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Release the subscription.
    pub fn remove(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExposureRecord;

    fn info(id: &str) -> ExposureInfo {
        ExposureInfo::new(vec![ExposureRecord::new(id, 0, 10, 1, 1)])
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_same_payload() {
        let bus = ExposureEventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.emit(info("e1")), 2);

        let ea = a.next().await.unwrap();
        let eb = b.next().await.unwrap();
        assert!(Arc::ptr_eq(&ea, &eb));
        assert_eq!(ea.records()[0].id, "e1");
    }

    #[tokio::test]
    async fn test_remove_releases_subscription() {
        let bus = ExposureEventBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        sub.remove();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.emit(info("e1")), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_keeps_every_event() {
        let bus = ExposureEventBus::new();
        let mut sub = bus.subscribe();

        for i in 0..200 {
            bus.emit(info(&format!("e{}", i)));
        }
        assert_eq!(sub.pending(), 200);

        for i in 0..200 {
            let event = sub.next().await.unwrap();
            assert_eq!(event.records()[0].id, format!("e{}", i));
        }
        assert_eq!(sub.pending(), 0);
    }

    #[tokio::test]
    async fn test_emit_prunes_released_subscriptions() {
        let bus = ExposureEventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(bus.emit(info("e1")), 1);
        assert_eq!(kept.pending(), 1);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let bus = ExposureEventBus::new();
        let mut sub = bus.subscribe();
        bus.emit(info("e1"));
        drop(bus);

        assert_eq!(sub.next().await.unwrap().records()[0].id, "e1");
        assert!(sub.next().await.is_none());
    }
}

//! HMR broadcast bus.
//!
//! Every WebSocket registers a bounded channel under a topic when it opens.
//! Publishing fans a payload out to the topic's subscribers without
//! blocking: a full channel drops the message for that client, a closed one
//! removes the subscriber. Nothing is replayed to late joiners.

use devloop_hmr::{HmrMessage, HMR_TOPIC};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Per-client channel capacity.
pub const CLIENT_BUFFER: usize = 100;

/// Publish side of the HMR channel, as seen by the build pipeline.
pub trait Broadcaster: Send + Sync {
    /// Deliver `payload` to every subscriber of `topic`.
    fn publish(&self, topic: &str, payload: &str);
}

/// Serialize and publish an HMR message on the standard topic.
pub fn publish_message(bus: &dyn Broadcaster, message: &HmrMessage) {
    tracing::trace!("Publishing {} message", message.kind());
    bus.publish(HMR_TOPIC, &message.to_json());
}

struct Subscriber {
    topic: String,
    tx: mpsc::Sender<String>,
}

/// In-process topic registry backing the dev server's sockets.
#[derive(Default)]
pub struct HmrBus {
    subscribers: RwLock<HashMap<usize, Subscriber>>,
    next_id: AtomicUsize,
}

impl HmrBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    ///
    /// # Returns
    ///
    /// Subscriber ID and receiver for payloads
    pub fn subscribe(&self, topic: &str) -> (usize, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        self.subscribers.write().insert(
            id,
            Subscriber {
                topic: topic.to_string(),
                tx,
            },
        );
        (id, rx)
    }

    pub fn unsubscribe(&self, id: usize) {
        self.subscribers.write().remove(&id);
    }

    /// Number of registered subscribers across all topics.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Broadcaster for HmrBus {
    fn publish(&self, topic: &str, payload: &str) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, sub) in subscribers.iter().filter(|(_, s)| s.topic == topic) {
                match sub.tx.try_send(payload.to_string()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!("Client {} is lagging, message dropped", id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in closed {
                subscribers.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = HmrBus::new();
        let (id1, mut rx1) = bus.subscribe(HMR_TOPIC);
        let (id2, mut rx2) = bus.subscribe(HMR_TOPIC);
        assert_ne!(id1, id2);
        assert_eq!(bus.subscriber_count(), 2);

        publish_message(&bus, &HmrMessage::Reload);

        assert_eq!(rx1.recv().await.unwrap(), r#"{"type":"reload"}"#);
        assert_eq!(rx2.recv().await.unwrap(), r#"{"type":"reload"}"#);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = HmrBus::new();
        let (_, mut other) = bus.subscribe("other");
        let (_, mut hmr) = bus.subscribe(HMR_TOPIC);

        bus.publish(HMR_TOPIC, "x");
        assert_eq!(hmr.recv().await.unwrap(), "x");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn test_closed_subscriber_is_removed() {
        let bus = HmrBus::new();
        let (_, rx) = bus.subscribe(HMR_TOPIC);
        let (_, _keep) = bus.subscribe(HMR_TOPIC);
        drop(rx);

        bus.publish(HMR_TOPIC, "x");
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let bus = HmrBus::new();
        let (_, mut rx) = bus.subscribe(HMR_TOPIC);

        for i in 0..CLIENT_BUFFER + 5 {
            bus.publish(HMR_TOPIC, &i.to_string());
        }

        assert_eq!(bus.subscriber_count(), 1);
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, CLIENT_BUFFER);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let bus = HmrBus::new();
        publish_message(&bus, &HmrMessage::info("early"));

        let (_, mut rx) = bus.subscribe(HMR_TOPIC);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe() {
        let bus = HmrBus::new();
        let (id, _rx) = bus.subscribe(HMR_TOPIC);
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }
}

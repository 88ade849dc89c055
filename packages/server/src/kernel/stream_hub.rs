//! In-process pub/sub hub backing the realtime notifier.
//!
//! Topic-keyed `tokio::sync::broadcast` channels: the booking actions publish
//! post-commit snapshots, the SSE endpoint subscribes. The hub is decoupled
//! from the mutation path — a publish with no subscribers is a no-op, and a
//! slow subscriber lags (drops old messages) rather than blocking anyone.
//!
//! Payloads are `serde_json::Value`; the bookings domain owns the event
//! shapes (see `domains::bookings::events`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

#[derive(Clone)]
pub struct StreamHub {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    /// Default capacity holds a whole booking lifecycle many times over.
    pub fn new() -> Self {
        Self::with_capacity(128)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publishes to a topic. No-op when nobody is subscribed.
    pub async fn publish(&self, topic: &str, payload: serde_json::Value) {
        let topics = self.topics.read().await;
        if let Some(tx) = topics.get(topic) {
            // Send only errors when there are no receivers
            let _ = tx.send(payload);
        }
    }

    /// Subscribes to a topic, creating the channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drops channels nobody is listening to. Terminal bookings leave their
    /// topics behind once subscribers disconnect; the sweep calls this.
    pub async fn prune(&self) {
        let mut topics = self.topics.write().await;
        topics.retain(|_, tx| tx.receiver_count() > 0);
    }

    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.len()
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshots_arrive_in_publish_order() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe("booking:abc").await;

        for status in ["CONFIRMED", "EN_ROUTE", "IN_PROGRESS"] {
            hub.publish("booking:abc", serde_json::json!({"status": status}))
                .await;
        }

        for expected in ["CONFIRMED", "EN_ROUTE", "IN_PROGRESS"] {
            let got = rx.recv().await.unwrap();
            assert_eq!(got["status"], expected);
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.publish("booking:nobody", serde_json::json!({"status": "PENDING"}))
            .await;
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn both_parties_receive_the_same_snapshot() {
        let hub = StreamHub::new();
        let mut client_rx = hub.subscribe("booking:xyz").await;
        let mut provider_rx = hub.subscribe("booking:xyz").await;

        let payload = serde_json::json!({"status": "COMPLETED"});
        hub.publish("booking:xyz", payload.clone()).await;

        assert_eq!(client_rx.recv().await.unwrap(), payload);
        assert_eq!(provider_rx.recv().await.unwrap(), payload);
    }

    #[tokio::test]
    async fn prune_drops_abandoned_topics() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("booking:done").await;
        assert_eq!(hub.topic_count().await, 1);

        drop(rx);
        hub.prune().await;
        assert_eq!(hub.topic_count().await, 0);
    }
}

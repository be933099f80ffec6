// ── Push-notification bus ──
//
// Per-topic broadcast channels. The production bridge publishes raw
// payloads as they arrive from the backend process; consumers hold
// `Subscription` handles and drain them in their own loops.
//
// Delivery order is preserved per topic (one broadcast channel each);
// there is no ordering guarantee across topics.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

const TOPIC_CHANNEL_CAPACITY: usize = 256;

/// Pub/sub hub for backend push notifications.
///
/// Cheaply cloneable; all clones share the same topic channels.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    topics: DashMap<String, TopicChannel>,
}

struct TopicChannel {
    tx: broadcast::Sender<Arc<Value>>,
    /// Live subscription count, for teardown verification.
    subscribers: Arc<AtomicUsize>,
}

impl TopicChannel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(TOPIC_CHANNEL_CAPACITY);
        Self {
            tx,
            subscribers: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a payload on a topic. Returns how many subscriptions
    /// received it; events published with no subscribers are dropped.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        let channel = self
            .inner
            .topics
            .entry(topic.to_owned())
            .or_insert_with(TopicChannel::new);
        channel.tx.send(Arc::new(payload)).unwrap_or(0)
    }

    /// Open an independent subscription on a topic.
    ///
    /// Each subscription has its own receiver; subscriptions to the same
    /// topic never interfere with each other. Events published before the
    /// subscription was opened are not replayed.
    pub fn subscribe(&self, topic: &str) -> Subscription {
        let channel = self
            .inner
            .topics
            .entry(topic.to_owned())
            .or_insert_with(TopicChannel::new);
        channel.subscribers.fetch_add(1, Ordering::AcqRel);
        Subscription {
            topic: topic.to_owned(),
            rx: Some(channel.tx.subscribe()),
            subscribers: Arc::clone(&channel.subscribers),
        }
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.inner
            .topics
            .get(topic)
            .map_or(0, |c| c.subscribers.load(Ordering::Acquire))
    }
}

/// Handle for one topic subscription.
///
/// Dropping the handle unsubscribes; calling [`unsubscribe`]
/// (Subscription::unsubscribe) first is equivalent and idempotent — the
/// shared subscriber count is decremented exactly once either way.
pub struct Subscription {
    topic: String,
    rx: Option<broadcast::Receiver<Arc<Value>>>,
    subscribers: Arc<AtomicUsize>,
}

impl Subscription {
    /// Topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next payload, in publish order.
    ///
    /// Returns `None` once unsubscribed or when the bus is gone. A lagged
    /// receiver (consumer slower than the channel capacity) skips ahead
    /// with a warning instead of erroring out.
    pub async fn recv(&mut self) -> Option<Arc<Value>> {
        loop {
            let rx = self.rx.as_mut()?;
            match rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "event subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving. Safe to call multiple times and concurrently with
    /// teardown of the owning component.
    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            self.subscribers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

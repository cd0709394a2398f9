//! Where guide events go once published.
//!
//! The engine only sees [`EventBus`]. Shells pick a [`BroadcastEventBus`]
//! and subscribe to it; tests record into an [`InMemoryEventBus`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub trait EventBus: Send + Sync {
    /// Deliver `payload` on `topic` (e.g. "guide:playback_changed").
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

impl dyn EventBus {
    /// Serialize `event` and emit it. Events that fail to serialize are
    /// logged and dropped.
    pub fn publish<T: Serialize>(&self, topic: &str, event: &T) {
        match serde_json::to_value(event) {
            Ok(payload) => self.emit(topic, payload),
            Err(e) => tracing::error!(topic, error = %e, "Failed to serialize event"),
        }
    }
}

pub type EventBusRef = Arc<dyn EventBus>;

/// A published event as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl EmittedEvent {
    /// Decode the payload into one of the event types of this crate.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Fans events out to live subscribers.
///
/// Subscribers that fall more than `capacity` events behind lose the
/// oldest ones. Emitting with no subscribers is not an error.
pub struct BroadcastEventBus {
    tx: broadcast::Sender<EmittedEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmittedEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventBus for BroadcastEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        let _ = self.tx.send(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Records every event in publish order.
#[derive(Default)]
pub struct InMemoryEventBus {
    log: Mutex<Vec<EmittedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut Vec<EmittedEvent>) -> R) -> R {
        let mut log = self.log.lock().expect("event log mutex poisoned");
        f(&mut log)
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.with_log(|log| log.clone())
    }

    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.with_log(|log| log.iter().filter(|e| e.topic == topic).cloned().collect())
    }

    /// Topics in the order they were published.
    pub fn topics(&self) -> Vec<String> {
        self.with_log(|log| log.iter().map(|e| e.topic.clone()).collect())
    }

    pub fn last_payload(&self, topic: &str) -> Option<serde_json::Value> {
        self.with_log(|log| {
            log.iter()
                .rev()
                .find(|e| e.topic == topic)
                .map(|e| e.payload.clone())
        })
    }

    /// The most recent event on `topic`, decoded.
    pub fn last<T: DeserializeOwned>(&self, topic: &str) -> Option<T> {
        self.last_payload(topic)
            .and_then(|payload| serde_json::from_value(payload).ok())
    }

    pub fn clear(&self) {
        self.with_log(|log| log.clear());
    }

    pub fn len(&self) -> usize {
        self.with_log(|log| log.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.with_log(|log| {
            log.push(EmittedEvent {
                topic: topic.to_string(),
                payload,
            })
        });
    }
}

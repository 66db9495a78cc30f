//! Event bus for probe notifications.
//!
//! Typed publish/subscribe over `tokio::sync::broadcast`, one channel per
//! event type, plus a wildcard stream carrying every event as JSON.
//! Publishing with nobody listening is a no-op.
//!
//! # Example
//!
//! ```ignore
//! let bus = Bus::new();
//!
//! let mut rx = bus.subscribe::<ProbeFailed>().await;
//! tokio::spawn(async move {
//!     while let Ok(event) = rx.recv().await {
//!         println!("{} is down: {}", event.entry_id, event.reason);
//!     }
//! });
//! ```

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::RwLock;

/// Default channel capacity.
const DEFAULT_CAPACITY: usize = 256;

/// Trait for events that can be published on the bus.
pub trait Event: Clone + Send + Sync + 'static {
    /// Event type name for serialization/logging.
    fn event_type() -> &'static str;
}

/// The event bus for pub/sub communication.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<BusInner>,
}

struct BusInner {
    /// Typed channels by TypeId.
    channels: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    /// Receives every event as JSON.
    wildcard: broadcast::Sender<BusEvent>,
}

/// A serialized event for wildcard subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
}

impl Bus {
    pub fn new() -> Self {
        let (wildcard, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                channels: RwLock::new(HashMap::new()),
                wildcard,
            }),
        }
    }

    /// Publish an event to all subscribers.
    pub async fn publish<E: Event + Serialize>(&self, event: E) {
        let type_id = TypeId::of::<E>();

        let channels = self.inner.channels.read().await;
        if let Some(tx) = channels
            .get(&type_id)
            .and_then(|sender| sender.downcast_ref::<broadcast::Sender<E>>())
        {
            // No receivers is fine.
            let _ = tx.send(event.clone());
        }
        drop(channels);

        if let Ok(payload) = serde_json::to_value(&event) {
            let _ = self.inner.wildcard.send(BusEvent {
                event_type: E::event_type().to_string(),
                payload,
            });
        }
    }

    /// Subscribe to events of type E.
    pub async fn subscribe<E: Event>(&self) -> broadcast::Receiver<E> {
        let type_id = TypeId::of::<E>();

        {
            let channels = self.inner.channels.read().await;
            if let Some(tx) = channels
                .get(&type_id)
                .and_then(|sender| sender.downcast_ref::<broadcast::Sender<E>>())
            {
                return tx.subscribe();
            }
        }

        // Another subscriber may have raced us here; reuse its channel.
        let mut channels = self.inner.channels.write().await;
        if let Some(tx) = channels
            .get(&type_id)
            .and_then(|sender| sender.downcast_ref::<broadcast::Sender<E>>())
        {
            return tx.subscribe();
        }
        let (tx, rx) = broadcast::channel::<E>(DEFAULT_CAPACITY);
        channels.insert(type_id, Box::new(tx));
        rx
    }

    /// Subscribe to all events (wildcard).
    pub fn subscribe_all(&self) -> broadcast::Receiver<BusEvent> {
        self.inner.wildcard.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

//! Current snapshot plus the set of live subscribers
//!
//! The hub is the only holder of the shared snapshot. The snapshot, its
//! serialized payload and the subscriber map sit behind one lock, so a new
//! subscriber is registered and handed the current payload atomically with
//! respect to publishing: it can never see a newer snapshot first.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::ResultSnapshot;

/// Default per-subscriber queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Receiving end handed to one subscriber connection
#[derive(Debug)]
pub struct Subscription {
    pub id: Uuid,
    pub receiver: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that got the payload queued
    pub delivered: usize,
    /// Subscribers found closed and removed
    pub dropped: usize,
    /// Subscribers whose queue was full; they miss this snapshot
    pub skipped: usize,
}

struct HubState {
    snapshot: Arc<ResultSnapshot>,
    payload: Arc<str>,
    subscribers: HashMap<Uuid, mpsc::Sender<Arc<str>>>,
}

/// Shared state and best-effort fan-out to subscribers
pub struct SubscriberHub {
    state: RwLock<HubState>,
    queue_capacity: usize,
}

impl SubscriberHub {
    /// Create a hub serving `initial` until the first publish
    pub fn new(initial: ResultSnapshot) -> serde_json::Result<Self> {
        Self::with_queue_capacity(initial, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(
        initial: ResultSnapshot,
        queue_capacity: usize,
    ) -> serde_json::Result<Self> {
        let payload: Arc<str> = initial.to_json()?.into();
        Ok(Self {
            state: RwLock::new(HubState {
                snapshot: Arc::new(initial),
                payload,
                subscribers: HashMap::new(),
            }),
            queue_capacity: queue_capacity.max(1),
        })
    }

    /// Register a subscriber; its queue already holds the current payload
    pub async fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();

        let mut state = self.state.write().await;
        // Fresh queue with capacity >= 1; cannot be full
        let _ = sender.try_send(state.payload.clone());
        state.subscribers.insert(id, sender);

        tracing::debug!(subscriber = %id, total = state.subscribers.len(), "Subscriber connected");
        Subscription { id, receiver }
    }

    /// Remove a subscriber; unknown ids are ignored
    pub async fn unsubscribe(&self, id: Uuid) {
        let mut state = self.state.write().await;
        if state.subscribers.remove(&id).is_some() {
            tracing::debug!(subscriber = %id, total = state.subscribers.len(), "Subscriber disconnected");
        }
    }

    /// Replace the current snapshot and push it to every subscriber
    ///
    /// Serializes once. A closed subscriber is dropped from the set; a full
    /// one misses this snapshot. Neither affects delivery to the others.
    pub async fn publish(&self, snapshot: ResultSnapshot) -> serde_json::Result<PublishReport> {
        let payload: Arc<str> = snapshot.to_json()?.into();
        let mut report = PublishReport::default();

        let mut state = self.state.write().await;
        state.snapshot = Arc::new(snapshot);
        state.payload = payload.clone();

        state.subscribers.retain(|id, sender| match sender.try_send(payload.clone()) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(subscriber = %id, "Subscriber lagging, skipping snapshot");
                report.skipped += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                report.dropped += 1;
                false
            }
        });

        Ok(report)
    }

    /// Current snapshot
    pub async fn snapshot(&self) -> Arc<ResultSnapshot> {
        self.state.read().await.snapshot.clone()
    }

    /// Current snapshot exactly as sent to subscribers
    pub async fn payload(&self) -> Arc<str> {
        self.state.read().await.payload.clone()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.state.read().await.subscribers.len()
    }
}

impl std::fmt::Debug for SubscriberHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberHub")
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

//! Subscriber registry implementation
//!
//! The set of live downstream connections and the fan-out over them.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, RwLock};

use super::config::RegistryConfig;
use super::entry::{
    DeliveryFailure, SubscriberEntry, SubscriberId, SubscriberInfo, SubscriberState,
};
use super::error::RegistryError;

/// Result of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Subscribers the frame was queued for
    pub delivered: usize,
    /// Subscribers removed because their queue was closed or full
    pub dropped: usize,
}

/// Registry of all connected subscribers
///
/// Thread-safe via `RwLock`. Fan-out only needs the read lock; the write lock
/// is taken for registration, removal and post-pass cleanup.
pub struct SubscriberRegistry {
    /// Map of subscriber handle to entry
    subscribers: RwLock<HashMap<SubscriberId, SubscriberEntry>>,

    /// Source of subscriber handles
    next_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber handle and the receiving half of its frame
    /// queue, which the connection task drains onto the socket. Fails only
    /// when `max_subscribers` is set and reached.
    pub async fn register(
        &self,
        peer_addr: Option<SocketAddr>,
    ) -> Result<(SubscriberId, mpsc::Receiver<Bytes>), RegistryError> {
        let mut subscribers = self.subscribers.write().await;

        let max = self.config.max_subscribers;
        if max > 0 && subscribers.len() >= max {
            return Err(RegistryError::Full { max });
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        subscribers.insert(id, SubscriberEntry::new(id, peer_addr, tx));

        tracing::info!(
            subscriber = %id,
            peer = ?peer_addr,
            subscribers = subscribers.len(),
            "Subscriber registered"
        );

        Ok((id, rx))
    }

    /// Mark a subscriber as closing so fan-out skips it
    pub async fn mark_closing(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;

        match subscribers.get_mut(&id) {
            Some(entry) => {
                entry.state = SubscriberState::Closing;
                true
            }
            None => false,
        }
    }

    /// Remove a subscriber
    ///
    /// Returns `false` if it was already gone (e.g. evicted by a fan-out pass).
    pub async fn unregister(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write().await;

        if subscribers.remove(&id).is_some() {
            tracing::info!(
                subscriber = %id,
                subscribers = subscribers.len(),
                "Subscriber removed"
            );
            true
        } else {
            false
        }
    }

    /// Queue a frame for every active subscriber
    ///
    /// Never fails. The entries are snapshotted first, the frame is offered
    /// to each queue without waiting, and subscribers whose queue is closed
    /// or full are removed once the pass is over.
    pub async fn broadcast(&self, frame: Bytes) -> BroadcastOutcome {
        let targets: Vec<(SubscriberId, mpsc::Sender<Bytes>)> = {
            let subscribers = self.subscribers.read().await;
            subscribers
                .values()
                .filter(|entry| entry.is_active())
                .map(|entry| (entry.id, entry.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut failed = Vec::new();

        for (id, tx) in &targets {
            match SubscriberEntry::try_deliver(tx, frame.clone()) {
                Ok(()) => delivered += 1,
                Err(DeliveryFailure::Lagging) => {
                    tracing::warn!(subscriber = %id, "Subscriber queue full, evicting");
                    failed.push(*id);
                }
                Err(DeliveryFailure::Closed) => {
                    tracing::debug!(subscriber = %id, "Subscriber queue closed");
                    failed.push(*id);
                }
            }
        }

        let mut dropped = 0;
        if !failed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &failed {
                if let Some(entry) = subscribers.remove(id) {
                    dropped += 1;
                    tracing::info!(
                        subscriber = %id,
                        peer = ?entry.peer_addr,
                        subscribers = subscribers.len(),
                        "Subscriber dropped after failed delivery"
                    );
                }
            }
        }

        BroadcastOutcome { delivered, dropped }
    }

    /// Remove every subscriber, closing all queues
    pub async fn clear(&self) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    /// Number of registered subscribers
    pub async fn len(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Whether there are no subscribers
    pub async fn is_empty(&self) -> bool {
        self.subscribers.read().await.is_empty()
    }

    /// Whether a subscriber is registered
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Snapshot of all subscribers, ordered by handle
    pub async fn subscribers(&self) -> Vec<SubscriberInfo> {
        let subscribers = self.subscribers.read().await;
        let mut infos: Vec<SubscriberInfo> = subscribers.values().map(|e| e.info()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

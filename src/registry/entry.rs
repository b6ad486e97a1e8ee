//! Subscriber entry and state types
//!
//! This module defines the per-subscriber state stored in the registry.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Opaque subscriber handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(super) u64);

impl SubscriberId {
    /// Numeric value, for logging
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// State of a subscriber entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Receiving broadcasts
    Active,
    /// Connection is going away, skipped by fan-out until removed
    Closing,
}

/// Why a frame could not be queued for a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeliveryFailure {
    /// The connection task is gone
    Closed,
    /// The queue is full, the subscriber cannot keep up
    Lagging,
}

/// Entry for a single subscriber in the registry
#[derive(Debug)]
pub struct SubscriberEntry {
    /// Subscriber handle
    pub id: SubscriberId,

    /// Remote peer address, when known
    pub peer_addr: Option<SocketAddr>,

    /// Current state
    pub state: SubscriberState,

    /// When the subscriber was registered
    pub connected_at: Instant,

    /// Sending half of the connection task's frame queue
    pub(super) tx: mpsc::Sender<Bytes>,
}

impl SubscriberEntry {
    pub(super) fn new(
        id: SubscriberId,
        peer_addr: Option<SocketAddr>,
        tx: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            state: SubscriberState::Active,
            connected_at: Instant::now(),
            tx,
        }
    }

    /// Whether the entry takes part in fan-out
    pub fn is_active(&self) -> bool {
        self.state == SubscriberState::Active
    }

    /// Queue a frame without waiting
    pub(super) fn try_deliver(
        tx: &mpsc::Sender<Bytes>,
        frame: Bytes,
    ) -> Result<(), DeliveryFailure> {
        tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryFailure::Lagging,
            TrySendError::Closed(_) => DeliveryFailure::Closed,
        })
    }

    /// Frames currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Public view of this entry
    pub fn info(&self) -> SubscriberInfo {
        SubscriberInfo {
            id: self.id,
            peer_addr: self.peer_addr,
            state: self.state,
            connected_for: self.connected_at.elapsed(),
            queued: self.queued(),
        }
    }
}

/// Snapshot of a subscriber
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    /// Subscriber handle
    pub id: SubscriberId,
    /// Remote peer address
    pub peer_addr: Option<SocketAddr>,
    /// Current state
    pub state: SubscriberState,
    /// Time since registration
    pub connected_for: Duration,
    /// Frames waiting to be written
    pub queued: usize,
}

//! Counters for the ingestion adapter, the relay and the consumer
//!
//! Shared counters use relaxed atomics so they can be bumped from any task
//! without locking. `snapshot()` copies them into a plain value for logging.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Ingestion adapter counters
#[derive(Debug, Default)]
pub struct IngestStats {
    messages_received: AtomicU64,
    messages_skipped: AtomicU64,
    records_matched: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStatsSnapshot {
    /// Upstream messages seen
    pub messages_received: u64,
    /// Messages that could not be decoded
    pub messages_skipped: u64,
    /// Records that passed the filter
    pub records_matched: u64,
}

impl IngestStats {
    /// Create zeroed ingestion counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.messages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_matched(&self) {
        self.records_matched.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_skipped: self.messages_skipped.load(Ordering::Relaxed),
            records_matched: self.records_matched.load(Ordering::Relaxed),
        }
    }
}

/// Relay-wide counters
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    records_broadcast: AtomicU64,
    frames_queued: AtomicU64,
    subscribers_accepted: AtomicU64,
    subscribers_dropped: AtomicU64,
    subscribers_refused: AtomicU64,
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Records handed to the fan-out
    pub records_broadcast: u64,
    /// Frames queued across all subscribers
    pub frames_queued: u64,
    /// Connections accepted as subscribers
    pub subscribers_accepted: u64,
    /// Subscribers evicted after a failed or lagging delivery
    pub subscribers_dropped: u64,
    /// Connections refused because the registry was full
    pub subscribers_refused: u64,
    /// Time since the relay started
    pub uptime: Duration,
}

impl RelayStats {
    /// Create zeroed counters, starting the uptime clock
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            records_broadcast: AtomicU64::new(0),
            frames_queued: AtomicU64::new(0),
            subscribers_accepted: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
            subscribers_refused: AtomicU64::new(0),
        }
    }

    /// Account for one fan-out pass
    pub(crate) fn record_broadcast(&self, delivered: usize, dropped: usize) {
        self.records_broadcast.fetch_add(1, Ordering::Relaxed);
        self.frames_queued.fetch_add(delivered as u64, Ordering::Relaxed);
        self.subscribers_dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.subscribers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Account for a subscriber whose own write failed
    pub(crate) fn record_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_refused(&self) {
        self.subscribers_refused.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            records_broadcast: self.records_broadcast.load(Ordering::Relaxed),
            frames_queued: self.frames_queued.load(Ordering::Relaxed),
            subscribers_accepted: self.subscribers_accepted.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            subscribers_refused: self.subscribers_refused.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer-side counters
///
/// Owned by the consumer, so plain integers are enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Frames decoded and handed out
    pub frames_received: u64,
    /// Connection attempts, successful or not
    pub connect_attempts: u64,
    /// Attempts that reached the connected state
    pub connects: u64,
    /// Connections lost after being established
    pub disconnects: u64,
    /// Bytes read from the relay
    pub bytes_received: u64,
}

impl ConsumerStats {
    /// Create zeroed consumer counters
    pub fn new() -> Self {
        Self::default()
    }
}

//! Consumer connection state machine
//!
//! Tracks where the consumer is between connection attempts and when the
//! next attempt is allowed.

use std::time::{Duration, Instant};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, waiting for the retry interval
    #[default]
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Transport open, reads are attempted on every poll
    Connected,
}

impl ConnectionState {
    /// Check if a transport is open
    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Fixed-interval gate on connection attempts
///
/// The clock starts at the attempt, not at the failure.
#[derive(Debug, Clone)]
pub struct RetryGate {
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl RetryGate {
    /// Create a gate that allows its first attempt immediately
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_attempt: None,
        }
    }

    /// Whether an attempt may be made at `now`
    ///
    /// Always true before the first attempt.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        }
    }

    /// Record an attempt made at `now`
    pub fn record_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(now);
    }

    /// Minimum time between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

//! Relay server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Default listen address for subscribers
pub const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 12345);

/// Relay server options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Upper bound on writing and flushing one frame to a subscriber
    pub write_timeout: Duration,

    /// Buffer used to read (and discard) subscriber input
    pub read_buffer_size: usize,

    /// Records that may wait between ingestion and fan-out
    pub record_channel_capacity: usize,

    /// How long subscribers get to receive queued frames once ingestion ends
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            tcp_nodelay: true, // Important for low latency
            write_timeout: Duration::from_secs(5),
            read_buffer_size: 1024,
            record_channel_capacity: 4096,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the per-frame write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the drain timeout used when ingestion ends
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the ingestion to fan-out channel capacity (at least 1)
    pub fn record_channel_capacity(mut self, capacity: usize) -> Self {
        self.record_channel_capacity = capacity.max(1);
        self
    }
}

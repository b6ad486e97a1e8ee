//! Consumer configuration

use std::time::Duration;

use crate::protocol::DEFAULT_MAX_LINE_LENGTH;

/// Default relay address consumers connect to
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:12345";

/// Reconnecting consumer options
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Relay address (`host:port`)
    pub server_addr: String,

    /// Minimum time between two connection attempts
    pub retry_interval: Duration,

    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,

    /// Bytes read from the socket per poll
    pub read_chunk_size: usize,

    /// Longest line the codec buffers before discarding it
    pub max_line_length: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            retry_interval: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            read_chunk_size: 4096,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl ConsumerConfig {
    /// Create a config for the given relay address
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            ..Default::default()
        }
    }

    /// Set the retry interval
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-poll read size (at least 1)
    pub fn read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Set the line length limit
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.max_line_length = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConsumerConfig::default();

        assert_eq!(config.server_addr, "127.0.0.1:12345");
        assert_eq!(config.retry_interval, Duration::from_secs(2));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.read_chunk_size, 4096);
        assert_eq!(config.max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ConsumerConfig::new("10.0.0.2:9000")
            .retry_interval(Duration::from_millis(500))
            .connect_timeout(Duration::from_millis(200))
            .read_chunk_size(0)
            .max_line_length(128);

        assert_eq!(config.server_addr, "10.0.0.2:9000");
        assert_eq!(config.retry_interval, Duration::from_millis(500));
        assert_eq!(config.connect_timeout, Duration::from_millis(200));
        assert_eq!(config.read_chunk_size, 1);
        assert_eq!(config.max_line_length, 128);
    }
}

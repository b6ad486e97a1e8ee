//! Reconnecting line-protocol consumer
//!
//! A poll-driven client for the relay. Each call to [`ReconnectingConsumer::poll`]
//! either makes one connection attempt (when disconnected and the retry
//! interval has passed) or one non-blocking read, and returns whatever frames
//! that read completed. Nothing in a poll waits on the network except the
//! connection attempt, which is bounded by `connect_timeout`.

use std::io;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::error::{Error, Result};
use crate::protocol::{Frame, LineCodec};
use crate::stats::ConsumerStats;

use super::config::ConsumerConfig;
use super::state::{ConnectionState, RetryGate};

/// Consumer that keeps a connection to the relay alive
///
/// # Example
/// ```no_run
/// use feedcast::client::{ConsumerConfig, ReconnectingConsumer};
///
/// # async fn example() {
/// let mut consumer = ReconnectingConsumer::new(ConsumerConfig::new("127.0.0.1:12345"));
///
/// loop {
///     for frame in consumer.poll().await {
///         println!("{}", frame.text);
///     }
///     tokio::time::sleep(std::time::Duration::from_millis(16)).await;
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct ReconnectingConsumer {
    config: ConsumerConfig,
    state: ConnectionState,
    stream: Option<TcpStream>,
    codec: LineCodec,
    retry: RetryGate,
    read_buf: Vec<u8>,
    stats: ConsumerStats,
}

impl ReconnectingConsumer {
    /// Create a disconnected consumer. The first poll connects immediately.
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            stream: None,
            codec: LineCodec::with_max_line_length(config.max_line_length),
            retry: RetryGate::new(config.retry_interval),
            read_buf: vec![0u8; config.read_chunk_size.max(1)],
            stats: ConsumerStats::new(),
            config,
        }
    }

    /// Poll using the current time
    pub async fn poll(&mut self) -> Vec<Frame> {
        self.poll_at(Instant::now()).await
    }

    /// Advance the state machine as of `now`
    ///
    /// Returns the frames completed by this poll's read, in stream order.
    pub async fn poll_at(&mut self, now: Instant) -> Vec<Frame> {
        if self.stream.is_none() {
            if !self.retry.is_due(now) {
                return Vec::new();
            }
            self.retry.record_attempt(now);

            if !self.try_connect().await {
                return Vec::new();
            }
        }

        self.read_available()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Number of connection attempts so far
    pub fn connect_attempts(&self) -> u64 {
        self.stats.connect_attempts
    }

    /// Consumer counters
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// Bytes held in the read buffer awaiting a separator
    pub fn buffered_len(&self) -> usize {
        self.codec.buffered_len()
    }

    /// Consumer configuration
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Drop the connection and the read buffer
    ///
    /// The next attempt still honours the retry interval.
    pub fn disconnect(&mut self) {
        self.drop_connection("closed locally");
    }

    /// Poll every `poll_interval` and forward frames until `tx` is dropped.
    pub async fn run(&mut self, tx: mpsc::Sender<Frame>, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'outer: loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => break,
            }

            for frame in self.poll().await {
                if tx.send(frame).await.is_err() {
                    break 'outer;
                }
            }
        }

        tracing::debug!("Frame receiver dropped, stopping consumer");
        self.disconnect();
    }

    async fn try_connect(&mut self) -> bool {
        self.state = ConnectionState::Connecting;
        self.stats.connect_attempts += 1;
        tracing::debug!(addr = %self.config.server_addr, "Connecting to relay");

        match self.connect().await {
            Ok(stream) => {
                tracing::info!(addr = %self.config.server_addr, "Connected to relay");
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                self.stats.connects += 1;
                true
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!(
                        addr = %self.config.server_addr,
                        error = %e,
                        retry_in = ?self.retry.interval(),
                        "Connection failed, will retry"
                    );
                } else {
                    tracing::error!(addr = %self.config.server_addr, error = %e, "Connection failed");
                }
                self.state = ConnectionState::Disconnected;
                false
            }
        }
    }

    async fn connect(&self) -> Result<TcpStream> {
        let limit = self.config.connect_timeout;
        let attempt = TcpStream::connect(self.config.server_addr.as_str());

        match tokio::time::timeout(limit, attempt).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(Error::ConnectTimeout(limit)),
        }
    }

    /// One non-blocking read
    fn read_available(&mut self) -> Vec<Frame> {
        let Some(stream) = self.stream.as_ref() else {
            return Vec::new();
        };

        match stream.try_read(&mut self.read_buf) {
            Ok(0) => {
                self.drop_connection("closed by relay");
                Vec::new()
            }
            Ok(n) => {
                self.stats.bytes_received += n as u64;
                let frames = self.codec.decode(&self.read_buf[..n]);
                self.stats.frames_received += frames.len() as u64;
                frames
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Read from relay failed");
                self.drop_connection("read error");
                Vec::new()
            }
        }
    }

    fn drop_connection(&mut self, reason: &str) {
        if self.stream.take().is_some() {
            self.stats.disconnects += 1;
            tracing::info!(
                addr = %self.config.server_addr,
                reason,
                discarded = self.codec.buffered_len(),
                "Disconnected from relay"
            );
        }

        self.codec.clear();
        self.state = ConnectionState::Disconnected;
    }
}

//! Relay server listener
//!
//! Handles the TCP accept loop, spawns one connection task per subscriber
//! and fans ingested records out through the registry.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::ingest::EventRecord;
use crate::protocol::Frame;
use crate::registry::{BroadcastOutcome, RegistryConfig, SubscriberRegistry};
use crate::server::config::ServerConfig;
use crate::server::connection::SubscriberConnection;
use crate::stats::RelayStats;

/// Broadcast relay
///
/// # Example
/// ```no_run
/// use feedcast::filter::FilterConfig;
/// use feedcast::ingest::{IngestAdapter, IngestConfig};
/// use feedcast::server::{RelayServer, ServerConfig};
///
/// # async fn example() -> feedcast::error::Result<()> {
/// let config = ServerConfig::default();
/// let (tx, rx) = tokio::sync::mpsc::channel(config.record_channel_capacity);
///
/// let server = RelayServer::bind(config).await?;
/// let adapter = IngestAdapter::new(IngestConfig::default(), FilterConfig::pass_through());
///
/// server
///     .run_until(rx, adapter.run(tx), async {
///         let _ = tokio::signal::ctrl_c().await;
///     })
///     .await
/// # }
/// ```
pub struct RelayServer {
    config: ServerConfig,
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    shutdown_tx: watch::Sender<bool>,
}

impl RelayServer {
    /// Bind the listener with the default registry configuration
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        Self::bind_with_registry_config(config, RegistryConfig::default()).await
    }

    /// Bind the listener with a custom registry configuration
    pub async fn bind_with_registry_config(
        config: ServerConfig,
        registry_config: RegistryConfig,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Relay listening for subscribers");

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            listener,
            registry: Arc::new(SubscriberRegistry::with_config(registry_config)),
            stats: Arc::new(RelayStats::new()),
            shutdown_tx,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Get a reference to the subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Relay counters
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Encode one record and queue it for every subscriber
    pub async fn broadcast(&self, record: &EventRecord) -> BroadcastOutcome {
        let frame = Frame::from(record).encode();
        let outcome = self.registry.broadcast(frame).await;
        self.stats.record_broadcast(outcome.delivered, outcome.dropped);

        tracing::debug!(
            cid = %record.source_id,
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            "Record broadcast"
        );

        outcome
    }

    /// Run the relay until the ingestion future ends
    pub async fn run<I>(&self, records: mpsc::Receiver<EventRecord>, ingest: I) -> Result<()>
    where
        I: Future<Output = Result<()>>,
    {
        self.run_until(records, ingest, std::future::pending()).await
    }

    /// Run the relay with graceful shutdown
    ///
    /// Drives the accept loop, the ingestion future and the fan-out of
    /// `records` concurrently. Returns `Ok` when `shutdown` resolves, and
    /// every connection task is told to stop at once.
    ///
    /// When ingestion ends instead (upstream lost), records already queued
    /// are still broadcast and subscribers get up to `drain_timeout` to
    /// receive them before the ingestion result is returned.
    pub async fn run_until<I, F>(
        &self,
        mut records: mpsc::Receiver<EventRecord>,
        ingest: I,
        shutdown: F,
    ) -> Result<()>
    where
        I: Future<Output = Result<()>>,
        F: Future<Output = ()>,
    {
        let (result, graceful) = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                (Ok(()), false)
            }
            result = self.accept_loop() => (result, false),
            result = self.relay_records(&mut records, ingest) => (result, true),
        };

        self.shutdown_connections(graceful).await;

        result
    }

    /// Broadcast records until ingestion ends, then flush what it left queued.
    async fn relay_records<I>(
        &self,
        records: &mut mpsc::Receiver<EventRecord>,
        ingest: I,
    ) -> Result<()>
    where
        I: Future<Output = Result<()>>,
    {
        tokio::pin!(ingest);

        loop {
            tokio::select! {
                record = records.recv() => match record {
                    Some(record) => {
                        self.broadcast(&record).await;
                    }
                    None => {
                        tracing::warn!("Record channel closed");
                        return Err(Error::ChannelClosed);
                    }
                },
                result = &mut ingest => {
                    if let Err(ref e) = result {
                        tracing::error!(error = %e, "Ingestion stopped");
                    }

                    records.close();
                    while let Some(record) = records.recv().await {
                        self.broadcast(&record).await;
                    }

                    return result;
                }
            }
        }
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    if let Err(e) = self.handle_connection(socket, peer_addr).await {
                        tracing::warn!(peer = %peer_addr, error = %e, "Connection refused");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    async fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) -> Result<()> {
        let (id, frames) = match self.registry.register(Some(peer_addr)).await {
            Ok(registered) => registered,
            Err(e) => {
                self.stats.record_refused();
                return Err(e.into());
            }
        };
        self.stats.record_accepted();

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(subscriber = %id, error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let connection = SubscriberConnection::new(
            id,
            Some(peer_addr),
            socket,
            frames,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
            self.shutdown_tx.subscribe(),
            self.config.write_timeout,
            self.config.read_buffer_size,
        );

        tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                tracing::debug!(subscriber = %id, error = %e, "Subscriber connection error");
            }

            tracing::debug!(subscriber = %id, "Subscriber connection closed");
        });

        Ok(())
    }

    /// Stop every connection task
    ///
    /// Clearing the registry closes all frame queues. A graceful stop lets
    /// each task write what is still queued and waits for the tasks to
    /// finish, bounded by `drain_timeout`; otherwise the watch signal makes
    /// them abandon pending writes.
    async fn shutdown_connections(&self, graceful: bool) {
        if !graceful {
            self.shutdown_tx.send_replace(true);
        }

        let remaining = self.registry.clear().await;

        if graceful {
            let drained =
                tokio::time::timeout(self.config.drain_timeout, self.shutdown_tx.closed()).await;
            if drained.is_err() {
                tracing::warn!(
                    timeout = ?self.config.drain_timeout,
                    "Subscribers did not drain in time"
                );
                self.shutdown_tx.send_replace(true);
            }
        }

        let stats = self.stats.snapshot();
        tracing::info!(
            subscribers = remaining,
            records = stats.records_broadcast,
            uptime_secs = stats.uptime.as_secs(),
            "Relay stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;

    fn local_config() -> ServerConfig {
        ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    async fn wait_for_subscribers(registry: &SubscriberRegistry, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len().await != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscribers did not register in time");
    }

    #[tokio::test]
    async fn test_broadcast_over_tcp() {
        let server = Arc::new(RelayServer::bind(local_config()).await.unwrap());
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(16);

        let relay = Arc::clone(&server);
        let handle =
            tokio::spawn(async move { relay.run(rx, std::future::pending()).await });

        let a = TcpStream::connect(addr).await.unwrap();
        let b = TcpStream::connect(addr).await.unwrap();
        wait_for_subscribers(server.registry(), 2).await;

        tx.send(EventRecord::new("hello world", vec!["en".into()], "x1"))
            .await
            .unwrap();

        for stream in [a, b] {
            let mut lines = BufReader::new(stream).lines();
            assert_eq!(lines.next_line().await.unwrap().unwrap(), "NEW|hello world");
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_disconnected_subscriber_removed() {
        let server = Arc::new(RelayServer::bind(local_config()).await.unwrap());
        let addr = server.local_addr().unwrap();
        let (_tx, rx) = mpsc::channel(16);

        let relay = Arc::clone(&server);
        let handle =
            tokio::spawn(async move { relay.run(rx, std::future::pending()).await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        wait_for_subscribers(server.registry(), 1).await;

        stream.write_all(b"ignored by the relay\n").await.unwrap();
        drop(stream);
        wait_for_subscribers(server.registry(), 0).await;

        assert_eq!(server.stats().snapshot().subscribers_accepted, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_subscriber_limit_refuses() {
        let server = Arc::new(
            RelayServer::bind_with_registry_config(
                local_config(),
                RegistryConfig::default().max_subscribers(1),
            )
            .await
            .unwrap(),
        );
        let addr = server.local_addr().unwrap();
        let (_tx, rx) = mpsc::channel(16);

        let relay = Arc::clone(&server);
        let handle =
            tokio::spawn(async move { relay.run(rx, std::future::pending()).await });

        let _first = TcpStream::connect(addr).await.unwrap();
        wait_for_subscribers(server.registry(), 1).await;

        let mut second = BufReader::new(TcpStream::connect(addr).await.unwrap());
        let mut line = String::new();
        // refused connections are closed without any frame
        assert_eq!(second.read_line(&mut line).await.unwrap(), 0);

        assert_eq!(server.registry().len().await, 1);
        assert_eq!(server.stats().snapshot().subscribers_refused, 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_ingest_failure_is_fatal() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let (_tx, rx) = mpsc::channel(16);

        let result = server
            .run(rx, async { Err(Error::UpstreamClosed) })
            .await;

        assert!(matches!(result, Err(Error::UpstreamClosed)));
    }

    #[tokio::test]
    async fn test_queued_records_flushed_when_ingest_ends() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (tx, rx) = mpsc::channel(16);

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let mut received = Vec::new();
            while let Some(line) = lines.next_line().await.unwrap() {
                received.push(line);
            }
            received
        });

        // queue every record, then report the upstream as gone
        let registry = Arc::clone(server.registry());
        let ingest = async move {
            wait_for_subscribers(&registry, 1).await;
            for i in 0..5 {
                let record = EventRecord::new(format!("record {}", i), Vec::new(), "x");
                tx.send(record).await.map_err(|_| Error::ChannelClosed)?;
            }
            Err::<(), Error>(Error::UpstreamClosed)
        };

        let result = server.run(rx, ingest).await;
        assert!(matches!(result, Err(Error::UpstreamClosed)));
        assert_eq!(server.stats().snapshot().records_broadcast, 5);

        let expected: Vec<String> = (0..5).map(|i| format!("NEW|record {}", i)).collect();
        assert_eq!(client.await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_shutdown_clears_subscribers() {
        let server = RelayServer::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (_tx, rx) = mpsc::channel(16);

        let client = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            // relay closes the connection on shutdown
            lines.next_line().await.unwrap()
        });

        let registry = Arc::clone(server.registry());
        let shutdown = async move {
            wait_for_subscribers(&registry, 1).await;
        };

        let result = server
            .run_until(rx, std::future::pending(), shutdown)
            .await;
        assert!(result.is_ok());
        assert!(server.registry().is_empty().await);

        assert_eq!(client.await.unwrap(), None);
    }
}

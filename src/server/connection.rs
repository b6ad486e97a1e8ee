//! Per-subscriber connection task
//!
//! Owns the subscriber's transport. Frames queued by the registry are written
//! and flushed one at a time, in order; anything the subscriber sends is read
//! and thrown away. The task removes its own registry entry when it ends.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::stats::RelayStats;

/// A registered subscriber and the transport it writes to
pub(crate) struct SubscriberConnection<S> {
    id: SubscriberId,
    peer_addr: Option<SocketAddr>,
    stream: S,
    frames: mpsc::Receiver<Bytes>,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<RelayStats>,
    shutdown: watch::Receiver<bool>,
    write_timeout: Duration,
    read_buffer_size: usize,
}

impl<S> SubscriberConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: SubscriberId,
        peer_addr: Option<SocketAddr>,
        stream: S,
        frames: mpsc::Receiver<Bytes>,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<RelayStats>,
        shutdown: watch::Receiver<bool>,
        write_timeout: Duration,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            id,
            peer_addr,
            stream,
            frames,
            registry,
            stats,
            shutdown,
            write_timeout,
            read_buffer_size: read_buffer_size.max(1),
        }
    }

    /// Serve the subscriber until it disconnects, fails or the relay stops.
    pub(crate) async fn run(self) -> Result<()> {
        let id = self.id;
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        let result = self.serve().await;

        registry.mark_closing(id).await;
        if registry.unregister(id).await && result.is_err() {
            stats.record_dropped();
        }

        result
    }

    async fn serve(self) -> Result<()> {
        let Self {
            id,
            peer_addr,
            stream,
            mut frames,
            mut shutdown,
            write_timeout,
            read_buffer_size,
            ..
        } = self;

        if *shutdown.borrow() {
            return Ok(());
        }

        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut buf = vec![0u8; read_buffer_size];

        loop {
            tokio::select! {
                frame = frames.recv() => match frame {
                    Some(frame) => {
                        tokio::select! {
                            result = write_frame(&mut writer, &frame, write_timeout) => result?,
                            _ = shutdown.changed() => break,
                        }
                    }
                    None => {
                        tracing::debug!(subscriber = %id, "Frame queue closed");
                        break;
                    }
                },
                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        tracing::debug!(subscriber = %id, peer = ?peer_addr, "Subscriber closed connection");
                        break;
                    }
                    Ok(n) => {
                        tracing::trace!(
                            subscriber = %id,
                            bytes = n,
                            data = %String::from_utf8_lossy(&buf[..n]).trim(),
                            "Discarding subscriber input"
                        );
                    }
                    Err(e) => return Err(e.into()),
                },
                _ = shutdown.changed() => break,
            }
        }

        Ok(())
    }
}

/// Write and flush one frame, bounded by `limit`.
async fn write_frame<W>(writer: &mut W, frame: &[u8], limit: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let write = async {
        writer.write_all(frame).await?;
        writer.flush().await
    };

    match tokio::time::timeout(limit, write).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("frame write exceeded {:?}", limit),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    use super::*;
    use crate::protocol::encode_frame;

    struct Harness {
        registry: Arc<SubscriberRegistry>,
        stats: Arc<RelayStats>,
        shutdown_tx: watch::Sender<bool>,
    }

    impl Harness {
        fn new() -> Self {
            let (shutdown_tx, _) = watch::channel(false);
            Self {
                registry: Arc::new(SubscriberRegistry::new()),
                stats: Arc::new(RelayStats::new()),
                shutdown_tx,
            }
        }

        async fn connect<S>(&self, stream: S) -> (SubscriberId, tokio::task::JoinHandle<Result<()>>)
        where
            S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
        {
            let (id, frames) = self.registry.register(None).await.unwrap();
            let connection = SubscriberConnection::new(
                id,
                None,
                stream,
                frames,
                Arc::clone(&self.registry),
                Arc::clone(&self.stats),
                self.shutdown_tx.subscribe(),
                Duration::from_secs(1),
                64,
            );
            (id, tokio::spawn(connection.run()))
        }
    }

    #[tokio::test]
    async fn test_frames_written_in_order() {
        let harness = Harness::new();
        let (client, server) = duplex(1024);
        let (_id, _task) = harness.connect(server).await;

        for text in ["first", "second", "third"] {
            harness.registry.broadcast(encode_frame(text)).await;
        }

        let mut lines = BufReader::new(client).lines();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NEW|first");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NEW|second");
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "NEW|third");
    }

    #[tokio::test]
    async fn test_subscriber_input_is_discarded() {
        let harness = Harness::new();
        let (mut client, server) = duplex(1024);
        let (id, _task) = harness.connect(server).await;

        client.write_all(b"hello relay\n").await.unwrap();
        harness.registry.broadcast(encode_frame("still works")).await;

        let mut buf = vec![0u8; 32];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"NEW|still works\n");
        assert!(harness.registry.contains(id).await);
    }

    #[tokio::test]
    async fn test_disconnect_unregisters() {
        let harness = Harness::new();
        let (client, server) = duplex(1024);
        let (id, task) = harness.connect(server).await;
        assert!(harness.registry.contains(id).await);

        drop(client);

        assert!(task.await.unwrap().is_ok());
        assert!(!harness.registry.contains(id).await);
    }

    #[tokio::test]
    async fn test_shutdown_stops_connection() {
        let harness = Harness::new();
        let (_client, server) = duplex(1024);
        let (id, task) = harness.connect(server).await;

        harness.shutdown_tx.send_replace(true);

        assert!(task.await.unwrap().is_ok());
        assert!(!harness.registry.contains(id).await);
    }

    #[tokio::test]
    async fn test_write_timeout_fails_fast() {
        let harness = Harness::new();
        // tiny pipe that nobody drains
        let (_client, server) = duplex(8);
        let (id, _frames_rx) = harness.registry.register(None).await.unwrap();
        let (frames_tx, frames) = mpsc::channel(4);

        let connection = SubscriberConnection::new(
            id,
            None,
            server,
            frames,
            Arc::clone(&harness.registry),
            Arc::clone(&harness.stats),
            harness.shutdown_tx.subscribe(),
            Duration::from_millis(50),
            64,
        );
        let task = tokio::spawn(connection.run());

        frames_tx
            .send(encode_frame("this frame is longer than the pipe"))
            .await
            .unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(Error::Io(ref e)) if e.kind() == io::ErrorKind::TimedOut));
        assert!(!harness.registry.contains(id).await);
        assert_eq!(harness.stats.snapshot().subscribers_dropped, 1);
    }
}

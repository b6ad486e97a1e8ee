//! Upstream feed adapter

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::error::{Error, Result};
use crate::filter::FilterConfig;
use crate::stats::IngestStats;

use super::config::IngestConfig;
use super::record::{decode_message, EventRecord};

/// Consumes the upstream feed and emits filtered [`EventRecord`]s
///
/// # Example
/// ```no_run
/// use feedcast::filter::FilterConfig;
/// use feedcast::ingest::{EventRecord, IngestAdapter, IngestConfig};
///
/// # async fn example() -> feedcast::error::Result<()> {
/// let adapter = IngestAdapter::new(IngestConfig::default(), FilterConfig::from_args("rust", "en"));
/// let (tx, mut rx) = tokio::sync::mpsc::channel::<EventRecord>(1024);
///
/// tokio::spawn(async move {
///     while let Some(record) = rx.recv().await {
///         println!("{}", record.text);
///     }
/// });
///
/// // Only returns once the upstream connection is gone
/// adapter.run(tx).await
/// # }
/// ```
#[derive(Debug)]
pub struct IngestAdapter {
    config: IngestConfig,
    filter: FilterConfig,
    stats: Arc<IngestStats>,
}

impl IngestAdapter {
    /// Create a new adapter
    pub fn new(config: IngestConfig, filter: FilterConfig) -> Self {
        Self {
            config,
            filter,
            stats: Arc::new(IngestStats::new()),
        }
    }

    /// Adapter configuration
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Active filter
    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// Ingestion counters
    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Connect to the upstream feed and forward matching records.
    ///
    /// Never returns `Ok`: the connection closing yields
    /// [`Error::UpstreamClosed`], a transport failure [`Error::WebSocket`].
    pub async fn run(&self, records: mpsc::Sender<EventRecord>) -> Result<()> {
        tracing::info!(uri = %self.config.uri, "Connecting to upstream feed");

        let (ws_stream, _) = tokio_tungstenite::connect_async(self.config.uri.as_str()).await?;

        tracing::info!(
            uri = %self.config.uri,
            keyword = %self.filter.keyword(),
            languages = ?self.filter.languages(),
            "Connected to upstream feed"
        );

        self.run_stream(ws_stream, records).await
    }

    /// Forward matching records from an already established message stream.
    pub async fn run_stream<S>(
        &self,
        mut stream: S,
        records: mpsc::Sender<EventRecord>,
    ) -> Result<()>
    where
        S: Stream<Item = std::result::Result<Message, tungstenite::Error>> + Unpin,
    {
        while let Some(message) = stream.next().await {
            let record = match message? {
                Message::Text(text) => self.process(text.as_str()),
                Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => self.process(text),
                    Err(_) => {
                        self.stats.record_skipped();
                        tracing::trace!(len = data.len(), "Skipping non UTF-8 binary message");
                        None
                    }
                },
                Message::Close(frame) => {
                    tracing::info!(frame = ?frame, "Upstream sent close frame");
                    break;
                }
                _ => None,
            };

            if let Some(record) = record {
                records.send(record).await.map_err(|_| Error::ChannelClosed)?;
            }
        }

        tracing::warn!(uri = %self.config.uri, "Upstream feed closed");
        Err(Error::UpstreamClosed)
    }

    /// Decode and filter one upstream payload.
    pub fn process(&self, payload: &str) -> Option<EventRecord> {
        self.stats.record_received();

        let Some(record) = decode_message(payload) else {
            self.stats.record_skipped();
            return None;
        };

        if !self.filter.matches(&record.text, record.languages.as_slice()) {
            return None;
        }

        self.stats.record_matched();
        tracing::debug!(
            cid = %record.source_id,
            text = %record.preview(self.config.log_preview_chars),
            langs = ?record.languages,
            "Matched upstream record"
        );

        Some(record)
    }
}

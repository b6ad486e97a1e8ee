//! Ingestion configuration

/// Public Jetstream endpoint streaming `app.bsky.feed.post` commits
pub const DEFAULT_JETSTREAM_URI: &str =
    "wss://jetstream2.us-east.bsky.network/subscribe?wantedCollections=app.bsky.feed.post";

/// Upstream connection options
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// WebSocket URI of the upstream feed
    pub uri: String,

    /// Number of characters of post text included in match logs
    pub log_preview_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_JETSTREAM_URI.to_string(),
            log_preview_chars: 50,
        }
    }
}

impl IngestConfig {
    /// Create a config for the given upstream URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Set the log preview length
    pub fn log_preview_chars(mut self, chars: usize) -> Self {
        self.log_preview_chars = chars;
        self
    }
}

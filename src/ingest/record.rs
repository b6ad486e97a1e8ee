//! Normalized records and upstream message decoding

use serde::Deserialize;
use serde_json::Value;

/// Source id used when the upstream message carries no `commit.cid`
pub const UNKNOWN_SOURCE_ID: &str = "unknown";

/// A normalized upstream event that passed the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Post text
    pub text: String,
    /// Declared languages, in upstream order
    pub languages: Vec<String>,
    /// Opaque upstream identifier, only used for logging
    pub source_id: String,
}

impl EventRecord {
    /// Create a new record
    pub fn new(
        text: impl Into<String>,
        languages: Vec<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            languages,
            source_id: source_id.into(),
        }
    }

    /// First `max_chars` characters of the text, for log lines
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FeedMessage {
    #[serde(default)]
    commit: Option<Commit>,
}

#[derive(Debug, Default, Deserialize)]
struct Commit {
    #[serde(default)]
    cid: Option<String>,
    #[serde(default)]
    record: Option<PostRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct PostRecord {
    #[serde(default)]
    text: Option<String>,
    /// Kept loose so a stray non-string entry does not reject the message
    #[serde(default)]
    langs: Option<Vec<Value>>,
}

/// Decode one upstream JSON message into an unfiltered record.
///
/// Returns `None` when the payload is not a JSON object of the expected
/// shape. Missing `text`, `langs` or `cid` fields fall back to defaults.
pub fn decode_message(payload: &str) -> Option<EventRecord> {
    let message: FeedMessage = match serde_json::from_str(payload) {
        Ok(message) => message,
        Err(e) => {
            tracing::trace!(error = %e, "Skipping undecodable upstream message");
            return None;
        }
    };

    let commit = message.commit.unwrap_or_default();
    let record = commit.record.unwrap_or_default();

    let languages = record
        .langs
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect();

    Some(EventRecord {
        text: record.text.unwrap_or_default(),
        languages,
        source_id: commit.cid.unwrap_or_else(|| UNKNOWN_SOURCE_ID.to_string()),
    })
}

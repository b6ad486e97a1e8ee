//! Error types
//!
//! A single crate-wide [`Error`] with the component errors folded in via `From`.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the relay, the ingestion adapter and the consumer
#[derive(Debug, Error)]
pub enum Error {
    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream WebSocket failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Subscriber registry refused an operation
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The upstream feed ended
    #[error("Upstream feed closed")]
    UpstreamClosed,

    /// The record channel between ingestion and relay was dropped
    #[error("Record channel closed")]
    ChannelClosed,

    /// Connecting to the relay took longer than allowed
    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(Duration),
}

impl Error {
    /// Returns `true` for failures the consumer recovers from by reconnecting.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectTimeout(_))
    }
}

/// Line protocol errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A line that is neither `NEW` nor `NEW|<text>`
    #[error("Unrecognized frame: {0:?}")]
    UnrecognizedFrame(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let io = Error::from(std::io::Error::from(std::io::ErrorKind::ConnectionRefused));
        assert!(io.is_transient());
        assert!(Error::ConnectTimeout(Duration::from_secs(1)).is_transient());
        assert!(!Error::UpstreamClosed.is_transient());
        assert!(!Error::ChannelClosed.is_transient());
    }

    #[test]
    fn test_display() {
        let err = ProtocolError::UnrecognizedFrame("HELLO".into());
        assert_eq!(err.to_string(), "Unrecognized frame: \"HELLO\"");

        let err = Error::from(RegistryError::Full { max: 4 });
        assert_eq!(
            err.to_string(),
            "Registry error: Subscriber registry full (max 4)"
        );
    }
}

//! Broadcast relay
//!
//! Accepts downstream TCP connections, registers each as a subscriber and
//! fans every ingested record out as one encoded frame.

pub mod config;
pub(crate) mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use listener::RelayServer;

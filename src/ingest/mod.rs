//! Upstream ingestion
//!
//! The adapter holds a single WebSocket connection to the upstream feed,
//! decodes each message, applies the [`FilterConfig`](crate::filter::FilterConfig)
//! and hands matching [`EventRecord`]s to the relay over a bounded channel.
//!
//! ```text
//!   upstream (wss) ──► IngestAdapter ──► FilterConfig::matches
//!                                             │
//!                                             ▼
//!                                  mpsc::Sender<EventRecord> ──► RelayServer
//! ```
//!
//! Losing the upstream connection ends the adapter with an error. The relay
//! treats that as fatal.

pub mod adapter;
pub mod config;
pub mod record;

pub use adapter::IngestAdapter;
pub use config::{IngestConfig, DEFAULT_JETSTREAM_URI};
pub use record::{decode_message, EventRecord};

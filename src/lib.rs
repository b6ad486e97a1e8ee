//! # feedcast
//!
//! Relay a filtered upstream event feed to any number of TCP subscribers
//! over a line-delimited protocol, plus the reconnecting consumer that reads
//! it back.
//!
//! # Pipeline
//!
//! ```text
//!   Jetstream (wss)
//!        │
//!        ▼
//!   IngestAdapter ── FilterConfig ──► mpsc<EventRecord>
//!                                          │
//!                                          ▼
//!                                     RelayServer ── SubscriberRegistry
//!                                          │  "NEW|text\n"
//!                     ┌────────────────────┼────────────────────┐
//!                     ▼                    ▼                    ▼
//!             ReconnectingConsumer  ReconnectingConsumer   any TCP client
//! ```
//!
//! # Example
//!
//! ```no_run
//! use feedcast::client::{ConsumerConfig, ReconnectingConsumer};
//!
//! # async fn example() {
//! let mut consumer = ReconnectingConsumer::new(ConsumerConfig::default());
//! let (tx, mut rx) = tokio::sync::mpsc::channel::<feedcast::protocol::Frame>(64);
//!
//! tokio::spawn(async move {
//!     consumer.run(tx, std::time::Duration::from_millis(16)).await;
//! });
//!
//! while let Some(frame) = rx.recv().await {
//!     println!("{}", frame.text);
//! }
//! # }
//! ```

pub mod client;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stats;

pub use client::{ConnectionState, ConsumerConfig, ReconnectingConsumer};
pub use error::{Error, Result};
pub use filter::FilterConfig;
pub use ingest::{EventRecord, IngestAdapter, IngestConfig};
pub use protocol::{Frame, LineCodec};
pub use registry::{RegistryConfig, SubscriberRegistry};
pub use server::{RelayServer, ServerConfig};

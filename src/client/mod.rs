//! Reconnecting relay consumer
//!
//! The downstream side of the pipeline: connects (and reconnects) to the
//! relay, reads its byte stream without blocking and reassembles frames.

pub mod config;
pub mod consumer;
pub mod state;

pub use config::{ConsumerConfig, DEFAULT_SERVER_ADDR};
pub use consumer::ReconnectingConsumer;
pub use state::{ConnectionState, RetryGate};

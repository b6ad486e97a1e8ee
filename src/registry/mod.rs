//! Subscriber registry for broadcast fan-out
//!
//! The registry is the set of downstream connections that currently receive
//! broadcasts. It never owns a transport: each entry only holds the sending
//! half of a bounded frame queue that the connection's own task drains.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<SubscriberRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ subscribers: HashMap<Id,     │
//!                  │   SubscriberEntry {          │
//!                  │     tx: mpsc::Sender<Bytes>, │
//!                  │     state,                   │
//!                  │   }                          │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │ broadcast(frame)
//!         ┌───────────────────────┼───────────────────────┐
//!         ▼                       ▼                       ▼
//!   [queue #1]              [queue #2]              [queue #3]
//!   connection task         connection task         connection task
//!   write + flush ─► TCP    write + flush ─► TCP    write + flush ─► TCP
//! ```
//!
//! A fan-out pass works on a snapshot of the entries taken under the read
//! lock. Subscribers whose queue is closed or full are collected during the
//! pass and removed under the write lock once it completes, so a failing
//! subscriber never affects delivery to the others.
//!
//! # Zero-Copy Design
//!
//! Frames are `bytes::Bytes`, so every queue shares the same allocation.

pub mod config;
pub mod entry;
pub mod error;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{SubscriberEntry, SubscriberId, SubscriberInfo, SubscriberState};
pub use error::RegistryError;
pub use store::{BroadcastOutcome, SubscriberRegistry};

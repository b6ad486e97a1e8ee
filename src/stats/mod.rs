//! Statistics and counters

pub mod metrics;

pub use metrics::{ConsumerStats, IngestStats, IngestStatsSnapshot, RelayStats, RelayStatsSnapshot};

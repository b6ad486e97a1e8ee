//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The configured subscriber limit has been reached
    #[error("Subscriber registry full (max {max})")]
    Full {
        /// Configured limit
        max: usize,
    },
}

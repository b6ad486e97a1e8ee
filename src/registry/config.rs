//! Registry configuration

/// Subscriber registry options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Frames that may wait in one subscriber's queue before it is evicted
    pub queue_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 0, // Unlimited
            queue_capacity: 1024,
        }
    }
}

impl RegistryConfig {
    /// Set the subscriber limit
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the per-subscriber queue capacity (at least 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.max_subscribers, 0);
        assert_eq!(config.queue_capacity, 1024);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .max_subscribers(10)
            .queue_capacity(0);

        assert_eq!(config.max_subscribers, 10);
        assert_eq!(config.queue_capacity, 1);
    }
}

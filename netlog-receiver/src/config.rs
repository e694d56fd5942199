//! Receiver configuration.

use std::time::Duration;

/// Default time between scrapes.
pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(10);

/// Settings recognised by the receiver core.
///
/// The collection interval is the only tunable: there are no capacity
/// limits and no filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Time between scrapes.
    pub collection_interval: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            collection_interval: DEFAULT_COLLECTION_INTERVAL,
        }
    }
}

impl ReceiverConfig {
    /// Create a new builder for ReceiverConfig.
    pub fn builder() -> ReceiverConfigBuilder {
        ReceiverConfigBuilder::default()
    }
}

/// Builder for ReceiverConfig.
#[derive(Debug, Default)]
pub struct ReceiverConfigBuilder {
    collection_interval: Option<Duration>,
}

impl ReceiverConfigBuilder {
    /// Set the collection interval.
    pub fn collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = Some(interval);
        self
    }

    /// Build the ReceiverConfig.
    ///
    /// A zero interval falls back to the default; `tokio::time::interval`
    /// rejects zero periods.
    pub fn build(self) -> ReceiverConfig {
        ReceiverConfig {
            collection_interval: self
                .collection_interval
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_COLLECTION_INTERVAL),
        }
    }
}

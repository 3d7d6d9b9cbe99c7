//! Per-store configuration.

use std::time::Duration;

use tandem_common::config::CacheConfig;

/// Cache settings of one record store.
///
/// Every store gets its own instance; nothing is shared between entity
/// types unless the caller shares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    /// Prefix of every cache key (`<namespace>:<key>`).
    pub namespace: String,
    /// Expiration of cache entries written without an explicit TTL.
    pub ttl: Option<Duration>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl RecordConfig {
    /// Creates a config with the given namespace and no expiry.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ttl: None,
        }
    }

    /// Sets the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Returns `key` prefixed with the namespace.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

impl From<&CacheConfig> for RecordConfig {
    fn from(config: &CacheConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            ttl: config.default_ttl,
        }
    }
}

//! Configuration structures.
//!
//! Every store receives its configuration explicitly; nothing here is
//! global state.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::{TandemError, TandemResult};

/// Top-level configuration.
///
/// # Example
///
/// ```rust
/// use tandem_common::config::TandemConfig;
///
/// let config = TandemConfig::default();
/// assert_eq!(config.pool.max_connections, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TandemConfig {
    /// Connection pool configuration.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TandemConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates every section.
    pub fn validate(&self) -> TandemResult<()> {
        self.pool.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

fn default_min_connections() -> usize {
    1
}

fn default_max_connections() -> usize {
    10
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_idle_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_max_lifetime() -> Duration {
    Duration::from_secs(3600)
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum number of connections opened by `Pool::initialize`.
    #[serde(default = "default_min_connections")]
    pub min_connections: usize,

    /// Maximum number of connections checked out or idle at once.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// How long `acquire` blocks before giving up.
    #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
    pub acquire_timeout: Duration,

    /// How long a connection can be idle before being closed.
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    #[serde(default = "default_max_lifetime", with = "humantime_serde")]
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout: default_acquire_timeout(),
            idle_timeout: default_idle_timeout(),
            max_lifetime: default_max_lifetime(),
        }
    }
}

impl PoolConfig {
    /// Creates a new pool configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum connections.
    pub fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the maximum connections.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Sets the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the max lifetime.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TandemResult<()> {
        if self.min_connections > self.max_connections {
            return Err(TandemError::invalid_config(
                "min_connections cannot be greater than max_connections",
            ));
        }
        if self.max_connections == 0 {
            return Err(TandemError::invalid_config(
                "max_connections must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn default_namespace() -> String {
    "tandem".to_string()
}

fn default_capacity() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

/// Cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Prefix prepended to every cache key (`<namespace>:<key>`).
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Expiration applied when a save does not pass one. `None` = no expiry.
    #[serde(default, with = "humantime_serde")]
    pub default_ttl: Option<Duration>,

    /// Maximum number of entries held by the in-process cache.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Whether to collect hit/miss statistics.
    #[serde(default = "default_true")]
    pub enable_stats: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            default_ttl: None,
            capacity: default_capacity(),
            enable_stats: true,
        }
    }
}

impl CacheConfig {
    /// Creates a config with the given namespace.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Sets the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets the in-process capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enables or disables statistics collection.
    pub fn with_stats(mut self, enable: bool) -> Self {
        self.enable_stats = enable;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> TandemResult<()> {
        if self.namespace.contains(char::is_whitespace) {
            return Err(TandemError::invalid_config(
                "cache namespace cannot contain whitespace",
            ));
        }
        if self.capacity == 0 {
            return Err(TandemError::invalid_config(
                "cache capacity must be greater than 0",
            ));
        }
        if self.default_ttl == Some(Duration::ZERO) {
            return Err(TandemError::invalid_config(
                "default_ttl must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn default_filter() -> String {
    "info".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info,tandem_pool=debug"`.
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Colorize output.
    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: false,
        }
    }
}

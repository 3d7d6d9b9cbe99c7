//! Configuration for Tandem.
//!
//! This module provides configuration structures for the pool, the cache
//! and logging, loadable from TOML.

mod settings;

pub use settings::{CacheConfig, LoggingConfig, PoolConfig, TandemConfig};

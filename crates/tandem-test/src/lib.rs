//! # tandem-test
//!
//! Test support and cross-crate tests for Tandem.
//!
//! This crate contains:
//! - A scripted driver that journals every statement it runs
//! - A cache client with failure injection
//! - A [`Harness`] wiring both into a pool and the record stores

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod driver;
pub mod journal;

use std::sync::Arc;
use std::time::Duration;

use tandem_common::PoolConfig;
use tandem_pool::Pool;
use tandem_record::{HybridRecord, RecordConfig, RelationalRecord};
use tandem_sql::Table;

pub use cache::FlakyCache;
pub use driver::{Response, ScriptedDriver};
pub use journal::{Event, Journal};

/// Installs a test-writer subscriber once per process.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// The `public.users (id, name, age)` table used throughout the tests.
pub fn users() -> Table {
    Table::new("public", "users", ["id", "name", "age"], "id")
        .unwrap_or_else(|e| panic!("users table: {e}"))
}

/// A pool over a [`ScriptedDriver`] plus a [`FlakyCache`], sharing one journal.
pub struct Harness {
    /// Shared event log.
    pub journal: Journal,
    /// Driver handle for scripting answers.
    pub driver: ScriptedDriver,
    /// Pool over the driver.
    pub pool: Arc<Pool>,
    /// Cache client.
    pub cache: Arc<FlakyCache>,
}

impl Harness {
    /// Creates a harness with a two-connection pool.
    pub fn new() -> Self {
        init_logging();
        let journal = Journal::new();
        let driver = ScriptedDriver::new(journal.clone());
        let config = PoolConfig::new()
            .min_connections(0)
            .max_connections(2)
            .acquire_timeout(Duration::from_millis(200));
        let pool = Pool::new(driver.clone(), config).unwrap_or_else(|e| panic!("pool: {e}"));
        let cache = Arc::new(FlakyCache::new(journal.clone()));
        Self {
            journal,
            driver,
            pool: Arc::new(pool),
            cache,
        }
    }

    /// Relational store over `users`.
    pub fn relational(&self) -> RelationalRecord {
        RelationalRecord::new(Arc::clone(&self.pool), users())
    }

    /// Hybrid store over `users` in the `users` namespace.
    pub fn hybrid(&self) -> HybridRecord {
        HybridRecord::new(
            Arc::clone(&self.pool),
            self.cache.clone(),
            users(),
            RecordConfig::new("users"),
        )
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

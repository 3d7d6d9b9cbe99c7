//! Cache client with failure injection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tandem_cache::{CacheClient, MemoryCache};
use tandem_common::error::{TandemError, TandemResult};

use crate::journal::{Event, Journal};

/// [`MemoryCache`] that journals every call and can be told to fail.
///
/// A failing call is journaled but never reaches the inner cache.
#[derive(Debug)]
pub struct FlakyCache {
    inner: MemoryCache,
    journal: Journal,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyCache {
    /// Wraps a fresh in-memory cache.
    pub fn new(journal: Journal) -> Self {
        Self {
            inner: MemoryCache::with_capacity(1024),
            journal,
            fail_get: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    /// Returns the wrapped cache.
    pub fn inner(&self) -> &MemoryCache {
        &self.inner
    }

    /// Makes `get` fail until reset.
    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    /// Makes `set` fail until reset.
    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    /// Makes `delete` fail until reset.
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, call: &str) -> TandemResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(TandemError::connection(format!("cache {call} refused")))
        } else {
            Ok(())
        }
    }
}

impl CacheClient for FlakyCache {
    fn get(&self, key: &str) -> TandemResult<Option<Bytes>> {
        self.journal.record(Event::CacheGet(key.to_string()));
        Self::check(&self.fail_get, "get")?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> TandemResult<()> {
        self.journal.record(Event::CacheSet {
            key: key.to_string(),
            ttl,
        });
        Self::check(&self.fail_set, "set")?;
        self.inner.set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> TandemResult<bool> {
        self.journal.record(Event::CacheDelete(key.to_string()));
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(key)
    }
}

//! In-process cache.
//!
//! A bounded map with per-entry expiry and least-recently-used eviction.
//! Expired entries are dropped lazily when they are looked up or when room
//! is needed.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tandem_common::config::CacheConfig;
use tandem_common::error::TandemResult;
use tracing::trace;

use crate::client::CacheClient;
use crate::stats::{CacheStats, StatsSnapshot};

struct Slot {
    value: Bytes,
    expires_at: Option<Instant>,
    tick: u64,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    /// Recency index: access tick → key. Oldest first.
    recency: BTreeMap<u64, String>,
    clock: u64,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn remove(&mut self, key: &str) -> Option<Slot> {
        let slot = self.slots.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot)
    }

    fn touch(&mut self, key: &str) {
        let tick = self.next_tick();
        if let Some(slot) = self.slots.get_mut(key) {
            self.recency.remove(&slot.tick);
            slot.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn pop_oldest(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.slots.remove(&key);
        Some(key)
    }
}

/// A thread-safe, bounded, in-process [`CacheClient`].
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use tandem_cache::{CacheClient, MemoryCache};
///
/// let cache = MemoryCache::with_capacity(2);
/// cache.set("a", Bytes::from_static(b"1"), None).unwrap();
/// assert_eq!(cache.get("a").unwrap(), Some(Bytes::from_static(b"1")));
/// assert!(cache.delete("a").unwrap());
/// ```
pub struct MemoryCache {
    capacity: usize,
    inner: Mutex<Inner>,
    stats: Option<CacheStats>,
}

impl MemoryCache {
    /// Creates a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            inner: Mutex::new(Inner::default()),
            stats: config.enable_stats.then(CacheStats::new),
        }
    }

    /// Creates a cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(&CacheConfig::default().with_capacity(capacity))
    }

    /// Returns the number of stored entries, including expired ones not
    /// yet dropped.
    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if a live entry exists for `key`. Does not count as a
    /// lookup and does not refresh recency.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .lock()
            .slots
            .get(key)
            .is_some_and(|slot| !slot.is_expired(now))
    }

    /// Returns the remaining time to live of `key`.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let inner = self.inner.lock();
        let slot = inner.slots.get(key)?;
        slot.expires_at.map(|at| at.saturating_duration_since(now))
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.slots.clear();
        inner.recency.clear();
    }

    /// Returns statistics, or `None` when collection is disabled.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.stats.as_ref().map(CacheStats::snapshot)
    }

    fn record(&self, f: impl FnOnce(&CacheStats)) {
        if let Some(stats) = &self.stats {
            f(stats);
        }
    }

    /// Makes room for one more entry.
    fn make_room(&self, inner: &mut Inner, now: Instant) {
        if inner.slots.len() < self.capacity {
            return;
        }

        let expired: Vec<String> = inner
            .slots
            .iter()
            .filter(|(_, slot)| slot.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            inner.remove(&key);
            self.record(CacheStats::record_expiration);
        }

        while inner.slots.len() >= self.capacity {
            match inner.pop_oldest() {
                Some(key) => {
                    trace!(key = %key, "evicted");
                    self.record(CacheStats::record_eviction);
                }
                None => break,
            }
        }
    }
}

impl CacheClient for MemoryCache {
    fn get(&self, key: &str) -> TandemResult<Option<Bytes>> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let lookup = inner
            .slots
            .get(key)
            .map(|slot| (slot.is_expired(now), slot.value.clone()));
        let value = match lookup {
            Some((true, _)) => {
                inner.remove(key);
                self.record(CacheStats::record_expiration);
                None
            }
            Some((false, value)) => Some(value),
            None => None,
        };

        match &value {
            Some(_) => {
                inner.touch(key);
                self.record(CacheStats::record_hit);
            }
            None => self.record(CacheStats::record_miss),
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> TandemResult<()> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        if inner.remove(key).is_none() {
            self.make_room(&mut inner, now);
        }
        let tick = inner.next_tick();
        inner.slots.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
                tick,
            },
        );
        inner.recency.insert(tick, key.to_string());
        self.record(CacheStats::record_set);
        Ok(())
    }

    fn delete(&self, key: &str) -> TandemResult<bool> {
        let now = Instant::now();
        let existed = match self.inner.lock().remove(key) {
            Some(slot) => !slot.is_expired(now),
            None => false,
        };
        if existed {
            self.record(CacheStats::record_removal);
        }
        Ok(existed)
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn b(s: &'static str) -> Bytes {
        Bytes::from_static(s.as_bytes())
    }

    #[test]
    fn test_get_set_delete() {
        let cache = MemoryCache::with_capacity(8);
        assert_eq!(cache.get("k").unwrap(), None);

        cache.set("k", b("v"), None).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b("v")));

        assert!(cache.delete("k").unwrap());
        assert!(!cache.delete("k").unwrap());

        let stats = cache.stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.removals, 1);
    }

    #[test]
    fn test_unrepresentable_ttl_never_expires() {
        let cache = MemoryCache::with_capacity(8);
        cache.set("k", b("v"), Some(Duration::MAX)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(b("v")));
        assert_eq!(cache.ttl("k"), None);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = MemoryCache::with_capacity(8);
        cache.set("k", b("v"), Some(Duration::from_millis(10))).unwrap();
        assert!(cache.ttl("k").is_some());

        thread::sleep(Duration::from_millis(30));
        assert!(!cache.contains("k"));
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.stats().unwrap().expirations, 1);
    }

    #[test]
    fn test_get_does_not_refresh_ttl() {
        let cache = MemoryCache::with_capacity(8);
        cache.set("k", b("v"), Some(Duration::from_secs(60))).unwrap();
        let before = cache.ttl("k").unwrap();
        cache.get("k").unwrap();
        assert!(cache.ttl("k").unwrap() <= before);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = MemoryCache::with_capacity(2);
        cache.set("a", b("1"), None).unwrap();
        cache.set("b", b("2"), None).unwrap();

        // "a" becomes most recent, so "b" is evicted.
        cache.get("a").unwrap();
        cache.set("c", b("3"), None).unwrap();

        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert_eq!(cache.stats().unwrap().evictions, 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = MemoryCache::with_capacity(1);
        cache.set("a", b("1"), None).unwrap();
        cache.set("a", b("2"), None).unwrap();
        assert_eq!(cache.get("a").unwrap(), Some(b("2")));
        assert_eq!(cache.stats().unwrap().evictions, 0);
    }

    #[test]
    fn test_stats_disabled() {
        let cache = MemoryCache::new(&CacheConfig::default().with_stats(false));
        cache.set("a", b("1"), None).unwrap();
        assert!(cache.stats().is_none());
    }
}

//! Key-value client contract.

use std::time::Duration;

use bytes::Bytes;
use tandem_common::error::TandemResult;

/// A blocking key-value store.
///
/// Implementations wrap a network client (redis, memcached) or an
/// in-process map such as [`MemoryCache`](crate::MemoryCache). Every call is
/// one round trip; nothing is retried.
pub trait CacheClient: Send + Sync {
    /// Returns the value stored under `key`. A miss is `Ok(None)`.
    fn get(&self, key: &str) -> TandemResult<Option<Bytes>>;

    /// Stores `value` under `key`, expiring after `ttl` when given. A `ttl`
    /// past what the clock can represent is treated as no expiry.
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> TandemResult<()>;

    /// Removes `key`. Returns whether an entry existed.
    fn delete(&self, key: &str) -> TandemResult<bool>;
}

impl<C: CacheClient + ?Sized> CacheClient for std::sync::Arc<C> {
    fn get(&self, key: &str) -> TandemResult<Option<Bytes>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> TandemResult<()> {
        (**self).set(key, value, ttl)
    }

    fn delete(&self, key: &str) -> TandemResult<bool> {
        (**self).delete(key)
    }
}

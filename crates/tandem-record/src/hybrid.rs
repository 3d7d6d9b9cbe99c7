//! Hybrid store: relational store of record fronted by a cache.
//!
//! Reads are cache-aside, writes go through to the cache after the
//! relational write commits:
//!
//! | call     | first                      | then (best-effort)                    |
//! |----------|----------------------------|---------------------------------------|
//! | `get`    | cache lookup               | relational read on miss, cache fill   |
//! | `save`   | relational INSERT / UPDATE | cache write under the derived key     |
//! | `delete` | relational DELETE          | cache eviction if a row existed       |
//!
//! Cache failures never fail a call. They are logged at `warn` level,
//! counted, and passed to the [`FaultObserver`] if one is installed.
//!
//! Concurrent saves of one primary key race: the relational store orders
//! them, and the cache keeps whichever write reached it last.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tandem_cache::{CacheClient, Codec, JsonCodec};
use tandem_common::error::{TandemError, TandemResult};
use tandem_pool::Pool;
use tandem_sql::{Table, Value};
use tracing::{debug, warn};

use crate::cached::CacheRecord;
use crate::config::RecordConfig;
use crate::entity::{Entity, EntityLayout};
use crate::fault::{CacheFault, CacheOperation, FaultObserver};
use crate::key;
use crate::relational::RelationalRecord;
use crate::traits::{Deletable, Gettable, Savable};

/// Entities stored relationally and cached under a key derived from the
/// primary key.
///
/// # Example
///
/// ```rust,ignore
/// use tandem_record::{Gettable, HybridRecord, RecordConfig, Savable};
///
/// let users = HybridRecord::new(pool, cache, table, RecordConfig::new("users"));
/// let mut ryan = users.new_entity().with("name", "Ryan")?;
/// users.save(&mut ryan)?;
/// assert_eq!(users.get(ryan.primary_key())?, ryan);
/// ```
pub struct HybridRecord<C = JsonCodec> {
    relational: RelationalRecord,
    cache: CacheRecord<C>,
    observer: Option<Arc<dyn FaultObserver>>,
    faults: AtomicU64,
}

impl HybridRecord<JsonCodec> {
    /// Creates a hybrid store for `table` with JSON cache payloads.
    pub fn new(
        pool: Arc<Pool>,
        client: Arc<dyn CacheClient>,
        table: Table,
        config: RecordConfig,
    ) -> Self {
        Self::with_codec(pool, client, table, config, JsonCodec)
    }

    /// Creates a hybrid store by introspecting `schema.name`.
    pub fn from_catalog(
        pool: Arc<Pool>,
        client: Arc<dyn CacheClient>,
        schema: &str,
        name: &str,
        config: RecordConfig,
    ) -> TandemResult<Self> {
        let table = Table::from_catalog(&*pool, schema, name)?;
        Ok(Self::new(pool, client, table, config))
    }
}

impl<C: Codec> HybridRecord<C> {
    /// Creates a hybrid store with an explicit codec.
    pub fn with_codec(
        pool: Arc<Pool>,
        client: Arc<dyn CacheClient>,
        table: Table,
        config: RecordConfig,
        codec: C,
    ) -> Self {
        let relational = RelationalRecord::new(pool, table);
        let cache =
            CacheRecord::with_codec(client, Arc::clone(relational.layout()), config, codec);
        Self {
            relational,
            cache,
            observer: None,
            faults: AtomicU64::new(0),
        }
    }

    /// Installs an observer for swallowed cache failures.
    pub fn with_observer(mut self, observer: Arc<dyn FaultObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Returns the relational half.
    pub fn relational(&self) -> &RelationalRecord {
        &self.relational
    }

    /// Returns the cache half.
    pub fn cache(&self) -> &CacheRecord<C> {
        &self.cache
    }

    /// Returns the entity layout.
    pub fn layout(&self) -> &Arc<EntityLayout> {
        self.relational.layout()
    }

    /// Number of cache failures swallowed so far.
    pub fn faults(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Creates an empty entity.
    pub fn new_entity(&self) -> Entity {
        self.relational.new_entity()
    }

    /// Returns the cache key (without namespace) of a primary key.
    pub fn key_for(&self, id: &Value) -> String {
        key::derive_key(self.layout().table(), id)
    }

    fn report(&self, operation: CacheOperation, key: &str, error: TandemError) {
        self.faults.fetch_add(1, Ordering::Relaxed);
        warn!(
            table = %self.layout().table(),
            operation = %operation,
            key = %key,
            error = %error,
            "cache failure ignored"
        );
        if let Some(observer) = &self.observer {
            observer.on_fault(&CacheFault {
                operation,
                key: key.to_string(),
                error,
            });
        }
    }

    /// Cache first, relational on a miss.
    pub fn get_id(&self, id: &Value) -> TandemResult<Entity> {
        let key = self.key_for(id);
        match self.cache.get_key(&key) {
            Ok(Some(entity)) => return Ok(entity),
            Ok(None) => {}
            Err(error) => self.report(CacheOperation::Get, &key, error),
        }

        let mut entity = self.relational.get_id(id)?;
        entity.set_cache_key(key.as_str());
        if let Err(error) = self.cache.store(&entity, self.cache.config().ttl) {
            self.report(CacheOperation::Populate, &key, error);
        } else {
            debug!(table = %self.layout().table(), key = %key, "cache populated");
        }
        Ok(entity)
    }

    /// Saves relationally, then caches the stored row for `ttl` instead of
    /// the configured TTL.
    pub fn save_with_ttl(&self, entity: &mut Entity, ttl: Option<Duration>) -> TandemResult<()> {
        self.relational.save(entity)?;

        let key = self.key_for(entity.primary_key());
        entity.set_cache_key(key.as_str());
        if let Err(error) = self.cache.store(entity, ttl) {
            self.report(CacheOperation::Set, &key, error);
        }
        Ok(())
    }
}

impl<C: Codec> Gettable for HybridRecord<C> {
    type Key = Value;
    type Output = Entity;

    fn get(&self, id: &Value) -> TandemResult<Entity> {
        self.get_id(id)
    }
}

impl<C: Codec> Savable for HybridRecord<C> {
    fn save(&self, entity: &mut Entity) -> TandemResult<()> {
        self.save_with_ttl(entity, self.cache.config().ttl)
    }
}

impl<C: Codec> Deletable for HybridRecord<C> {
    fn delete(&self, entity: &Entity) -> TandemResult<bool> {
        if !self.relational.delete(entity)? {
            return Ok(false);
        }

        let key = self.key_for(entity.primary_key());
        if let Err(error) = self.cache.delete_key(&key) {
            self.report(CacheOperation::Delete, &key, error);
        }
        Ok(true)
    }
}

impl<C> std::fmt::Debug for HybridRecord<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRecord")
            .field("relational", &self.relational)
            .field("cache", &self.cache)
            .field("faults", &self.faults.load(Ordering::Relaxed))
            .finish()
    }
}

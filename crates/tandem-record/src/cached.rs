//! Cache store.

use std::sync::Arc;
use std::time::Duration;

use tandem_cache::{CacheClient, Codec, JsonCodec};
use tandem_common::error::TandemResult;
use tandem_sql::Table;
use tracing::debug;

use crate::config::RecordConfig;
use crate::entity::{Entity, EntityLayout, FrozenEntity};
use crate::key;
use crate::traits::{Deletable, Gettable, Savable};

/// Entities stored whole in a key-value cache.
///
/// Keys are namespaced with [`RecordConfig::namespace`]. A miss is
/// `Ok(None)`, never an error.
pub struct CacheRecord<C = JsonCodec> {
    client: Arc<dyn CacheClient>,
    layout: Arc<EntityLayout>,
    config: RecordConfig,
    codec: C,
}

impl CacheRecord<JsonCodec> {
    /// Creates a store using JSON payloads.
    pub fn new(client: Arc<dyn CacheClient>, table: &Table, config: RecordConfig) -> Self {
        Self::with_codec(client, EntityLayout::from_table(table), config, JsonCodec)
    }
}

impl<C: Codec> CacheRecord<C> {
    /// Creates a store with an explicit layout and codec.
    pub fn with_codec(
        client: Arc<dyn CacheClient>,
        layout: Arc<EntityLayout>,
        config: RecordConfig,
        codec: C,
    ) -> Self {
        Self {
            client,
            layout,
            config,
            codec,
        }
    }

    /// Returns the entity layout.
    pub fn layout(&self) -> &Arc<EntityLayout> {
        &self.layout
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Creates an empty entity.
    pub fn new_entity(&self) -> Entity {
        self.layout.new_entity()
    }

    /// Looks up an entity by its (un-namespaced) key.
    pub fn get_key(&self, key: &str) -> TandemResult<Option<Entity>> {
        let full = self.config.namespaced(key);
        let Some(bytes) = self.client.get(&full)? else {
            debug!(key = %full, "cache miss");
            return Ok(None);
        };
        debug!(key = %full, codec = self.codec.name(), "cache hit");
        let frozen: FrozenEntity = self.codec.decode(&bytes)?;
        self.layout.thaw(frozen).map(Some)
    }

    /// Stores `entity` under its cache key, expiring after `ttl`.
    ///
    /// An entity without a key gets a random one first.
    pub fn save_with_ttl(&self, entity: &mut Entity, ttl: Option<Duration>) -> TandemResult<()> {
        entity.ensure_layout(&self.layout)?;
        if entity.cache_key().is_none() {
            entity.set_cache_key(key::random_key());
        }
        self.store(entity, ttl)
    }

    /// Writes an entity that already has a key.
    pub(crate) fn store(&self, entity: &Entity, ttl: Option<Duration>) -> TandemResult<()> {
        let key = entity.cache_key().unwrap_or_default();
        let full = self.config.namespaced(key);
        let payload = self.codec.encode(&entity.freeze())?;
        self.client.set(&full, payload, ttl)?;
        debug!(key = %full, ttl = ?ttl, "cache set");
        Ok(())
    }

    /// Removes the entry stored under `key`. Returns whether it existed.
    pub fn delete_key(&self, key: &str) -> TandemResult<bool> {
        self.client.delete(&self.config.namespaced(key))
    }
}

impl<C: Codec> Gettable for CacheRecord<C> {
    type Key = str;
    type Output = Option<Entity>;

    fn get(&self, key: &str) -> TandemResult<Option<Entity>> {
        self.get_key(key)
    }
}

impl<C: Codec> Savable for CacheRecord<C> {
    fn save(&self, entity: &mut Entity) -> TandemResult<()> {
        self.save_with_ttl(entity, self.config.ttl)
    }
}

impl<C: Codec> Deletable for CacheRecord<C> {
    fn delete(&self, entity: &Entity) -> TandemResult<bool> {
        match entity.cache_key() {
            Some(key) => self.delete_key(key),
            None => Ok(false),
        }
    }
}

impl<C> std::fmt::Debug for CacheRecord<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRecord")
            .field("table", &self.layout.table())
            .field("config", &self.config)
            .finish()
    }
}

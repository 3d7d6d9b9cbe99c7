//! # tandem-record
//!
//! Entity stores built on [`tandem_pool`] and [`tandem_cache`].
//!
//! - [`RelationalRecord`]: one table, `SELECT`/`INSERT`/`UPDATE`/`DELETE` by primary key
//! - [`CacheRecord`]: whole entities in a key-value cache
//! - [`HybridRecord`]: relational store of record with a cache-aside read path
//!
//! Every store implements some of [`Gettable`], [`Savable`] and
//! [`Deletable`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cached;
pub mod config;
pub mod entity;
pub mod fault;
pub mod hybrid;
pub mod key;
pub mod relational;
pub mod traits;

pub use cached::CacheRecord;
pub use config::RecordConfig;
pub use entity::{Entity, EntityLayout, FrozenEntity};
pub use fault::{CacheFault, CacheOperation, FaultObserver};
pub use hybrid::HybridRecord;
pub use relational::RelationalRecord;
pub use traits::{Deletable, Gettable, Savable};

//! # tandem-cache
//!
//! Key-value side of Tandem.
//!
//! - **Client contract**: [`CacheClient`] (`get`, `set` with TTL, `delete`)
//! - **In-process cache**: [`MemoryCache`], bounded with LRU eviction and per-entry TTL
//! - **Statistics**: [`CacheStats`] counters
//! - **Codecs**: [`JsonCodec`] and [`BinaryCodec`] freeze entities into payloads
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use tandem_cache::{CacheClient, Codec, JsonCodec, MemoryCache};
//!
//! let cache = MemoryCache::with_capacity(16);
//! let payload = JsonCodec.encode(&vec![1, 2, 3]).unwrap();
//! cache.set("tandem:k", payload, Some(Duration::from_secs(60))).unwrap();
//!
//! let bytes = cache.get("tandem:k").unwrap().unwrap();
//! let back: Vec<i32> = JsonCodec.decode(&bytes).unwrap();
//! assert_eq!(back, vec![1, 2, 3]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod codec;
pub mod memory;
pub mod stats;

pub use client::CacheClient;
pub use codec::{BinaryCodec, Codec, JsonCodec};
pub use memory::MemoryCache;
pub use stats::{CacheStats, StatsSnapshot};

//! # tandem-pool
//!
//! Blocking connection pool and statement execution for Tandem.
//!
//! - **Driver contract**: [`Connection`] and [`ConnectionManager`]
//! - **Pool**: bounded, with scoped acquisition through [`Pool::scope`]
//! - **Execution**: [`Execute`] runs a [`tandem_sql::Statement`] in one scope
//! - **Catalog**: [`Pool`] implements [`tandem_sql::Catalog`] over `information_schema`
//!
//! ## Example
//!
//! ```rust,ignore
//! use tandem_common::PoolConfig;
//! use tandem_pool::{Execute, Pool};
//! use tandem_sql::Table;
//!
//! let pool = Pool::new(my_driver, PoolConfig::default())?;
//! let users = Table::from_catalog(&pool, "public", "users")?;
//! let rows = users.select().filter([("age__gt", 18)])?.all(&pool)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod connection;
pub mod execute;
pub mod pool;

pub use connection::{Connection, ConnectionManager, Row};
pub use execute::Execute;
pub use pool::{Pool, PoolStats, PooledConnection};

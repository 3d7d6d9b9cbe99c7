//! # tandem-common
//!
//! Common errors, configuration and logging for Tandem.
//!
//! - **Errors**: Unified error handling with `TandemError`
//! - **Config**: Pool, cache and logging configuration loadable from TOML
//! - **Logging**: `tracing-subscriber` bootstrap for embedding processes
//!
//! ## Example
//!
//! ```rust
//! use tandem_common::{TandemConfig, TandemError, TandemResult};
//!
//! fn check(config: &TandemConfig) -> TandemResult<()> {
//!     config.validate()
//! }
//!
//! assert!(check(&TandemConfig::default()).is_ok());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used items at the crate root
pub use config::{CacheConfig, LoggingConfig, PoolConfig, TandemConfig};
pub use error::{ErrorCode, TandemError, TandemResult};

//! Error handling for Tandem.
//!
//! This module provides a unified error type and result alias used
//! across all Tandem components.

mod tandem;

pub use tandem::{ErrorCode, TandemError};

/// Result type alias for Tandem operations.
pub type TandemResult<T> = std::result::Result<T, TandemError>;

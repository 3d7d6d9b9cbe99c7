//! Tandem error types.
//!
//! One error enum covers the statement builder, the relational store, the
//! cache and configuration. Build-time variants are raised before any SQL
//! is rendered; store and cache variants are raised while talking to an
//! external system.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Internal error (bug).
    Internal = 0x0001,

    // Build errors (0x0100 - 0x01FF)
    /// A clause or expression received an argument of the wrong kind.
    TypeMismatch = 0x0100,
    /// A `column__suffix` key did not resolve to a column method.
    UnknownLookup = 0x0101,
    /// A column name is not part of the table.
    UnknownColumn = 0x0102,
    /// A mutator was invoked on a statement kind that does not support it.
    UnsupportedOperation = 0x0103,

    // Store errors (0x0200 - 0x02FF)
    /// A keyed fetch returned zero rows.
    NotFound = 0x0200,
    /// A keyed fetch returned more than one row.
    DataIntegrity = 0x0201,
    /// The driver failed to connect or lost the connection.
    ConnectionFailure = 0x0202,
    /// An acquisition or network call exceeded its deadline.
    Timeout = 0x0203,
    /// The pool has been closed.
    PoolClosed = 0x0204,
    /// The driver rejected or failed a statement.
    ExecutionFailed = 0x0205,

    // Cache errors (0x0300 - 0x03FF)
    /// An entity could not be frozen or thawed.
    Serialization = 0x0300,

    // Configuration errors (0x0400 - 0x04FF)
    /// The catalog has no such table.
    UnknownTable = 0x0400,
    /// Invalid configuration.
    InvalidConfig = 0x0401,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Build",
            0x02 => "Store",
            0x03 => "Cache",
            0x04 => "Configuration",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for Tandem.
///
/// # Example
///
/// ```rust
/// use tandem_common::error::{TandemError, TandemResult};
///
/// fn lookup(suffix: &str) -> TandemResult<&'static str> {
///     Err(TandemError::UnknownLookup {
///         key: format!("age__{suffix}"),
///     })
/// }
///
/// assert!(lookup("near").is_err());
/// ```
#[derive(Debug, Error)]
pub enum TandemError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Build Errors
    // ==========================================================================
    /// A clause or expression received an argument of the wrong kind or arity.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected kind.
        expected: String,
        /// Actual kind.
        actual: String,
    },

    /// A lookup key does not resolve to any column method.
    #[error("unknown lookup '{key}'")]
    UnknownLookup {
        /// The offending key.
        key: String,
    },

    /// A column is not part of the table.
    #[error("column '{column}' not found in table '{table}'")]
    UnknownColumn {
        /// The missing column.
        column: String,
        /// The table name.
        table: String,
    },

    /// A mutator was invoked on a statement kind that does not support it.
    #[error("{operation} is not supported on {statement} statements")]
    UnsupportedOperation {
        /// The rejected mutator.
        operation: String,
        /// The statement kind.
        statement: String,
    },

    // ==========================================================================
    // Store Errors
    // ==========================================================================
    /// A keyed fetch returned zero rows.
    #[error("no row in '{table}' with {key}")]
    NotFound {
        /// The table that was queried.
        table: String,
        /// Description of the key.
        key: String,
    },

    /// A keyed fetch returned more than one row.
    #[error("expected one row in '{table}', got {rows}")]
    DataIntegrity {
        /// The table that was queried.
        table: String,
        /// Number of rows returned.
        rows: usize,
    },

    /// The driver failed to connect or lost the connection.
    #[error("connection failure: {reason}")]
    ConnectionFailure {
        /// Reason for failure.
        reason: String,
    },

    /// Operation timed out.
    #[error("{operation} timed out after {duration_ms}ms")]
    Timeout {
        /// What timed out.
        operation: String,
        /// Timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// The pool has been closed.
    #[error("connection pool is closed")]
    PoolClosed,

    /// The driver rejected or failed a statement.
    #[error("statement execution failed: {reason}")]
    ExecutionFailed {
        /// Reason for failure.
        reason: String,
    },

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// An entity could not be frozen or thawed.
    #[error("serialization failed: {reason}")]
    Serialization {
        /// Reason for failure.
        reason: String,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// The catalog has no such table.
    #[error("table '{schema}.{table}' not found in catalog")]
    UnknownTable {
        /// Schema name.
        schema: String,
        /// Table name.
        table: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },
}

impl TandemError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::UnknownLookup { .. } => ErrorCode::UnknownLookup,
            Self::UnknownColumn { .. } => ErrorCode::UnknownColumn,
            Self::UnsupportedOperation { .. } => ErrorCode::UnsupportedOperation,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::DataIntegrity { .. } => ErrorCode::DataIntegrity,
            Self::ConnectionFailure { .. } => ErrorCode::ConnectionFailure,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::PoolClosed => ErrorCode::PoolClosed,
            Self::ExecutionFailed { .. } => ErrorCode::ExecutionFailed,
            Self::Serialization { .. } => ErrorCode::Serialization,
            Self::UnknownTable { .. } => ErrorCode::UnknownTable,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns true if a caller-side retry policy may reasonably retry.
    ///
    /// Nothing in Tandem retries on its own.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailure { .. } | Self::Timeout { .. }
        )
    }

    /// Returns true if the error was raised while building a statement.
    #[must_use]
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::UnknownLookup { .. }
                | Self::UnknownColumn { .. }
                | Self::UnsupportedOperation { .. }
        )
    }

    /// Returns true if this is a `NotFound` error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>, statement: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
            statement: statement.into(),
        }
    }

    /// Creates a connection failure error.
    #[must_use]
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            reason: reason.into(),
        }
    }

    /// Creates an execution error.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

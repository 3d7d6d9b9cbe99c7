//! Reporting of swallowed cache failures.
//!
//! The hybrid store never lets a cache failure turn a successful relational
//! operation into an error. Such failures are logged and, when an observer
//! is installed, handed to it.

use std::fmt;

use tandem_common::error::TandemError;

/// Cache call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOperation {
    /// Cache lookup before the relational fallback.
    Get,
    /// Cache fill after a relational read.
    Populate,
    /// Cache write after a relational save.
    Set,
    /// Cache eviction after a relational delete.
    Delete,
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheOperation::Get => "get",
            CacheOperation::Populate => "populate",
            CacheOperation::Set => "set",
            CacheOperation::Delete => "delete",
        })
    }
}

/// A swallowed cache failure.
#[derive(Debug)]
pub struct CacheFault {
    /// The failed call.
    pub operation: CacheOperation,
    /// Cache key involved.
    pub key: String,
    /// The error the cache returned.
    pub error: TandemError,
}

/// Receives swallowed cache failures.
pub trait FaultObserver: Send + Sync {
    /// Called once per swallowed failure.
    fn on_fault(&self, fault: &CacheFault);
}

impl<F> FaultObserver for F
where
    F: Fn(&CacheFault) + Send + Sync,
{
    fn on_fault(&self, fault: &CacheFault) {
        self(fault)
    }
}

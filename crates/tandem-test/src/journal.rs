//! Ordered record of everything the scripted collaborators saw.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tandem_sql::Value;

/// One call observed by a scripted driver or cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// `Connection::fetch_all` / `fetch_one`.
    Query {
        /// SQL text.
        sql: String,
        /// Bound parameters.
        params: Vec<Value>,
    },
    /// `Connection::execute`.
    Execute {
        /// SQL text.
        sql: String,
        /// Bound parameters.
        params: Vec<Value>,
    },
    /// Transaction committed.
    Commit,
    /// Transaction rolled back.
    Rollback,
    /// Cache lookup.
    CacheGet(String),
    /// Cache write.
    CacheSet {
        /// Full cache key.
        key: String,
        /// Requested expiration.
        ttl: Option<Duration>,
    },
    /// Cache eviction.
    CacheDelete(String),
}

impl Event {
    /// Returns the SQL of a statement event.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Event::Query { sql, .. } | Event::Execute { sql, .. } => Some(sql),
            _ => None,
        }
    }

    /// Returns the parameters of a statement event.
    pub fn params(&self) -> Option<&[Value]> {
        match self {
            Event::Query { params, .. } | Event::Execute { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Returns true for cache events.
    pub fn is_cache(&self) -> bool {
        matches!(
            self,
            Event::CacheGet(_) | Event::CacheSet { .. } | Event::CacheDelete(_)
        )
    }
}

/// Shared, cloneable event log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Journal {
    /// Creates an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&self, event: Event) {
        self.events.lock().push(event);
    }

    /// Returns a copy of every event so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Returns the SQL of every statement so far.
    pub fn statements(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| e.sql().map(str::to_string))
            .collect()
    }

    /// Returns the cache events so far.
    pub fn cache_events(&self) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.is_cache())
            .cloned()
            .collect()
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.lock().iter().position(pred)
    }

    /// Forgets every event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

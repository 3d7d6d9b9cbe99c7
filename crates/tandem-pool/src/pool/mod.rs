//! Blocking connection pool.
//!
//! Connections are handed out as [`PooledConnection`] guards that return
//! the connection to the pool when dropped, on every exit path. Callers
//! waiting for a free slot block on a condition variable until a guard is
//! dropped or the acquire timeout elapses.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tandem_common::config::PoolConfig;
use tandem_common::error::{TandemError, TandemResult};
use tandem_sql::{PlaceholderStyle, Value};
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionManager, Row};

/// A connection with its bookkeeping.
struct Entry {
    /// The driver connection.
    conn: Box<dyn Connection>,
    /// When the connection was opened.
    created_at: Instant,
    /// When the connection was last returned.
    last_used: Instant,
    /// Number of checkouts.
    use_count: u64,
}

impl Entry {
    fn new(conn: Box<dyn Connection>) -> Self {
        let now = Instant::now();
        Self {
            conn,
            created_at: now,
            last_used: now,
            use_count: 0,
        }
    }

    /// Checks if the connection has exceeded its lifetime.
    fn is_expired(&self, max_lifetime: Duration) -> bool {
        self.created_at.elapsed() > max_lifetime
    }

    /// Checks if the connection has been idle too long.
    fn is_idle(&self, idle_timeout: Duration) -> bool {
        self.last_used.elapsed() > idle_timeout
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total connections opened.
    pub connections_created: u64,
    /// Total connections closed.
    pub connections_closed: u64,
    /// Total acquisitions.
    pub acquisitions: u64,
    /// Total releases.
    pub releases: u64,
    /// Acquisition timeouts.
    pub timeouts: u64,
    /// Open connections, idle or checked out.
    pub current_size: usize,
    /// Idle connections.
    pub idle_connections: usize,
    /// Checked-out connections.
    pub active_connections: usize,
}

struct PoolState {
    /// Idle connections, oldest first.
    idle: VecDeque<Entry>,
    /// Open connections plus slots reserved by in-flight connects.
    size: usize,
    /// Whether the pool is closed.
    closed: bool,
}

/// A bounded pool of driver connections.
///
/// `Pool` is `Send + Sync`; share it behind an `Arc`.
pub struct Pool {
    config: PoolConfig,
    manager: Arc<dyn ConnectionManager>,
    state: Mutex<PoolState>,
    released: Condvar,
    stats: Mutex<PoolStats>,
}

impl Pool {
    /// Creates a pool. No connection is opened until the first acquire or
    /// [`initialize`](Pool::initialize).
    pub fn new(manager: impl ConnectionManager + 'static, config: PoolConfig) -> TandemResult<Self> {
        Self::with_manager(Arc::new(manager), config)
    }

    /// Creates a pool around a shared manager.
    pub fn with_manager(
        manager: Arc<dyn ConnectionManager>,
        config: PoolConfig,
    ) -> TandemResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            manager,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                size: 0,
                closed: false,
            }),
            released: Condvar::new(),
            stats: Mutex::new(PoolStats::default()),
        })
    }

    /// Opens `min_connections` connections up front.
    pub fn initialize(&self) -> TandemResult<()> {
        let mut opened = 0;
        while self.size() < self.config.min_connections {
            if !self.reserve_slot()? {
                break;
            }
            let entry = self.open_reserved()?;
            self.state.lock().idle.push_back(entry);
            opened += 1;
        }
        info!(
            opened,
            max_connections = self.config.max_connections,
            "connection pool initialized"
        );
        Ok(())
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns the placeholder dialect of the driver.
    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.manager.placeholder_style()
    }

    /// Acquires a connection, waiting at most the configured acquire
    /// timeout.
    pub fn acquire(&self) -> TandemResult<PooledConnection<'_>> {
        self.acquire_timeout(self.config.acquire_timeout)
    }

    /// Acquires a connection, waiting at most `timeout`.
    ///
    /// A timeout too large to form a deadline waits without bound.
    pub fn acquire_timeout(&self, timeout: Duration) -> TandemResult<PooledConnection<'_>> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(TandemError::PoolClosed);
            }

            let mut stale = Vec::new();
            let mut found = None;
            while let Some(entry) = state.idle.pop_front() {
                if self.is_reusable(&entry) {
                    found = Some(entry);
                    break;
                }
                state.size -= 1;
                stale.push(entry);
            }

            if let Some(entry) = found {
                drop(state);
                self.close_all(stale);
                return Ok(self.checkout(entry));
            }
            if !stale.is_empty() {
                MutexGuard::unlocked(&mut state, || self.close_all(stale));
                continue;
            }

            if state.size < self.config.max_connections {
                state.size += 1;
                drop(state);
                let entry = self.open_reserved()?;
                return Ok(self.checkout(entry));
            }

            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        self.stats.lock().timeouts += 1;
                        let duration_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                        warn!(timeout_ms = duration_ms, "pool acquire timed out");
                        return Err(TandemError::Timeout {
                            operation: "pool acquire".to_string(),
                            duration_ms,
                        });
                    }
                }
                None => self.released.wait(&mut state),
            }
        }
    }

    /// Runs `f` on a pooled connection inside one transaction.
    ///
    /// Commits when `f` succeeds and rolls back before returning when it
    /// fails. The connection goes back to the pool either way; a
    /// connection whose rollback fails is discarded instead.
    pub fn scope<T, F>(&self, f: F) -> TandemResult<T>
    where
        F: FnOnce(&mut PooledConnection<'_>) -> TandemResult<T>,
    {
        let mut conn = self.acquire()?;
        match f(&mut conn) {
            Ok(value) => match conn.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    conn.rollback_or_discard();
                    Err(err)
                }
            },
            Err(err) => {
                conn.rollback_or_discard();
                Err(err)
            }
        }
    }

    /// Returns pool statistics.
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.stats.lock().clone();
        let state = self.state.lock();
        stats.current_size = state.size;
        stats.idle_connections = state.idle.len();
        stats.active_connections = state.size - state.idle.len();
        stats
    }

    /// Returns the number of open connections.
    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    /// Returns the number of idle connections.
    pub fn available(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Closes the pool. Idle connections are closed now, checked-out ones
    /// when they are returned. Waiting acquirers fail with `PoolClosed`.
    pub fn close(&self) {
        let idle = {
            let mut state = self.state.lock();
            state.closed = true;
            state.size -= state.idle.len();
            std::mem::take(&mut state.idle)
        };
        self.close_all(idle.into());
        self.released.notify_all();
        info!("connection pool closed");
    }

    /// Returns true if the pool is closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    // =========================================================================
    // Internal Methods
    // =========================================================================

    fn is_reusable(&self, entry: &Entry) -> bool {
        !entry.is_expired(self.config.max_lifetime)
            && !entry.is_idle(self.config.idle_timeout)
            && entry.conn.is_valid()
    }

    /// Reserves a slot without waiting. Returns false when the pool is full.
    fn reserve_slot(&self) -> TandemResult<bool> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(TandemError::PoolClosed);
        }
        if state.size >= self.config.max_connections {
            return Ok(false);
        }
        state.size += 1;
        Ok(true)
    }

    /// Opens a connection for a slot already counted in `size`. The slot
    /// is given back if the driver fails.
    fn open_reserved(&self) -> TandemResult<Entry> {
        match self.manager.connect() {
            Ok(conn) => {
                self.stats.lock().connections_created += 1;
                debug!("connection opened");
                Ok(Entry::new(conn))
            }
            Err(err) => {
                self.state.lock().size -= 1;
                self.released.notify_one();
                warn!(error = %err, "failed to open connection");
                Err(err)
            }
        }
    }

    fn checkout(&self, mut entry: Entry) -> PooledConnection<'_> {
        entry.use_count += 1;
        self.stats.lock().acquisitions += 1;
        PooledConnection {
            pool: self,
            entry: Some(entry),
            broken: false,
        }
    }

    /// Returns a connection to the pool.
    fn release(&self, mut entry: Entry, broken: bool) {
        entry.last_used = Instant::now();

        let keep = {
            let mut state = self.state.lock();
            let keep = !broken
                && !state.closed
                && !entry.is_expired(self.config.max_lifetime)
                && entry.conn.is_valid();
            if keep {
                state.idle.push_back(entry);
            } else {
                state.size -= 1;
                drop(state);
                if broken {
                    warn!("discarding broken connection");
                }
                self.close_entry(entry);
            }
            keep
        };

        self.stats.lock().releases += 1;
        self.released.notify_one();
        debug!(kept = keep, "connection released");
    }

    fn close_all(&self, entries: Vec<Entry>) {
        for entry in entries {
            self.close_entry(entry);
        }
    }

    /// Closes a connection that is no longer counted in `size`.
    fn close_entry(&self, entry: Entry) {
        self.stats.lock().connections_closed += 1;
        debug!(use_count = entry.use_count, "connection closed");
        drop(entry);
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("max_connections", &self.config.max_connections)
            .field("current_size", &self.size())
            .field("available", &self.available())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A connection checked out of a [`Pool`].
///
/// When dropped, the connection is returned to the pool.
pub struct PooledConnection<'a> {
    pool: &'a Pool,
    entry: Option<Entry>,
    broken: bool,
}

impl<'a> PooledConnection<'a> {
    fn conn(&mut self) -> TandemResult<&mut (dyn Connection + 'static)> {
        self.entry
            .as_mut()
            .map(|e| e.conn.as_mut())
            .ok_or_else(|| TandemError::internal("pooled connection already released"))
    }

    /// Tracks connection-level failures so a dead connection is not
    /// returned to the pool.
    fn track<T>(&mut self, result: TandemResult<T>) -> TandemResult<T> {
        if let Err(TandemError::ConnectionFailure { .. }) = &result {
            self.broken = true;
        }
        result
    }

    /// Runs a statement and returns the affected row count.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> TandemResult<u64> {
        let result = self.conn()?.execute(sql, params);
        self.track(result)
    }

    /// Runs a query and returns every row.
    pub fn fetch_all(&mut self, sql: &str, params: &[Value]) -> TandemResult<Vec<Row>> {
        let result = self.conn()?.fetch_all(sql, params);
        self.track(result)
    }

    /// Runs a query and returns the first row, if any.
    pub fn fetch_one(&mut self, sql: &str, params: &[Value]) -> TandemResult<Option<Row>> {
        let result = self.conn()?.fetch_one(sql, params);
        self.track(result)
    }

    /// Commits the current transaction.
    pub fn commit(&mut self) -> TandemResult<()> {
        let result = self.conn()?.commit();
        self.track(result)
    }

    /// Rolls back the current transaction.
    pub fn rollback(&mut self) -> TandemResult<()> {
        let result = self.conn()?.rollback();
        self.track(result)
    }

    fn rollback_or_discard(&mut self) {
        if let Err(err) = self.rollback() {
            warn!(error = %err, "rollback failed");
            self.broken = true;
        }
    }

    /// Returns how long the connection has been open.
    pub fn connection_age(&self) -> Duration {
        self.entry
            .as_ref()
            .map(|e| e.created_at.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    /// Returns how many times this connection has been checked out.
    pub fn use_count(&self) -> u64 {
        self.entry.as_ref().map(|e| e.use_count).unwrap_or(0)
    }
}

impl<'a> Drop for PooledConnection<'a> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.pool.release(entry, self.broken);
        }
    }
}

impl<'a> std::fmt::Debug for PooledConnection<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection_age", &self.connection_age())
            .field("use_count", &self.use_count())
            .field("broken", &self.broken)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
        refuse: AtomicBool,
        invalid: AtomicBool,
        watched: Mutex<Option<std::sync::Weak<Pool>>>,
        sizes_at_close: Mutex<Vec<usize>>,
    }

    struct TestManager(Arc<Counters>);

    struct TestConnection(Arc<Counters>);

    impl Drop for TestConnection {
        fn drop(&mut self) {
            let watched = self.0.watched.lock().as_ref().and_then(|w| w.upgrade());
            if let Some(pool) = watched {
                self.0.sizes_at_close.lock().push(pool.size());
            }
        }
    }

    impl Connection for TestConnection {
        fn is_valid(&self) -> bool {
            !self.0.invalid.load(Ordering::SeqCst)
        }


        fn execute(&mut self, sql: &str, _params: &[Value]) -> TandemResult<u64> {
            match sql {
                "fail" => Err(TandemError::execution("syntax error")),
                "drop" => Err(TandemError::connection("reset by peer")),
                _ => Ok(1),
            }
        }

        fn fetch_all(&mut self, _sql: &str, _params: &[Value]) -> TandemResult<Vec<Row>> {
            Ok(vec![Row::from_pairs([("n", 1)])])
        }

        fn commit(&mut self) -> TandemResult<()> {
            self.0.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn rollback(&mut self) -> TandemResult<()> {
            self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    impl ConnectionManager for TestManager {
        fn connect(&self) -> TandemResult<Box<dyn Connection>> {
            if self.0.refuse.load(Ordering::SeqCst) {
                return Err(TandemError::connection("refused"));
            }
            self.0.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(TestConnection(Arc::clone(&self.0))))
        }
    }

    fn pool(max: usize) -> (Pool, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let config = PoolConfig::new()
            .min_connections(0)
            .max_connections(max)
            .acquire_timeout(Duration::from_millis(50));
        let pool = Pool::new(TestManager(Arc::clone(&counters)), config).unwrap();
        (pool, counters)
    }

    #[test]
    fn test_pool_acquire_and_release() {
        let (pool, counters) = pool(2);
        let conn = pool.acquire().unwrap();
        assert_eq!(pool.stats().active_connections, 1);
        drop(conn);

        assert_eq!(pool.available(), 1);
        let _again = pool.acquire().unwrap();
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pool_timeout() {
        let (pool, _) = pool(1);
        let _held = pool.acquire().unwrap();

        let err = pool.acquire().unwrap_err();
        assert!(matches!(err, TandemError::Timeout { .. }));
        assert_eq!(pool.stats().timeouts, 1);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_waiter_wakes_on_release() {
        let (pool, _) = pool(1);
        let pool = Arc::new(pool);
        let held = pool.acquire().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                pool.acquire_timeout(Duration::from_secs(5))
                    .map(|c| c.use_count())
            })
        };
        thread::sleep(Duration::from_millis(20));
        drop(held);

        assert_eq!(waiter.join().unwrap().unwrap(), 2);
    }

    #[test]
    fn test_unbounded_timeout() {
        let (pool, _) = pool(1);
        let pool = Arc::new(pool);
        let held = pool.acquire_timeout(Duration::MAX).unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.acquire_timeout(Duration::MAX).map(|c| c.use_count()))
        };
        thread::sleep(Duration::from_millis(20));
        drop(held);

        assert_eq!(waiter.join().unwrap().unwrap(), 2);
        assert_eq!(pool.stats().timeouts, 0);
    }

    #[test]
    fn test_stale_connection_closed_outside_lock() {
        let (pool, counters) = pool(1);
        let pool = Arc::new(pool);
        *counters.watched.lock() = Some(Arc::downgrade(&pool));

        drop(pool.acquire().unwrap());
        assert_eq!(pool.available(), 1);
        counters.invalid.store(true, Ordering::SeqCst);

        let conn = pool.acquire().unwrap();
        assert_eq!(conn.use_count(), 1);
        assert_eq!(*counters.sizes_at_close.lock(), vec![0]);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 2);
        assert_eq!(pool.stats().connections_closed, 1);
    }

    #[test]
    fn test_scope_commits_on_success() {
        let (pool, counters) = pool(1);
        let affected = pool.scope(|conn| conn.execute("ok", &[])).unwrap();
        assert_eq!(affected, 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_scope_rolls_back_on_error() {
        let (pool, counters) = pool(1);
        let err = pool.scope(|conn| conn.execute("fail", &[])).unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::ExecutionFailed);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_broken_connection_discarded() {
        let (pool, _) = pool(1);
        let err = pool.scope(|conn| conn.execute("drop", &[])).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.stats().connections_closed, 1);
    }

    #[test]
    fn test_connect_failure_frees_slot() {
        let (pool, counters) = pool(1);
        counters.refuse.store(true, Ordering::SeqCst);
        assert!(pool.acquire().is_err());
        assert_eq!(pool.size(), 0);

        counters.refuse.store(false, Ordering::SeqCst);
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_initialize_and_close() {
        let counters = Arc::new(Counters::default());
        let config = PoolConfig::new().min_connections(2).max_connections(4);
        let pool = Pool::new(TestManager(Arc::clone(&counters)), config).unwrap();
        pool.initialize().unwrap();
        assert_eq!(pool.available(), 2);

        pool.close();
        assert!(pool.is_closed());
        assert_eq!(pool.size(), 0);
        assert!(matches!(pool.acquire(), Err(TandemError::PoolClosed)));
    }
}

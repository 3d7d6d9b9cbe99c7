//! Scripted database driver.
//!
//! Every connection pops its answers from one shared script. An empty
//! script answers queries with no rows and statements with zero affected
//! rows.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tandem_common::error::{TandemError, TandemResult};
use tandem_pool::{Connection, ConnectionManager, Row};
use tandem_sql::{PlaceholderStyle, Value};

use crate::journal::{Event, Journal};

/// A scripted answer.
#[derive(Debug)]
pub enum Response {
    /// Rows for a query (or a row count for a statement).
    Rows(Vec<Row>),
    /// Affected row count for a statement.
    Affected(u64),
    /// Error returned by the next call.
    Fail(TandemError),
}

/// Driver whose answers are queued up front.
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    journal: Journal,
    script: Arc<Mutex<VecDeque<Response>>>,
    style: PlaceholderStyle,
}

impl ScriptedDriver {
    /// Creates a driver writing to `journal`.
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            script: Arc::default(),
            style: PlaceholderStyle::Question,
        }
    }

    /// Sets the placeholder dialect.
    pub fn with_style(mut self, style: PlaceholderStyle) -> Self {
        self.style = style;
        self
    }

    /// Queues rows.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.script.lock().push_back(Response::Rows(rows));
        self
    }

    /// Queues a single row built from pairs.
    pub fn push_row<I, K, V>(&self, pairs: I) -> &Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.push_rows(vec![Row::from_pairs(pairs)])
    }

    /// Queues an affected row count.
    pub fn push_affected(&self, count: u64) -> &Self {
        self.script.lock().push_back(Response::Affected(count));
        self
    }

    /// Queues an error.
    pub fn push_error(&self, error: TandemError) -> &Self {
        self.script.lock().push_back(Response::Fail(error));
        self
    }

    /// Number of answers not consumed yet.
    pub fn pending(&self) -> usize {
        self.script.lock().len()
    }

    /// Returns the journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }
}

impl ConnectionManager for ScriptedDriver {
    fn connect(&self) -> TandemResult<Box<dyn Connection>> {
        Ok(Box::new(ScriptedConnection {
            driver: self.clone(),
        }))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.style
    }
}

struct ScriptedConnection {
    driver: ScriptedDriver,
}

impl ScriptedConnection {
    fn next(&self) -> Option<Response> {
        self.driver.script.lock().pop_front()
    }
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> TandemResult<u64> {
        self.driver.journal.record(Event::Execute {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match self.next() {
            None => Ok(0),
            Some(Response::Affected(n)) => Ok(n),
            Some(Response::Rows(rows)) => Ok(rows.len() as u64),
            Some(Response::Fail(e)) => Err(e),
        }
    }

    fn fetch_all(&mut self, sql: &str, params: &[Value]) -> TandemResult<Vec<Row>> {
        self.driver.journal.record(Event::Query {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match self.next() {
            None => Ok(Vec::new()),
            Some(Response::Rows(rows)) => Ok(rows),
            Some(Response::Affected(_)) => Err(TandemError::internal(
                "scripted an affected count for a query",
            )),
            Some(Response::Fail(e)) => Err(e),
        }
    }

    fn commit(&mut self) -> TandemResult<()> {
        self.driver.journal.record(Event::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> TandemResult<()> {
        self.driver.journal.record(Event::Rollback);
        Ok(())
    }
}

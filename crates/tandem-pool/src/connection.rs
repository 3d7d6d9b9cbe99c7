//! Driver contract.
//!
//! Tandem does not ship a database driver. A driver plugs in by
//! implementing [`ConnectionManager`] (how to open a connection and which
//! placeholder dialect it speaks) and [`Connection`] (one blocking round
//! trip per call).

use std::fmt;
use std::sync::Arc;

use tandem_common::error::TandemResult;
use tandem_sql::{PlaceholderStyle, Value};

/// One result row.
///
/// Column names are shared between all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row. Missing trailing values are treated as NULL.
    pub fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self { columns, values }
    }

    /// Creates a row from `(column, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let (columns, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of a column by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Returns the value at a position.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consumes the row into `(column, value)` pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        let columns = self.columns;
        self.values
            .into_iter()
            .enumerate()
            .map(move |(i, v)| (columns[i].clone(), v))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (column, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{column}: {value}")?;
        }
        write!(f, ")")
    }
}

/// A live database connection.
///
/// Statements run inside an implicit transaction that the pool closes with
/// [`commit`](Connection::commit) or [`rollback`](Connection::rollback).
pub trait Connection: Send {
    /// Runs a statement and returns the affected row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> TandemResult<u64>;

    /// Runs a query and returns every row.
    fn fetch_all(&mut self, sql: &str, params: &[Value]) -> TandemResult<Vec<Row>>;

    /// Runs a query and returns the first row, if any.
    fn fetch_one(&mut self, sql: &str, params: &[Value]) -> TandemResult<Option<Row>> {
        Ok(self.fetch_all(sql, params)?.into_iter().next())
    }

    /// Commits the current transaction.
    fn commit(&mut self) -> TandemResult<()>;

    /// Rolls back the current transaction.
    fn rollback(&mut self) -> TandemResult<()>;

    /// Returns false once the connection is known to be unusable.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Opens connections for a [`Pool`](crate::Pool).
pub trait ConnectionManager: Send + Sync {
    /// Opens a new connection.
    fn connect(&self) -> TandemResult<Box<dyn Connection>>;

    /// Returns the placeholder dialect of the driver.
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup() {
        let row = Row::from_pairs([("id", Value::Int(5)), ("name", Value::from("Ryan"))]);
        assert_eq!(row.get("name"), Some(&Value::from("Ryan")));
        assert_eq!(row.get("age"), None);
        assert_eq!(row.get_index(0), Some(&Value::Int(5)));
        assert_eq!(row.len(), 2);
        assert_eq!(row.to_string(), "(id: 5, name: Ryan)");
    }

    #[test]
    fn test_row_pads_missing_values() {
        let columns: Arc<[String]> = vec!["a".to_string(), "b".to_string()].into();
        let row = Row::new(columns, vec![Value::Int(1)]);
        assert_eq!(row.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_into_pairs() {
        let row = Row::from_pairs([("id", 1), ("age", 27)]);
        let pairs: Vec<_> = row.into_pairs().collect();
        assert_eq!(pairs[1], ("age".to_string(), Value::Int(27)));
    }
}

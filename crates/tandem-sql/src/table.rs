//! Table metadata and the catalog contract.
//!
//! A [`Table`] is built once, either from an explicit column list or by
//! asking a [`Catalog`] for the columns of `(schema, name)`. After that it
//! is read-only and cheap to clone: the column definitions live behind an
//! `Arc` shared by every aliased copy.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tandem_common::error::{TandemError, TandemResult};
use tracing::debug;

use crate::column::Column;
use crate::statement::{Statement, StatementKind};
use crate::writer::{SqlWriter, ToSql};

/// One row of catalog introspection output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    /// Column name.
    pub name: String,
    /// Whether the column is part of the primary key.
    pub is_primary_key: bool,
}

impl CatalogColumn {
    /// Creates a catalog row.
    pub fn new(name: impl Into<String>, is_primary_key: bool) -> Self {
        Self {
            name: name.into(),
            is_primary_key,
        }
    }
}

/// Source of table metadata.
///
/// Implementations return the columns of `schema.table` in ordinal order.
/// An unknown table yields an empty list.
pub trait Catalog {
    /// Lists the columns of `schema.table`.
    fn columns(&self, schema: &str, table: &str) -> TandemResult<Vec<CatalogColumn>>;
}

#[derive(Debug)]
struct TableDef {
    schema: Arc<str>,
    name: Arc<str>,
    columns: Vec<Arc<str>>,
    primary_key: usize,
}

/// Schema identity of one relational table.
///
/// # Example
///
/// ```rust
/// use tandem_sql::{Table, ToSql};
///
/// let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
/// let query = users.select().filter([("age__gt", 18)]).unwrap();
///
/// assert_eq!(
///     query.to_sql(),
///     r#"SELECT * FROM "public"."users" WHERE "age" > ?"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    def: Arc<TableDef>,
    alias: Option<Arc<str>>,
}

impl Table {
    /// Creates a table from an explicit column list.
    ///
    /// Fails with `InvalidConfig` when the list is empty, holds duplicate
    /// names, or does not contain `primary_key`.
    pub fn new<I, S>(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: I,
        primary_key: &str,
    ) -> TandemResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let schema = schema.into();
        let name = name.into();
        let columns: Vec<Arc<str>> = columns
            .into_iter()
            .map(|c| {
                let c: String = c.into();
                Arc::from(c)
            })
            .collect();

        if columns.is_empty() {
            return Err(TandemError::invalid_config(format!(
                "table '{schema}.{name}' has no columns"
            )));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_ref()) {
                return Err(TandemError::invalid_config(format!(
                    "duplicate column '{column}' in table '{schema}.{name}'"
                )));
            }
        }

        let primary_key = columns
            .iter()
            .position(|c| c.as_ref() == primary_key)
            .ok_or_else(|| {
                TandemError::invalid_config(format!(
                    "primary key '{primary_key}' is not a column of '{schema}.{name}'"
                ))
            })?;

        Ok(Self {
            def: Arc::new(TableDef {
                schema: schema.into(),
                name: name.into(),
                columns,
                primary_key,
            }),
            alias: None,
        })
    }

    /// Discovers the table's columns and primary key from a catalog.
    ///
    /// An empty catalog result is `UnknownTable`. Tables without a primary
    /// key, or with a composite one, are rejected with `InvalidConfig`.
    pub fn from_catalog<C>(catalog: &C, schema: &str, name: &str) -> TandemResult<Self>
    where
        C: Catalog + ?Sized,
    {
        let rows = catalog.columns(schema, name)?;
        if rows.is_empty() {
            return Err(TandemError::UnknownTable {
                schema: schema.to_string(),
                table: name.to_string(),
            });
        }

        let mut keys = rows.iter().filter(|r| r.is_primary_key);
        let primary_key = match (keys.next(), keys.next()) {
            (Some(pk), None) => pk.name.clone(),
            (None, _) => {
                return Err(TandemError::invalid_config(format!(
                    "table '{schema}.{name}' has no primary key"
                )))
            }
            (Some(_), Some(_)) => {
                return Err(TandemError::invalid_config(format!(
                    "table '{schema}.{name}' has a composite primary key"
                )))
            }
        };

        debug!(schema, table = name, columns = rows.len(), "table discovered");
        Self::new(schema, name, rows.into_iter().map(|r| r.name), &primary_key)
    }

    /// Returns the schema name.
    pub fn schema(&self) -> &str {
        &self.def.schema
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Returns `schema.name` without quoting.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.def.schema, self.def.name)
    }

    /// Returns a copy of this table rendered under `alias`.
    ///
    /// Column definitions are shared; columns obtained from the copy are
    /// qualified with the alias.
    pub fn alias(&self, alias: impl Into<String>) -> Self {
        Self {
            def: Arc::clone(&self.def),
            alias: Some(Arc::from(alias.into())),
        }
    }

    /// Returns the alias, if any.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> TandemResult<Column> {
        self.def
            .columns
            .iter()
            .find(|c| c.as_ref() == name)
            .map(|c| self.make_column(c))
            .ok_or_else(|| TandemError::UnknownColumn {
                column: name.to_string(),
                table: self.def.name.to_string(),
            })
    }

    /// Returns true if the table has a column called `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Returns the ordinal position of a column.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.def.columns.iter().position(|c| c.as_ref() == name)
    }

    /// Returns all columns in ordinal order.
    pub fn columns(&self) -> Vec<Column> {
        self.def
            .columns
            .iter()
            .map(|c| self.make_column(c))
            .collect()
    }

    /// Returns the column names in ordinal order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.def.columns.iter().map(|c| c.as_ref())
    }

    /// Returns the number of columns.
    pub fn column_count(&self) -> usize {
        self.def.columns.len()
    }

    /// Returns the primary key column.
    pub fn primary_key(&self) -> Column {
        self.make_column(&self.def.columns[self.def.primary_key])
    }

    /// Returns the ordinal position of the primary key.
    pub fn primary_key_index(&self) -> usize {
        self.def.primary_key
    }

    fn make_column(&self, name: &Arc<str>) -> Column {
        Column::new(Arc::clone(name), self.alias.clone())
    }

    // =========================================================================
    // Statement factories
    // =========================================================================

    /// Starts a SELECT statement (`SELECT * FROM ...`).
    pub fn select(&self) -> Statement {
        Statement::new(StatementKind::Select, self.clone())
    }

    /// Starts an INSERT statement.
    pub fn insert(&self) -> Statement {
        Statement::new(StatementKind::Insert, self.clone())
    }

    /// Starts an UPDATE statement.
    pub fn update(&self) -> Statement {
        Statement::new(StatementKind::Update, self.clone())
    }

    /// Starts a DELETE statement.
    pub fn delete(&self) -> Statement {
        Statement::new(StatementKind::Delete, self.clone())
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.def, &other.def)
            || (self.def.schema == other.def.schema
                && self.def.name == other.def.name
                && self.def.columns == other.def.columns
                && self.def.primary_key == other.def.primary_key))
            && self.alias == other.alias
    }
}

impl ToSql for Table {
    fn write_sql(&self, w: &mut SqlWriter) {
        w.push_ident(&self.def.schema);
        w.push_sql(".");
        w.push_ident(&self.def.name);
        if let Some(alias) = &self.alias {
            w.push_sql(" AS ");
            w.push_ident(alias);
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

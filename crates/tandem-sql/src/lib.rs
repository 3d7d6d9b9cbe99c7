//! # tandem-sql
//!
//! Immutable, injection-safe SQL statement builder.
//!
//! Statements start from a [`Table`] and are refined by fluent mutators that
//! each return a new [`Statement`]. Rendering produces SQL text containing
//! only placeholders plus the parameters in placeholder order.
//!
//! - **Values**: [`Value`] wraps bindable host values
//! - **Expressions**: [`Condition`], [`Assignment`] and [`Ordering`] built from [`Column`]
//! - **Clauses**: [`Clause`] checks element types when it is built
//! - **Statements**: SELECT, INSERT, UPDATE and DELETE with a fixed clause order
//!
//! ## Example
//!
//! ```rust
//! use tandem_sql::{Table, ToSql, Value};
//!
//! let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
//! let query = users.delete().filter([("id", 5)]).unwrap();
//!
//! let rendered = query.render();
//! assert_eq!(rendered.sql, r#"DELETE FROM "public"."users" WHERE "id" = ?"#);
//! assert_eq!(rendered.params, vec![Value::Int(5)]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod clause;
pub mod column;
pub mod expr;
pub mod statement;
pub mod table;
pub mod value;
pub mod writer;

pub use clause::{Clause, ClauseItem, ClauseKind};
pub use column::Column;
pub use expr::{Assignment, CompareOp, Condition, Direction, Expression, Nulls, Ordering};
pub use statement::{Statement, StatementKind};
pub use table::{Catalog, CatalogColumn, Table};
pub use value::{PlaceholderStyle, Value};
pub use writer::{Rendered, SqlWriter, ToSql};

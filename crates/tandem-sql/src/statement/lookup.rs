//! Lookup-key resolution (`"age__gt"` → `"age" > ?`).

use tandem_common::error::{TandemError, TandemResult};

use crate::column::Column;
use crate::expr::{Condition, Ordering};
use crate::table::Table;
use crate::value::Value;

const SEPARATOR: &str = "__";

/// Splits a lookup key into its column and suffix.
///
/// A key naming a whole column has no suffix, even when the column name
/// itself contains the separator.
fn split<'k>(table: &Table, key: &'k str) -> TandemResult<(Column, Option<&'k str>)> {
    if table.has_column(key) {
        return Ok((table.column(key)?, None));
    }
    match key.rsplit_once(SEPARATOR) {
        Some((column, suffix)) => Ok((table.column(column)?, Some(suffix))),
        None => table.column(key).map(|c| (c, None)),
    }
}

/// Resolves a WHERE lookup. No suffix means equality.
pub(crate) fn condition(table: &Table, key: &str, value: Value) -> TandemResult<Condition> {
    let (column, suffix) = split(table, key)?;
    column.lookup(suffix.unwrap_or("eq"), value)
}

/// Resolves an ORDER BY lookup. No suffix means ascending.
pub(crate) fn ordering(table: &Table, key: &str) -> TandemResult<Ordering> {
    let (column, suffix) = split(table, key)?;
    match suffix {
        None | Some("asc") => Ok(column.asc()),
        Some("desc") => Ok(column.desc()),
        Some(other) => Err(TandemError::UnknownLookup {
            key: format!("{}{}{}", column.name(), SEPARATOR, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ToSql;
    use tandem_common::ErrorCode;

    fn table() -> Table {
        Table::new("public", "t", ["id", "age", "created__at"], "id").unwrap()
    }

    #[test]
    fn test_plain_key_is_equality() {
        let cond = condition(&table(), "age", Value::Int(3)).unwrap();
        assert_eq!(cond.to_sql(), r#""age" = ?"#);
    }

    #[test]
    fn test_column_containing_separator() {
        let cond = condition(&table(), "created__at", Value::Int(3)).unwrap();
        assert_eq!(cond.to_sql(), r#""created__at" = ?"#);

        let cond = condition(&table(), "created__at__lt", Value::Int(3)).unwrap();
        assert_eq!(cond.to_sql(), r#""created__at" < ?"#);
    }

    #[test]
    fn test_unknown_column_and_lookup() {
        let err = condition(&table(), "height__gt", Value::Int(3)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownColumn);

        let err = condition(&table(), "age__near", Value::Int(3)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownLookup);
    }

    #[test]
    fn test_ordering_keys() {
        assert_eq!(ordering(&table(), "age").unwrap().to_sql(), r#""age" ASC"#);
        assert_eq!(
            ordering(&table(), "age__desc").unwrap().to_sql(),
            r#""age" DESC"#
        );
        let err = ordering(&table(), "age__up").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownLookup);
    }
}

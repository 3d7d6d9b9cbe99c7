//! `information_schema` catalog.

use tandem_common::error::{TandemError, TandemResult};
use tandem_sql::{Catalog, CatalogColumn, PlaceholderStyle, Value};
use tracing::debug;

use crate::pool::Pool;

fn introspection_sql(style: PlaceholderStyle) -> String {
    format!(
        "SELECT a.column_name, c.constraint_type \
         FROM information_schema.columns AS a \
         LEFT JOIN information_schema.key_column_usage AS b \
         ON a.table_schema = b.table_schema \
         AND a.table_name = b.table_name \
         AND a.column_name = b.column_name \
         LEFT JOIN information_schema.table_constraints AS c \
         ON b.table_schema = c.table_schema \
         AND b.table_name = c.table_name \
         AND b.constraint_name = c.constraint_name \
         WHERE a.table_schema = {} AND a.table_name = {} \
         ORDER BY a.ordinal_position ASC",
        style.token(1),
        style.token(2),
    )
}

/// Folds introspection rows into one entry per column.
///
/// A column taking part in several constraints comes back once per
/// constraint; it is a key column if any of them is the primary key.
fn fold_rows(rows: Vec<crate::Row>) -> TandemResult<Vec<CatalogColumn>> {
    let mut columns: Vec<CatalogColumn> = Vec::with_capacity(rows.len());
    for row in rows {
        let name = row
            .get_index(0)
            .and_then(Value::as_str)
            .ok_or_else(|| TandemError::execution("catalog row without a column name"))?;
        let is_primary_key = matches!(row.get_index(1), Some(Value::String(t)) if t == "PRIMARY KEY");

        match columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.is_primary_key |= is_primary_key,
            None => columns.push(CatalogColumn::new(name, is_primary_key)),
        }
    }
    Ok(columns)
}

impl Catalog for Pool {
    fn columns(&self, schema: &str, table: &str) -> TandemResult<Vec<CatalogColumn>> {
        let sql = introspection_sql(self.placeholder_style());
        let params = [Value::from(schema), Value::from(table)];
        let rows = self.scope(|conn| conn.fetch_all(&sql, &params))?;
        debug!(schema, table, rows = rows.len(), "catalog introspected");
        fold_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Row;

    #[test]
    fn test_sql_is_parameterised() {
        let sql = introspection_sql(PlaceholderStyle::Numbered);
        assert!(sql.contains("a.table_schema = $1 AND a.table_name = $2"));
        assert!(sql.ends_with("ORDER BY a.ordinal_position ASC"));
    }

    #[test]
    fn test_fold_rows() {
        let rows = vec![
            Row::from_pairs([
                ("column_name", Value::from("id")),
                ("constraint_type", Value::from("FOREIGN KEY")),
            ]),
            Row::from_pairs([
                ("column_name", Value::from("id")),
                ("constraint_type", Value::from("PRIMARY KEY")),
            ]),
            Row::from_pairs([
                ("column_name", Value::from("name")),
                ("constraint_type", Value::Null),
            ]),
        ];

        let columns = fold_rows(rows).unwrap();
        assert_eq!(
            columns,
            vec![
                CatalogColumn::new("id", true),
                CatalogColumn::new("name", false),
            ]
        );
    }
}

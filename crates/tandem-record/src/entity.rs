//! Schema-derived entities.
//!
//! An [`EntityLayout`] is built once per table and shared by every entity
//! of that table. An [`Entity`] holds one value slot per column; a column
//! without a value holds `Value::Null`, never a missing key.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tandem_common::error::{TandemError, TandemResult};
use tandem_pool::Row;
use tandem_sql::{Table, Value};

/// Column layout shared by all entities of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLayout {
    table: String,
    columns: Vec<String>,
    primary_key: usize,
}

impl EntityLayout {
    /// Builds the layout of a table.
    pub fn from_table(table: &Table) -> Arc<Self> {
        Arc::new(Self {
            table: table.qualified_name(),
            columns: table.column_names().map(str::to_string).collect(),
            primary_key: table.primary_key_index(),
        })
    }

    /// Returns the qualified table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Returns the column names in ordinal order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the primary key column name.
    pub fn primary_key(&self) -> &str {
        &self.columns[self.primary_key]
    }

    /// Returns the position of a column.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn unknown(&self, column: &str) -> TandemError {
        TandemError::UnknownColumn {
            column: column.to_string(),
            table: self.table.clone(),
        }
    }

    /// Creates an entity with every column set to NULL.
    pub fn new_entity(self: &Arc<Self>) -> Entity {
        Entity {
            layout: Arc::clone(self),
            values: vec![Value::Null; self.columns.len()],
            cache_key: None,
        }
    }

    /// Creates an entity from a result row.
    ///
    /// Columns missing from the row stay NULL; row columns unknown to the
    /// layout are ignored.
    pub fn entity_from_row(self: &Arc<Self>, row: &Row) -> Entity {
        let mut entity = self.new_entity();
        entity.overwrite_from(row);
        entity
    }

    /// Restores a frozen entity.
    ///
    /// The payload must come from the same table and may only name known
    /// columns; anything else is a `Serialization` error.
    pub fn thaw(self: &Arc<Self>, frozen: FrozenEntity) -> TandemResult<Entity> {
        if frozen.table != self.table {
            return Err(TandemError::serialization(format!(
                "payload belongs to '{}', expected '{}'",
                frozen.table, self.table
            )));
        }

        let mut entity = self.new_entity();
        for (column, value) in frozen.fields {
            let index = self.position(&column).ok_or_else(|| {
                TandemError::serialization(format!(
                    "payload column '{column}' is not part of '{}'",
                    self.table
                ))
            })?;
            entity.values[index] = value;
        }
        entity.cache_key = frozen.key;
        Ok(entity)
    }
}

/// Serializable form of an [`Entity`] used as cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenEntity {
    /// Qualified table name.
    pub table: String,
    /// Cache key, if assigned.
    pub key: Option<String>,
    /// Column values.
    pub fields: BTreeMap<String, Value>,
}

/// One record of a table.
///
/// # Example
///
/// ```rust
/// use tandem_record::EntityLayout;
/// use tandem_sql::{Table, Value};
///
/// let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
/// let layout = EntityLayout::from_table(&users);
///
/// let ryan = layout.new_entity().with("name", "Ryan").unwrap().with("age", 27).unwrap();
/// assert!(ryan.primary_key().is_null());
/// assert_eq!(ryan.get("age"), Some(&Value::Int(27)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    layout: Arc<EntityLayout>,
    values: Vec<Value>,
    cache_key: Option<String>,
}

impl Entity {
    /// Returns the layout.
    pub fn layout(&self) -> &Arc<EntityLayout> {
        &self.layout
    }

    /// Returns a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.layout.position(column).map(|i| &self.values[i])
    }

    /// Sets a column value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> TandemResult<()> {
        let index = self
            .layout
            .position(column)
            .ok_or_else(|| self.layout.unknown(column))?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Sets a column value, builder style.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> TandemResult<Self> {
        self.set(column, value)?;
        Ok(self)
    }

    /// Returns the primary key value (NULL until first saved).
    pub fn primary_key(&self) -> &Value {
        &self.values[self.layout.primary_key]
    }

    /// Returns the cache key, if assigned.
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    /// Assigns the cache key.
    pub fn set_cache_key(&mut self, key: impl Into<String>) {
        self.cache_key = Some(key.into());
    }

    /// Iterates `(column, value)` pairs in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.layout
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Overwrites every column present in `row`.
    pub fn overwrite_from(&mut self, row: &Row) {
        for (column, value) in row.iter() {
            if let Some(index) = self.layout.position(column) {
                self.values[index] = value.clone();
            }
        }
    }

    /// Returns the column values as a mapping.
    pub fn to_mapping(&self) -> BTreeMap<String, Value> {
        self.iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }

    /// Returns the serializable form.
    pub fn freeze(&self) -> FrozenEntity {
        FrozenEntity {
            table: self.layout.table.clone(),
            key: self.cache_key.clone(),
            fields: self.to_mapping(),
        }
    }

    /// Returns true if the entity belongs to `layout`'s table.
    pub(crate) fn belongs_to(&self, layout: &Arc<EntityLayout>) -> bool {
        Arc::ptr_eq(&self.layout, layout) || *self.layout == **layout
    }

    /// Fails with `TypeMismatch` unless the entity belongs to `layout`.
    pub(crate) fn ensure_layout(&self, layout: &Arc<EntityLayout>) -> TandemResult<()> {
        if self.belongs_to(layout) {
            Ok(())
        } else {
            Err(TandemError::type_mismatch(
                format!("entity of '{}'", layout.table),
                format!("entity of '{}'", self.layout.table),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Arc<EntityLayout> {
        let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
        EntityLayout::from_table(&users)
    }

    #[test]
    fn test_new_entity_is_fully_populated() {
        let entity = layout().new_entity();
        assert_eq!(entity.iter().count(), 3);
        assert!(entity.iter().all(|(_, v)| v.is_null()));
        assert_eq!(entity.layout().primary_key(), "id");
    }

    #[test]
    fn test_set_unknown_column() {
        let mut entity = layout().new_entity();
        let err = entity.set("height", 180).unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::UnknownColumn);
    }

    #[test]
    fn test_overwrite_from_row() {
        let mut entity = layout().new_entity().with("name", "Ryan").unwrap();
        let row = Row::from_pairs([
            ("id", Value::Int(5)),
            ("name", Value::from("Ryan")),
            ("age", Value::Int(27)),
            ("extra", Value::Bool(true)),
        ]);
        entity.overwrite_from(&row);
        assert_eq!(entity.primary_key(), &Value::Int(5));
        assert_eq!(entity.get("age"), Some(&Value::Int(27)));
        assert_eq!(entity.get("extra"), None);
    }

    #[test]
    fn test_freeze_and_thaw() {
        let layout = layout();
        let mut entity = layout.new_entity().with("id", 5).unwrap();
        entity.set_cache_key("k");

        let thawed = layout.thaw(entity.freeze()).unwrap();
        assert_eq!(thawed, entity);
    }

    #[test]
    fn test_thaw_rejects_foreign_payload() {
        let layout = layout();
        let mut frozen = layout.new_entity().freeze();
        frozen.fields.insert("height".to_string(), Value::Int(1));
        let err = layout.thaw(frozen).unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::Serialization);

        let mut frozen = layout.new_entity().freeze();
        frozen.table = "public.orders".to_string();
        assert!(layout.thaw(frozen).is_err());
    }
}

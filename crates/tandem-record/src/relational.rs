//! Relational store.

use std::sync::Arc;

use tandem_common::error::{TandemError, TandemResult};
use tandem_pool::{Execute, Pool};
use tandem_sql::{Statement, Table, Value};
use tracing::debug;

use crate::entity::{Entity, EntityLayout};
use crate::traits::{Deletable, Gettable, Savable};

/// Entities backed by one relational table.
///
/// `save` chooses INSERT when the primary key is NULL and UPDATE otherwise;
/// both request `RETURNING *` and copy the returned row back into the
/// entity, so server-assigned defaults always end up in memory.
#[derive(Debug, Clone)]
pub struct RelationalRecord {
    pool: Arc<Pool>,
    table: Table,
    layout: Arc<EntityLayout>,
}

impl RelationalRecord {
    /// Creates a store for `table`.
    pub fn new(pool: Arc<Pool>, table: Table) -> Self {
        let layout = EntityLayout::from_table(&table);
        Self {
            pool,
            table,
            layout,
        }
    }

    /// Creates a store by introspecting `schema.name` through the pool.
    pub fn from_catalog(pool: Arc<Pool>, schema: &str, name: &str) -> TandemResult<Self> {
        let table = Table::from_catalog(&*pool, schema, name)?;
        Ok(Self::new(pool, table))
    }

    /// Returns the table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the entity layout.
    pub fn layout(&self) -> &Arc<EntityLayout> {
        &self.layout
    }

    /// Returns the pool.
    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    /// Creates an empty entity of this table.
    pub fn new_entity(&self) -> Entity {
        self.layout.new_entity()
    }

    fn keyed(&self, statement: Statement, id: &Value) -> TandemResult<Statement> {
        statement.where_(self.table.primary_key().eq(id.clone()))
    }

    /// SELECT by primary key, expecting exactly one row.
    pub fn get_id(&self, id: &Value) -> TandemResult<Entity> {
        let rows = self.keyed(self.table.select(), id)?.all(&self.pool)?;
        match rows.as_slice() {
            [row] => Ok(self.layout.entity_from_row(row)),
            [] => Err(TandemError::NotFound {
                table: self.table.qualified_name(),
                key: format!("{} = {}", self.layout.primary_key(), id),
            }),
            rows => Err(TandemError::DataIntegrity {
                table: self.table.qualified_name(),
                rows: rows.len(),
            }),
        }
    }

    /// Keyed DELETE. Returns whether a row existed.
    pub fn delete_id(&self, id: &Value) -> TandemResult<bool> {
        let affected = self.keyed(self.table.delete(), id)?.execute(&self.pool)?;
        debug!(table = %self.table.qualified_name(), id = %id, affected, "deleted");
        Ok(affected > 0)
    }

    fn insert_statement(&self, entity: &Entity) -> TandemResult<Statement> {
        let pairs: Vec<(&str, Value)> = entity
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(column, value)| (column, value.clone()))
            .collect();
        self.table.insert().values(pairs)?.returning_all()
    }

    fn update_statement(&self, entity: &Entity) -> TandemResult<Statement> {
        let pk = self.layout.primary_key();
        let mut pairs: Vec<(&str, Value)> = entity
            .iter()
            .filter(|(column, _)| *column != pk)
            .map(|(column, value)| (column, value.clone()))
            .collect();
        if pairs.is_empty() {
            pairs.push((pk, entity.primary_key().clone()));
        }
        let statement = self.table.update().set(pairs)?;
        self.keyed(statement, entity.primary_key())?.returning_all()
    }
}

impl Gettable for RelationalRecord {
    type Key = Value;
    type Output = Entity;

    fn get(&self, id: &Value) -> TandemResult<Entity> {
        self.get_id(id)
    }
}

impl Savable for RelationalRecord {
    fn save(&self, entity: &mut Entity) -> TandemResult<()> {
        entity.ensure_layout(&self.layout)?;

        let inserting = entity.primary_key().is_null();
        let statement = if inserting {
            self.insert_statement(entity)?
        } else {
            self.update_statement(entity)?
        };

        match statement.one(&self.pool)? {
            Some(row) => {
                entity.overwrite_from(&row);
                debug!(
                    table = %self.table.qualified_name(),
                    id = %entity.primary_key(),
                    inserted = inserting,
                    "saved"
                );
                Ok(())
            }
            None if inserting => Err(TandemError::execution(format!(
                "INSERT into '{}' returned no row",
                self.table.qualified_name()
            ))),
            None => Err(TandemError::NotFound {
                table: self.table.qualified_name(),
                key: format!("{} = {}", self.layout.primary_key(), entity.primary_key()),
            }),
        }
    }
}

impl Deletable for RelationalRecord {
    fn delete(&self, entity: &Entity) -> TandemResult<bool> {
        entity.ensure_layout(&self.layout)?;
        if entity.primary_key().is_null() {
            return Ok(false);
        }
        self.delete_id(entity.primary_key())
    }
}

//! Statement execution.
//!
//! Each call renders the statement in the pool's placeholder dialect and
//! runs it in one [`Pool::scope`]: one round trip, committed on success,
//! rolled back before any error is returned. Nothing is retried.

use tandem_common::error::TandemResult;
use tandem_sql::{Rendered, Statement, ToSql};
use tracing::debug;

use crate::connection::Row;
use crate::pool::Pool;

/// Runs built statements against a [`Pool`].
pub trait Execute {
    /// Fetches every row.
    fn all(&self, pool: &Pool) -> TandemResult<Vec<Row>>;

    /// Fetches the first row, if any.
    fn one(&self, pool: &Pool) -> TandemResult<Option<Row>>;

    /// Runs the statement and returns the affected row count.
    fn execute(&self, pool: &Pool) -> TandemResult<u64>;
}

fn prepare(statement: &Statement, pool: &Pool) -> TandemResult<Rendered> {
    statement.validate()?;
    let rendered = statement.render_with(pool.placeholder_style());
    debug!(
        kind = %statement.kind(),
        sql = %rendered.sql,
        params = rendered.param_count(),
        "executing statement"
    );
    Ok(rendered)
}

impl Execute for Statement {
    fn all(&self, pool: &Pool) -> TandemResult<Vec<Row>> {
        let Rendered { sql, params } = prepare(self, pool)?;
        pool.scope(|conn| conn.fetch_all(&sql, &params))
    }

    fn one(&self, pool: &Pool) -> TandemResult<Option<Row>> {
        let Rendered { sql, params } = prepare(self, pool)?;
        pool.scope(|conn| conn.fetch_one(&sql, &params))
    }

    fn execute(&self, pool: &Pool) -> TandemResult<u64> {
        let Rendered { sql, params } = prepare(self, pool)?;
        pool.scope(|conn| conn.execute(&sql, &params))
    }
}

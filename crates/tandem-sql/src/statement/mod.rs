//! Immutable statement builder.
//!
//! A [`Statement`] is bound to one [`StatementKind`] for its whole life.
//! Every mutator borrows the receiver and returns a new statement; clauses
//! are shared through `Arc` and never modified in place, so a partially
//! built statement can be reused as a template.
//!
//! Rendering walks the kind's clause order once. Text and parameters come
//! out of the same walk, which keeps every placeholder aligned with its
//! parameter.

mod lookup;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tandem_common::error::{TandemError, TandemResult};

use crate::clause::{Clause, ClauseItem, ClauseKind};
use crate::expr::{Assignment, Condition, Expression, Ordering};
use crate::table::Table;
use crate::value::Value;
use crate::writer::{SqlWriter, ToSql};

/// The four statement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `SELECT`
    Select,
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
}

impl StatementKind {
    /// Returns the fixed render order of this kind's clauses.
    pub fn clause_order(self) -> &'static [ClauseKind] {
        use ClauseKind::*;
        match self {
            StatementKind::Select => &[Select, From, Where, OrderBy, Limit, Offset],
            StatementKind::Insert => &[InsertInto, Columns, Values, Returning],
            StatementKind::Update => &[Update, Set, Where, Returning],
            StatementKind::Delete => &[Delete, From, Where, Returning],
        }
    }

    /// Returns the statement keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }

    /// Returns true if clauses of `kind` are legal for this statement kind.
    pub fn allows(self, kind: ClauseKind) -> bool {
        self.clause_order().contains(&kind)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A SQL statement under construction.
///
/// # Example
///
/// ```rust
/// use tandem_sql::{Table, ToSql, Value};
///
/// let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
/// let update = users
///     .update()
///     .set([("name", "Kroon")])
///     .unwrap()
///     .where_(users.column("id").unwrap().eq(5))
///     .unwrap()
///     .returning_all()
///     .unwrap();
///
/// let rendered = update.render();
/// assert_eq!(
///     rendered.sql,
///     r#"UPDATE "public"."users" SET "name" = ? WHERE "id" = ? RETURNING *"#
/// );
/// assert_eq!(rendered.params, vec![Value::from("Kroon"), Value::Int(5)]);
/// ```
#[derive(Debug, Clone)]
pub struct Statement {
    kind: StatementKind,
    table: Table,
    clauses: BTreeMap<ClauseKind, Arc<Clause>>,
}

impl Statement {
    pub(crate) fn new(kind: StatementKind, table: Table) -> Self {
        let mut clauses = BTreeMap::new();
        let table_item = || vec![ClauseItem::Table(table.clone())];
        let initial = match kind {
            StatementKind::Select => vec![
                Clause::from_parts(ClauseKind::Select, Vec::new()),
                Clause::from_parts(ClauseKind::From, table_item()),
            ],
            StatementKind::Insert => vec![Clause::from_parts(ClauseKind::InsertInto, table_item())],
            StatementKind::Update => vec![Clause::from_parts(ClauseKind::Update, table_item())],
            StatementKind::Delete => vec![
                Clause::from_parts(ClauseKind::Delete, Vec::new()),
                Clause::from_parts(ClauseKind::From, table_item()),
            ],
        };
        for clause in initial {
            clauses.insert(clause.kind(), Arc::new(clause));
        }

        Self {
            kind,
            table,
            clauses,
        }
    }

    /// Returns the statement kind.
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Returns the target table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Returns the clause of the given kind, if present.
    pub fn clause(&self, kind: ClauseKind) -> Option<&Clause> {
        self.clauses.get(&kind).map(Arc::as_ref)
    }

    /// Returns true if a RETURNING clause is present.
    pub fn returns_rows(&self) -> bool {
        self.kind == StatementKind::Select || self.clauses.contains_key(&ClauseKind::Returning)
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    fn require(&self, operation: &str, kind: ClauseKind) -> TandemResult<()> {
        if self.kind.allows(kind) {
            Ok(())
        } else {
            Err(TandemError::unsupported(operation, self.kind.as_str()))
        }
    }

    fn with(&self, clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut next = self.clone();
        for clause in clauses {
            next.clauses.insert(clause.kind(), Arc::new(clause));
        }
        next
    }

    /// Replaces the SELECT list. An empty list selects `*`.
    pub fn select<I, E>(&self, exprs: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.require("select", ClauseKind::Select)?;
        let items = exprs
            .into_iter()
            .map(|e| ClauseItem::Expression(e.into()))
            .collect();
        Ok(self.with([Clause::new(ClauseKind::Select, items)?]))
    }

    /// Adds a WHERE condition, AND-ed onto any existing one.
    pub fn where_(&self, condition: Condition) -> TandemResult<Self> {
        self.require("where", ClauseKind::Where)?;
        let condition = match self.clause(ClauseKind::Where).and_then(Clause::condition) {
            Some(existing) => existing.clone().and(condition),
            None => condition,
        };
        Ok(self.with([Clause::new(ClauseKind::Where, vec![condition.into()])?]))
    }

    /// Adds WHERE conditions from `column__op` lookup keys.
    ///
    /// A key without a suffix means equality. The conditions are AND-ed in
    /// iteration order. An empty iterator leaves the statement unchanged.
    pub fn filter<I, K, V>(&self, lookups: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.require("filter", ClauseKind::Where)?;
        let conditions = lookups
            .into_iter()
            .map(|(key, value)| lookup::condition(&self.table, key.as_ref(), value.into()))
            .collect::<TandemResult<Vec<_>>>()?;

        match Condition::all(conditions) {
            Some(condition) => self.where_(condition),
            None => Ok(self.clone()),
        }
    }

    /// Replaces the ORDER BY list.
    pub fn order_by<I>(&self, orderings: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = Ordering>,
    {
        self.require("order_by", ClauseKind::OrderBy)?;
        let items = orderings.into_iter().map(ClauseItem::Ordering).collect();
        Ok(self.with([Clause::new(ClauseKind::OrderBy, items)?]))
    }

    /// Replaces the ORDER BY list from `column` / `column__desc` keys.
    pub fn order_by_keys<I, K>(&self, keys: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.require("order_by", ClauseKind::OrderBy)?;
        let orderings = keys
            .into_iter()
            .map(|key| lookup::ordering(&self.table, key.as_ref()))
            .collect::<TandemResult<Vec<_>>>()?;
        self.order_by(orderings)
    }

    /// Sets LIMIT. The count is bound as a parameter.
    pub fn limit(&self, count: u64) -> TandemResult<Self> {
        self.require("limit", ClauseKind::Limit)?;
        Ok(self.with([Clause::new(ClauseKind::Limit, vec![count.into()])?]))
    }

    /// Sets OFFSET. The start is bound as a parameter.
    pub fn offset(&self, start: u64) -> TandemResult<Self> {
        self.require("offset", ClauseKind::Offset)?;
        Ok(self.with([Clause::new(ClauseKind::Offset, vec![start.into()])?]))
    }

    /// Replaces the inserted columns and values.
    pub fn values<I, K, V>(&self, pairs: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.require("values", ClauseKind::Values)?;
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (key, value) in pairs {
            columns.push(ClauseItem::Column(self.table.column(key.as_ref())?));
            values.push(ClauseItem::Value(value.into()));
        }
        Ok(self.with([
            Clause::new(ClauseKind::Columns, columns)?,
            Clause::new(ClauseKind::Values, values)?,
        ]))
    }

    /// Replaces the SET list from `(column, value)` pairs.
    pub fn set<I, K, V>(&self, pairs: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.require("set", ClauseKind::Set)?;
        let assignments = pairs
            .into_iter()
            .map(|(key, value)| Ok(self.table.column(key.as_ref())?.assign(value)))
            .collect::<TandemResult<Vec<_>>>()?;
        self.set_assignments(assignments)
    }

    /// Replaces the SET list.
    pub fn set_assignments<I>(&self, assignments: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = Assignment>,
    {
        self.require("set", ClauseKind::Set)?;
        let items = assignments
            .into_iter()
            .map(ClauseItem::Assignment)
            .collect();
        Ok(self.with([Clause::new(ClauseKind::Set, items)?]))
    }

    /// Replaces the RETURNING list. An empty list returns `*`.
    pub fn returning<I, E>(&self, exprs: I) -> TandemResult<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expression>,
    {
        self.require("returning", ClauseKind::Returning)?;
        let items = exprs
            .into_iter()
            .map(|e| ClauseItem::Expression(e.into()))
            .collect();
        Ok(self.with([Clause::new(ClauseKind::Returning, items)?]))
    }

    /// `RETURNING *`
    pub fn returning_all(&self) -> TandemResult<Self> {
        self.returning(std::iter::empty::<Expression>())
    }

    // =========================================================================
    // Completeness
    // =========================================================================

    /// Checks that the statement can be executed.
    ///
    /// INSERT needs VALUES and UPDATE needs SET.
    pub fn validate(&self) -> TandemResult<()> {
        let required = match self.kind {
            StatementKind::Insert => Some(ClauseKind::Values),
            StatementKind::Update => Some(ClauseKind::Set),
            StatementKind::Select | StatementKind::Delete => None,
        };
        match required {
            Some(kind) if !self.clauses.contains_key(&kind) => Err(TandemError::type_mismatch(
                format!("{kind} clause in {} statement", self.kind),
                "none",
            )),
            _ => Ok(()),
        }
    }
}

impl ToSql for Statement {
    fn write_sql(&self, w: &mut SqlWriter) {
        let mut first = true;
        for kind in self.kind.clause_order() {
            if let Some(clause) = self.clauses.get(kind) {
                if !first {
                    w.push_sql(" ");
                }
                clause.write_sql(w);
                first = false;
            }
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PlaceholderStyle;
    use proptest::prelude::*;
    use tandem_common::ErrorCode;

    fn users() -> Table {
        Table::new("public", "users", ["id", "name", "age"], "id").unwrap()
    }

    fn placeholders(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn test_select_all() {
        assert_eq!(
            users().select().to_sql(),
            r#"SELECT * FROM "public"."users""#
        );
    }

    #[test]
    fn test_select_full_order() {
        let t = users();
        let q = t
            .select()
            .offset(20)
            .unwrap()
            .limit(10)
            .unwrap()
            .order_by([t.column("age").unwrap().desc()])
            .unwrap()
            .filter([("age__ge", 18)])
            .unwrap()
            .select([t.column("id").unwrap(), t.column("name").unwrap()])
            .unwrap();

        let rendered = q.render();
        assert_eq!(
            rendered.sql,
            r#"SELECT "id", "name" FROM "public"."users" WHERE "age" >= ? ORDER BY "age" DESC LIMIT ? OFFSET ?"#
        );
        assert_eq!(
            rendered.params,
            vec![Value::Int(18), Value::Int(10), Value::Int(20)]
        );
    }

    #[test]
    fn test_insert_scenario() {
        let q = users()
            .insert()
            .values([("name", Value::from("Ryan")), ("age", Value::from(27))])
            .unwrap()
            .returning_all()
            .unwrap();

        let rendered = q.render();
        assert_eq!(
            rendered.sql,
            r#"INSERT INTO "public"."users" ("name","age") VALUES (?, ?) RETURNING *"#
        );
        assert_eq!(rendered.params, vec![Value::from("Ryan"), Value::Int(27)]);
        assert!(q.returns_rows());
    }

    #[test]
    fn test_delete_scenario() {
        let q = users().delete().filter([("id", 5)]).unwrap();
        let rendered = q.render();
        assert_eq!(rendered.sql, r#"DELETE FROM "public"."users" WHERE "id" = ?"#);
        assert_eq!(rendered.params, vec![Value::Int(5)]);
        assert!(!q.returns_rows());
    }

    #[test]
    fn test_where_scenario() {
        let q = users().select().filter([("age__gt", 18)]).unwrap();
        let cond = q.clause(ClauseKind::Where).unwrap();
        assert_eq!(cond.to_sql(), r#"WHERE "age" > ?"#);
        assert_eq!(cond.params(), vec![Value::Int(18)]);
    }

    #[test]
    fn test_where_conjoins() {
        let t = users();
        let q = t
            .select()
            .where_(t.column("age").unwrap().gt(18))
            .unwrap()
            .where_(t.column("name").unwrap().like("R%"))
            .unwrap();
        assert_eq!(
            q.to_sql(),
            r#"SELECT * FROM "public"."users" WHERE "age" > ? AND "name" LIKE ?"#
        );
    }

    #[test]
    fn test_aliased_table() {
        let u = users().alias("u");
        let q = u.select().filter([("age__lt", 30)]).unwrap();
        assert_eq!(
            q.to_sql(),
            r#"SELECT * FROM "public"."users" AS "u" WHERE "u"."age" < ?"#
        );
    }

    #[test]
    fn test_unsupported_operations() {
        let t = users();
        let err = t.delete().set([("name", "x")]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedOperation);
        assert_eq!(err.to_string(), "set is not supported on DELETE statements");

        assert!(t.insert().where_(t.column("id").unwrap().eq(1)).is_err());
        assert!(t.select().returning_all().is_err());
        assert!(t.update().limit(1).is_err());
        assert!(t.insert().order_by_keys(["age"]).is_err());
    }

    #[test]
    fn test_incomplete_statements() {
        let t = users();
        assert_eq!(
            t.insert().validate().unwrap_err().code(),
            ErrorCode::TypeMismatch
        );
        assert_eq!(
            t.update().validate().unwrap_err().code(),
            ErrorCode::TypeMismatch
        );
        assert!(t.select().validate().is_ok());
        assert!(t.delete().validate().is_ok());
    }

    #[test]
    fn test_empty_values_rejected() {
        let err = users()
            .insert()
            .values(Vec::<(&str, i64)>::new())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_numbered_placeholders() {
        let q = users()
            .update()
            .set([("name", Value::from("Kroon")), ("age", Value::from(28))])
            .unwrap()
            .filter([("id", 5)])
            .unwrap();
        assert_eq!(
            q.render_with(PlaceholderStyle::Numbered).sql,
            r#"UPDATE "public"."users" SET "name" = $1, "age" = $2 WHERE "id" = $3"#
        );
    }

    #[test]
    fn test_receiver_unchanged() {
        let base = users().select();
        let before = base.render();
        let _ = base.filter([("age__gt", 1)]).unwrap();
        let _ = base.limit(5).unwrap();
        assert_eq!(base.render(), before);
    }

    fn lookup_strategy() -> impl Strategy<Value = (String, i64)> {
        (
            prop::sample::select(vec!["id", "age", "name"]),
            prop::sample::select(vec!["", "__eq", "__ne", "__lt", "__le", "__gt", "__ge"]),
            any::<i64>(),
        )
            .prop_map(|(column, suffix, value)| (format!("{column}{suffix}"), value))
    }

    proptest! {
        #[test]
        fn prop_placeholders_match_params(
            lookups in prop::collection::vec(lookup_strategy(), 0..6),
            limit in prop::option::of(0u64..1000),
            offset in prop::option::of(0u64..1000),
        ) {
            let mut q = users().select().filter(lookups.clone()).unwrap();
            if let Some(limit) = limit {
                q = q.limit(limit).unwrap();
            }
            if let Some(offset) = offset {
                q = q.offset(offset).unwrap();
            }

            let rendered = q.render();
            prop_assert_eq!(placeholders(&rendered.sql), rendered.params.len());

            let mut expected: Vec<Value> = lookups.iter().map(|(_, v)| Value::Int(*v)).collect();
            expected.extend(limit.map(|l| Value::Int(l as i64)));
            expected.extend(offset.map(|o| Value::Int(o as i64)));
            prop_assert_eq!(rendered.params, expected);
        }

        #[test]
        fn prop_mutators_are_pure(lookups in prop::collection::vec(lookup_strategy(), 1..4)) {
            let base = users().update().set([("name", "x")]).unwrap();
            let before = base.render();
            let a = base.filter(lookups.clone()).unwrap();
            let b = base.filter(lookups).unwrap();
            prop_assert_eq!(a.render(), b.render());
            prop_assert_eq!(base.render(), before);
        }
    }
}

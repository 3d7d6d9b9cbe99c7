//! Statement clauses.
//!
//! A [`Clause`] is one keyword section of a statement. Each kind accepts a
//! single element type and an arity range; both are checked when the
//! clause is built, so a rendered statement is always well formed.

use std::fmt;

use tandem_common::error::{TandemError, TandemResult};

use crate::column::Column;
use crate::expr::{Assignment, Condition, Expression, Ordering};
use crate::table::Table;
use crate::value::Value;
use crate::writer::{SqlWriter, ToSql};

/// Clause kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ClauseKind {
    /// `SELECT <exprs>`
    Select,
    /// `INSERT INTO <table>`
    InsertInto,
    /// `UPDATE <table>`
    Update,
    /// `DELETE`
    Delete,
    /// `FROM <table>`
    From,
    /// `(<col>,<col>)`
    Columns,
    /// `VALUES (<p>, <p>)`
    Values,
    /// `SET <assignments>`
    Set,
    /// `WHERE <condition>`
    Where,
    /// `ORDER BY <orderings>`
    OrderBy,
    /// `LIMIT <p>`
    Limit,
    /// `OFFSET <p>`
    Offset,
    /// `RETURNING <exprs>`
    Returning,
}

impl ClauseKind {
    /// Returns the clause keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            ClauseKind::Select => "SELECT",
            ClauseKind::InsertInto => "INSERT INTO",
            ClauseKind::Update => "UPDATE",
            ClauseKind::Delete => "DELETE",
            ClauseKind::From => "FROM",
            ClauseKind::Columns => "COLUMNS",
            ClauseKind::Values => "VALUES",
            ClauseKind::Set => "SET",
            ClauseKind::Where => "WHERE",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Limit => "LIMIT",
            ClauseKind::Offset => "OFFSET",
            ClauseKind::Returning => "RETURNING",
        }
    }

    fn element(self) -> ElementKind {
        match self {
            ClauseKind::Select | ClauseKind::Returning => ElementKind::Expression,
            ClauseKind::InsertInto | ClauseKind::Update | ClauseKind::From => ElementKind::Table,
            ClauseKind::Delete => ElementKind::Nothing,
            ClauseKind::Columns => ElementKind::Column,
            ClauseKind::Values => ElementKind::Value,
            ClauseKind::Set => ElementKind::Assignment,
            ClauseKind::Where => ElementKind::Condition,
            ClauseKind::OrderBy => ElementKind::Ordering,
            ClauseKind::Limit | ClauseKind::Offset => ElementKind::Count,
        }
    }

    /// Returns the inclusive arity range; `None` means unbounded.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            ClauseKind::Select | ClauseKind::Returning => (0, None),
            ClauseKind::Delete => (0, Some(0)),
            ClauseKind::InsertInto
            | ClauseKind::Update
            | ClauseKind::From
            | ClauseKind::Where
            | ClauseKind::Limit
            | ClauseKind::Offset => (1, Some(1)),
            ClauseKind::Columns | ClauseKind::Values | ClauseKind::Set | ClauseKind::OrderBy => {
                (1, None)
            }
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Nothing,
    Expression,
    Table,
    Column,
    Value,
    Assignment,
    Condition,
    Ordering,
    Count,
}

/// One element handed to [`Clause::new`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseItem {
    /// Any expression.
    Expression(Expression),
    /// A table reference.
    Table(Table),
    /// A column reference.
    Column(Column),
    /// A bound value.
    Value(Value),
    /// A SET assignment.
    Assignment(Assignment),
    /// A WHERE condition.
    Condition(Condition),
    /// An ORDER BY term.
    Ordering(Ordering),
    /// A LIMIT or OFFSET count.
    Count(u64),
}

impl ClauseItem {
    /// Returns the element type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ClauseItem::Expression(_) => "Expression",
            ClauseItem::Table(_) => "Table",
            ClauseItem::Column(_) => "Column",
            ClauseItem::Value(_) => "Value",
            ClauseItem::Assignment(_) => "Assignment",
            ClauseItem::Condition(_) => "Condition",
            ClauseItem::Ordering(_) => "Ordering",
            ClauseItem::Count(_) => "Count",
        }
    }

    fn fits(&self, element: ElementKind) -> bool {
        matches!(
            (self, element),
            (ClauseItem::Expression(_) | ClauseItem::Column(_), ElementKind::Expression)
                | (ClauseItem::Table(_), ElementKind::Table)
                | (ClauseItem::Column(_), ElementKind::Column)
                | (ClauseItem::Value(_), ElementKind::Value)
                | (ClauseItem::Assignment(_), ElementKind::Assignment)
                | (ClauseItem::Condition(_), ElementKind::Condition)
                | (ClauseItem::Ordering(_), ElementKind::Ordering)
                | (ClauseItem::Count(_), ElementKind::Count)
        )
    }
}

macro_rules! clause_item_from {
    ($($variant:ident($t:ty)),* $(,)?) => {
        $(
            impl From<$t> for ClauseItem {
                fn from(v: $t) -> Self {
                    ClauseItem::$variant(v)
                }
            }
        )*
    };
}

clause_item_from!(
    Expression(Expression),
    Table(Table),
    Column(Column),
    Value(Value),
    Assignment(Assignment),
    Condition(Condition),
    Ordering(Ordering),
    Count(u64),
);

/// A validated keyword section.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    kind: ClauseKind,
    items: Vec<ClauseItem>,
}

impl Clause {
    /// Builds a clause, checking element type and arity.
    ///
    /// Counts must fit in a signed 64-bit integer; COLUMNS entries are
    /// stored unqualified.
    pub fn new(kind: ClauseKind, items: Vec<ClauseItem>) -> TandemResult<Self> {
        let element = kind.element();
        if let Some(bad) = items.iter().find(|item| !item.fits(element)) {
            return Err(TandemError::type_mismatch(
                format!("{element:?} in {kind}"),
                bad.type_name(),
            ));
        }

        let (min, max) = kind.arity();
        let count = items.len();
        if count < min || max.is_some_and(|max| count > max) {
            let expected = match max {
                Some(max) if max == min => format!("{min} item(s) in {kind}"),
                Some(max) => format!("{min}..={max} items in {kind}"),
                None => format!("at least {min} item(s) in {kind}"),
            };
            return Err(TandemError::type_mismatch(expected, format!("{count} items")));
        }

        let items = items
            .into_iter()
            .map(|item| match item {
                ClauseItem::Count(n) => i64::try_from(n)
                    .map(|_| ClauseItem::Count(n))
                    .map_err(|_| TandemError::type_mismatch("count within i64", n.to_string())),
                ClauseItem::Column(c) if kind == ClauseKind::Columns => {
                    Ok(ClauseItem::Column(c.unqualified()))
                }
                other => Ok(other),
            })
            .collect::<TandemResult<Vec<_>>>()?;

        Ok(Self { kind, items })
    }

    /// Builds a clause whose items are known to fit.
    pub(crate) fn from_parts(kind: ClauseKind, items: Vec<ClauseItem>) -> Self {
        debug_assert!(items.iter().all(|item| item.fits(kind.element())));
        Self { kind, items }
    }

    /// Returns the clause kind.
    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    /// Returns the clause items.
    pub fn items(&self) -> &[ClauseItem] {
        &self.items
    }

    /// Returns the WHERE condition, if this is a WHERE clause.
    pub(crate) fn condition(&self) -> Option<&Condition> {
        match self.items.first() {
            Some(ClauseItem::Condition(c)) => Some(c),
            _ => None,
        }
    }

    fn write_items(&self, w: &mut SqlWriter, delimiter: &str) {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                w.push_sql(delimiter);
            }
            item.write_sql(w);
        }
    }
}

impl ToSql for ClauseItem {
    fn write_sql(&self, w: &mut SqlWriter) {
        match self {
            ClauseItem::Expression(e) => e.write_sql(w),
            ClauseItem::Table(t) => t.write_sql(w),
            ClauseItem::Column(c) => c.write_sql(w),
            ClauseItem::Value(v) => w.bind(v),
            ClauseItem::Assignment(a) => a.write_sql(w),
            ClauseItem::Condition(c) => c.write_sql(w),
            ClauseItem::Ordering(o) => o.write_sql(w),
            // Counts are checked against i64 in `Clause::new`.
            ClauseItem::Count(n) => w.bind(&Value::Int(*n as i64)),
        }
    }
}

impl ToSql for Clause {
    fn write_sql(&self, w: &mut SqlWriter) {
        match self.kind {
            ClauseKind::Delete => w.push_sql("DELETE"),
            ClauseKind::Columns => {
                w.push_sql("(");
                self.write_items(w, ",");
                w.push_sql(")");
            }
            ClauseKind::Values => {
                w.push_sql("VALUES (");
                self.write_items(w, ", ");
                w.push_sql(")");
            }
            ClauseKind::Select | ClauseKind::Returning if self.items.is_empty() => {
                w.push_sql(self.kind.keyword());
                w.push_sql(" *");
            }
            kind => {
                w.push_sql(kind.keyword());
                w.push_sql(" ");
                self.write_items(w, ", ");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_common::ErrorCode;

    fn users() -> Table {
        Table::new("public", "users", ["id", "name", "age"], "id").unwrap()
    }

    #[test]
    fn test_select_defaults_to_wildcard() {
        let clause = Clause::new(ClauseKind::Select, vec![]).unwrap();
        assert_eq!(clause.to_sql(), "SELECT *");

        let t = users();
        let clause = Clause::new(
            ClauseKind::Select,
            vec![
                t.column("id").unwrap().into(),
                Expression::raw("COUNT(*)").into(),
            ],
        )
        .unwrap();
        assert_eq!(clause.to_sql(), r#"SELECT "id", COUNT(*)"#);
    }

    #[test]
    fn test_columns_and_values() {
        let t = users().alias("u");
        let columns = Clause::new(
            ClauseKind::Columns,
            vec![
                t.column("name").unwrap().into(),
                t.column("age").unwrap().into(),
            ],
        )
        .unwrap();
        assert_eq!(columns.to_sql(), r#"("name","age")"#);

        let values = Clause::new(
            ClauseKind::Values,
            vec![Value::from("Ryan").into(), Value::from(27).into()],
        )
        .unwrap();
        let rendered = values.render();
        assert_eq!(rendered.sql, "VALUES (?, ?)");
        assert_eq!(rendered.params, vec![Value::from("Ryan"), Value::Int(27)]);
    }

    #[test]
    fn test_where_rejects_non_condition() {
        let t = users();
        let err = Clause::new(
            ClauseKind::Where,
            vec![t.column("age").unwrap().assign(3).into()],
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
        assert!(err.to_string().contains("Assignment"));
    }

    #[test]
    fn test_arity_checks() {
        let err = Clause::new(ClauseKind::Set, vec![]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);

        let err = Clause::new(ClauseKind::Limit, vec![1u64.into(), 2u64.into()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);

        let err = Clause::new(ClauseKind::From, vec![]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_limit_binds_parameter() {
        let clause = Clause::new(ClauseKind::Limit, vec![10u64.into()]).unwrap();
        assert_eq!(clause.to_sql(), "LIMIT ?");
        assert_eq!(clause.params(), vec![Value::Int(10)]);

        let err = Clause::new(ClauseKind::Offset, vec![u64::MAX.into()]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_delete_keyword_only() {
        let clause = Clause::new(ClauseKind::Delete, vec![]).unwrap();
        assert_eq!(clause.to_sql(), "DELETE");
    }
}

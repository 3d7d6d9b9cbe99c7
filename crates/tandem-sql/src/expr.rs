//! Expression AST.
//!
//! An [`Expression`] is an ordered list of tokens rendered with single
//! spaces between them. [`Condition`], [`Assignment`] and [`Ordering`] are
//! typed wrappers so each clause can insist on the kind it accepts.

use crate::column::Column;
use crate::value::Value;
use crate::writer::{SqlWriter, ToSql};

/// A single renderable token.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Trusted SQL text.
    Keyword(&'static str),
    /// A column reference.
    Column(Column),
    /// A bound parameter.
    Value(Value),
    /// `(?, ?, ...)` list of bound parameters.
    Group(Vec<Value>),
    /// A nested expression, optionally parenthesised.
    Nested(Box<Expression>, bool),
}

impl ToSql for Token {
    fn write_sql(&self, w: &mut SqlWriter) {
        match self {
            Token::Keyword(sql) => w.push_sql(sql),
            Token::Column(column) => column.write_sql(w),
            Token::Value(value) => w.bind(value),
            Token::Group(values) => {
                w.push_sql("(");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        w.push_sql(", ");
                    }
                    w.bind(value);
                }
                w.push_sql(")");
            }
            Token::Nested(expr, parenthesised) => {
                if *parenthesised {
                    w.push_sql("(");
                }
                expr.write_sql(w);
                if *parenthesised {
                    w.push_sql(")");
                }
            }
        }
    }
}

/// An ordered sequence of SQL tokens.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    tokens: Vec<Token>,
}

impl Expression {
    /// The `*` wildcard.
    pub fn wildcard() -> Self {
        Self::raw("*")
    }

    /// Trusted, static SQL text such as `COUNT(*)` or `now()`.
    ///
    /// Only `'static` text is accepted so runtime input cannot reach the
    /// SQL string through this constructor.
    pub fn raw(sql: &'static str) -> Self {
        Self {
            tokens: vec![Token::Keyword(sql)],
        }
    }

    /// A bare column reference.
    pub fn column(column: Column) -> Self {
        Self {
            tokens: vec![Token::Column(column)],
        }
    }

    /// A bound value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            tokens: vec![Token::Value(value.into())],
        }
    }

    /// Returns the number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the expression has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn keyword(mut self, sql: &'static str) -> Self {
        self.tokens.push(Token::Keyword(sql));
        self
    }

    fn with_column(mut self, column: Column) -> Self {
        self.tokens.push(Token::Column(column));
        self
    }

    fn with_value(mut self, value: Value) -> Self {
        self.tokens.push(Token::Value(value));
        self
    }

    fn with_group(mut self, values: Vec<Value>) -> Self {
        self.tokens.push(Token::Group(values));
        self
    }

    fn nested(mut self, expr: Expression, parenthesised: bool) -> Self {
        self.tokens.push(Token::Nested(Box::new(expr), parenthesised));
        self
    }
}

impl ToSql for Expression {
    fn write_sql(&self, w: &mut SqlWriter) {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                w.push_sql(" ");
            }
            token.write_sql(w);
        }
    }
}

impl From<Column> for Expression {
    fn from(column: Column) -> Self {
        Expression::column(column)
    }
}

impl From<&Column> for Expression {
    fn from(column: &Column) -> Self {
        Expression::column(column.clone())
    }
}

/// Comparison operators produced by [`Column`] methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
}

impl CompareOp {
    /// Returns the SQL operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    Atom,
    And,
    Or,
    Not,
}

/// A boolean-valued expression usable in WHERE.
///
/// Combinators take their operands by value and return a new condition.
/// Operands that are themselves AND/OR trees of the other connective are
/// parenthesised, so the rendered precedence always matches the tree.
///
/// ```rust
/// use tandem_sql::{Table, ToSql};
///
/// let users = Table::new("public", "users", ["id", "name", "age"], "id").unwrap();
/// let adult = users.column("age").unwrap().ge(18);
/// let named = users.column("name").unwrap().like("R%");
///
/// let cond = adult.and(named);
/// assert_eq!(cond.to_sql(), r#""age" >= ? AND "name" LIKE ?"#);
/// assert_eq!(cond.params().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    expr: Expression,
    connective: Connective,
}

impl Condition {
    fn atom(expr: Expression) -> Self {
        Self {
            expr,
            connective: Connective::Atom,
        }
    }

    pub(crate) fn compare(column: Column, op: CompareOp, value: Value) -> Self {
        Self::atom(
            Expression::default()
                .with_column(column)
                .keyword(op.as_sql())
                .with_value(value),
        )
    }

    pub(crate) fn between(column: Column, low: Value, high: Value) -> Self {
        Self::atom(
            Expression::default()
                .with_column(column)
                .keyword("BETWEEN")
                .with_value(low)
                .keyword("AND")
                .with_value(high),
        )
    }

    pub(crate) fn in_list(column: Column, values: Vec<Value>) -> Self {
        Self::atom(
            Expression::default()
                .with_column(column)
                .keyword("IN")
                .with_group(values),
        )
    }

    pub(crate) fn null_check(column: Column, negated: bool) -> Self {
        let check = if negated { "IS NOT NULL" } else { "IS NULL" };
        Self::atom(Expression::default().with_column(column).keyword(check))
    }

    fn needs_parens(&self, parent: Connective) -> bool {
        match self.connective {
            Connective::Atom | Connective::Not => false,
            own => own != parent || parent == Connective::Not,
        }
    }

    fn combine(self, keyword: &'static str, connective: Connective, other: Condition) -> Self {
        let left_parens = self.needs_parens(connective);
        let right_parens = other.needs_parens(connective);
        Self {
            expr: Expression::default()
                .nested(self.expr, left_parens)
                .keyword(keyword)
                .nested(other.expr, right_parens),
            connective,
        }
    }

    /// `self AND other`.
    pub fn and(self, other: Condition) -> Self {
        self.combine("AND", Connective::And, other)
    }

    /// `self OR other`.
    pub fn or(self, other: Condition) -> Self {
        self.combine("OR", Connective::Or, other)
    }

    /// `NOT self`.
    pub fn not(self) -> Self {
        let parens = self.needs_parens(Connective::Not);
        Self {
            expr: Expression::default().keyword("NOT").nested(self.expr, parens),
            connective: Connective::Not,
        }
    }

    /// Folds conditions with AND, left to right. Returns `None` when empty.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Option<Self> {
        conditions.into_iter().reduce(Condition::and)
    }

    /// Folds conditions with OR, left to right. Returns `None` when empty.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Option<Self> {
        conditions.into_iter().reduce(Condition::or)
    }
}

impl ToSql for Condition {
    fn write_sql(&self, w: &mut SqlWriter) {
        self.expr.write_sql(w);
    }
}

impl From<Condition> for Expression {
    fn from(condition: Condition) -> Self {
        condition.expr
    }
}

/// `"column" = ?` as used by SET.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    column: Column,
    value: Value,
}

impl Assignment {
    pub(crate) fn new(column: Column, value: Value) -> Self {
        // SET targets are never qualified.
        Self {
            column: column.unqualified(),
            value,
        }
    }

    /// Returns the assigned column.
    pub fn column(&self) -> &Column {
        &self.column
    }

    /// Returns the assigned value.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl ToSql for Assignment {
    fn write_sql(&self, w: &mut SqlWriter) {
        self.column.write_sql(w);
        w.push_sql(" = ");
        w.bind(&self.value);
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Placement of NULLs in a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    /// `NULLS FIRST`
    First,
    /// `NULLS LAST`
    Last,
}

/// `"column" ASC|DESC [NULLS FIRST|LAST]` as used by ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    column: Column,
    direction: Direction,
    nulls: Option<Nulls>,
}

impl Ordering {
    pub(crate) fn new(column: Column, direction: Direction) -> Self {
        Self {
            column,
            direction,
            nulls: None,
        }
    }

    /// Sorts NULLs before other values.
    pub fn nulls_first(self) -> Self {
        Self {
            nulls: Some(Nulls::First),
            ..self
        }
    }

    /// Sorts NULLs after other values.
    pub fn nulls_last(self) -> Self {
        Self {
            nulls: Some(Nulls::Last),
            ..self
        }
    }

    /// Returns the sort direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl ToSql for Ordering {
    fn write_sql(&self, w: &mut SqlWriter) {
        self.column.write_sql(w);
        w.push_sql(match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        match self.nulls {
            Some(Nulls::First) => w.push_sql(" NULLS FIRST"),
            Some(Nulls::Last) => w.push_sql(" NULLS LAST"),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Column {
        Column::new(name, None)
    }

    #[test]
    fn test_compare_renders_placeholder() {
        let cond = col("age").gt(18);
        let rendered = cond.render();
        assert_eq!(rendered.sql, r#""age" > ?"#);
        assert_eq!(rendered.params, vec![Value::Int(18)]);
    }

    #[test]
    fn test_and_keeps_operand_order() {
        let a = col("age").gt(18);
        let b = col("name").eq("Ryan");
        let combined = a.clone().and(b.clone());

        assert_eq!(
            combined.to_sql(),
            format!("{} AND {}", a.to_sql(), b.to_sql())
        );
        let mut expected = a.params();
        expected.extend(b.params());
        assert_eq!(combined.params(), expected);
    }

    #[test]
    fn test_mixed_connectives_are_parenthesised() {
        let either = col("a").eq(1).or(col("b").eq(2));
        let cond = either.and(col("c").eq(3));
        assert_eq!(cond.to_sql(), r#"("a" = ? OR "b" = ?) AND "c" = ?"#);
        assert_eq!(
            cond.params(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_same_connective_is_flat() {
        let cond = col("a")
            .eq(1)
            .and(col("b").eq(2))
            .and(col("c").eq(3));
        assert_eq!(cond.to_sql(), r#""a" = ? AND "b" = ? AND "c" = ?"#);
    }

    #[test]
    fn test_not() {
        assert_eq!(col("a").eq(1).not().to_sql(), r#"NOT "a" = ?"#);
        assert_eq!(
            col("a").eq(1).and(col("b").eq(2)).not().to_sql(),
            r#"NOT ("a" = ? AND "b" = ?)"#
        );
    }

    #[test]
    fn test_all_and_any() {
        assert!(Condition::all(Vec::new()).is_none());
        let any = Condition::any(vec![col("a").eq(1), col("a").eq(2)]).unwrap();
        assert_eq!(any.to_sql(), r#""a" = ? OR "a" = ?"#);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(col("age").desc().to_sql(), r#""age" DESC"#);
        assert_eq!(
            col("age").asc().nulls_last().to_sql(),
            r#""age" ASC NULLS LAST"#
        );
    }

    #[test]
    fn test_assignment_is_unqualified() {
        let column = Column::new("name", Some("u".into()));
        let assignment = column.assign("Kroon");
        assert_eq!(assignment.to_sql(), r#""name" = ?"#);
        assert_eq!(assignment.value(), &Value::from("Kroon"));
    }

    #[test]
    fn test_raw_expression() {
        assert_eq!(Expression::wildcard().to_sql(), "*");
        assert_eq!(Expression::raw("COUNT(*)").to_sql(), "COUNT(*)");
        assert!(Expression::default().is_empty());
    }
}

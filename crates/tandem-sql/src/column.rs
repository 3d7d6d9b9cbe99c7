//! Column references.

use std::fmt;
use std::sync::Arc;

use tandem_common::error::{TandemError, TandemResult};

use crate::expr::{Assignment, CompareOp, Condition, Direction, Ordering};
use crate::value::Value;
use crate::writer::{SqlWriter, ToSql};

/// A relational attribute of a [`Table`](crate::Table).
///
/// A column only carries its owning table's rendering qualifier (the alias,
/// when the table is aliased), never a reference to the table itself.
/// Every method is a factory; none of them mutates the column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: Arc<str>,
    qualifier: Option<Arc<str>>,
}

impl Column {
    pub(crate) fn new(name: impl Into<Arc<str>>, qualifier: Option<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            qualifier,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the qualifier used when rendering, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Returns the same column without a qualifier.
    pub fn unqualified(self) -> Self {
        Self {
            qualifier: None,
            ..self
        }
    }

    // =========================================================================
    // Comparisons
    // =========================================================================

    /// `column = value`
    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Eq, value.into())
    }

    /// `column != value`
    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Ne, value.into())
    }

    /// `column < value`
    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Lt, value.into())
    }

    /// `column <= value`
    pub fn le(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Le, value.into())
    }

    /// `column > value`
    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Gt, value.into())
    }

    /// `column >= value`
    pub fn ge(&self, value: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Ge, value.into())
    }

    /// `column LIKE pattern`
    pub fn like(&self, pattern: impl Into<Value>) -> Condition {
        Condition::compare(self.clone(), CompareOp::Like, pattern.into())
    }

    /// `column IN (?, ?, ...)`.
    ///
    /// Fails with `TypeMismatch` for an empty list, which has no valid SQL
    /// rendering.
    pub fn in_<I, V>(&self, values: I) -> TandemResult<Condition>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(TandemError::type_mismatch(
                "non-empty sequence",
                "empty sequence",
            ));
        }
        Ok(Condition::in_list(self.clone(), values))
    }

    /// `column BETWEEN low AND high`
    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
        Condition::between(self.clone(), low.into(), high.into())
    }

    /// `column IS NULL`
    pub fn is_null(&self) -> Condition {
        Condition::null_check(self.clone(), false)
    }

    /// `column IS NOT NULL`
    pub fn is_not_null(&self) -> Condition {
        Condition::null_check(self.clone(), true)
    }

    // =========================================================================
    // Ordering and assignment
    // =========================================================================

    /// `column ASC`
    pub fn asc(&self) -> Ordering {
        Ordering::new(self.clone(), Direction::Asc)
    }

    /// `column DESC`
    pub fn desc(&self) -> Ordering {
        Ordering::new(self.clone(), Direction::Desc)
    }

    /// `column = value` for SET.
    pub fn assign(&self, value: impl Into<Value>) -> Assignment {
        Assignment::new(self.clone(), value.into())
    }

    /// Resolves a lookup suffix (`eq`, `gt`, `in`, ...) to a condition.
    ///
    /// `in` expects a sequence, `between` a sequence of exactly two values,
    /// `is` and `isnot` a null.
    pub fn lookup(&self, op: &str, value: Value) -> TandemResult<Condition> {
        match op {
            "eq" => Ok(self.eq(value)),
            "ne" => Ok(self.ne(value)),
            "lt" => Ok(self.lt(value)),
            "le" => Ok(self.le(value)),
            "gt" => Ok(self.gt(value)),
            "ge" => Ok(self.ge(value)),
            "like" => Ok(self.like(value)),
            "in" => match value {
                Value::Sequence(values) => self.in_(values),
                other => Err(TandemError::type_mismatch("Sequence", other.type_name())),
            },
            "between" => match value {
                Value::Sequence(values) => match <[Value; 2]>::try_from(values) {
                    Ok([low, high]) => Ok(self.between(low, high)),
                    Err(values) => Err(TandemError::type_mismatch(
                        "Sequence of 2 values",
                        format!("Sequence of {} values", values.len()),
                    )),
                },
                other => Err(TandemError::type_mismatch("Sequence", other.type_name())),
            },
            "is" | "isnot" => {
                if !value.is_null() {
                    return Err(TandemError::type_mismatch("Null", value.type_name()));
                }
                Ok(if op == "is" {
                    self.is_null()
                } else {
                    self.is_not_null()
                })
            }
            _ => Err(TandemError::UnknownLookup {
                key: format!("{}__{}", self.name, op),
            }),
        }
    }
}

impl ToSql for Column {
    fn write_sql(&self, w: &mut SqlWriter) {
        if let Some(qualifier) = &self.qualifier {
            w.push_ident(qualifier);
            w.push_sql(".");
        }
        w.push_ident(&self.name);
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

//! SQL text writer.
//!
//! Every fragment renders through a [`SqlWriter`]. Binding a value writes
//! its placeholder and records the parameter in the same call, so the
//! parameter list always lines up with the placeholders in the text.

use crate::value::{PlaceholderStyle, Value};

/// Rendered SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    /// SQL text containing only placeholders, never literals.
    pub sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

impl Rendered {
    /// Returns the number of parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// Accumulates SQL text and parameters.
#[derive(Debug)]
pub struct SqlWriter {
    sql: String,
    params: Vec<Value>,
    style: PlaceholderStyle,
}

impl SqlWriter {
    /// Creates a writer for the given placeholder dialect.
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            style,
        }
    }

    /// Appends trusted SQL text (keywords and punctuation).
    pub(crate) fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends a double-quoted identifier, doubling embedded quotes.
    pub(crate) fn push_ident(&mut self, ident: &str) {
        self.sql.push('"');
        for ch in ident.chars() {
            if ch == '"' {
                self.sql.push('"');
            }
            self.sql.push(ch);
        }
        self.sql.push('"');
    }

    /// Writes a placeholder and records `value` as its parameter.
    pub(crate) fn bind(&mut self, value: &Value) {
        self.params.push(value.clone());
        let token = self.style.token(self.params.len());
        self.sql.push_str(&token);
    }

    /// Finishes writing.
    pub fn finish(self) -> Rendered {
        Rendered {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Anything that can be written as a SQL fragment.
pub trait ToSql {
    /// Writes the fragment.
    fn write_sql(&self, w: &mut SqlWriter);

    /// Renders the fragment with the given placeholder dialect.
    fn render_with(&self, style: PlaceholderStyle) -> Rendered {
        let mut w = SqlWriter::new(style);
        self.write_sql(&mut w);
        w.finish()
    }

    /// Renders the fragment with `?` placeholders.
    fn render(&self) -> Rendered {
        self.render_with(PlaceholderStyle::Question)
    }

    /// Returns the SQL text with `?` placeholders.
    fn to_sql(&self) -> String {
        self.render().sql
    }

    /// Returns the parameters in textual order.
    fn params(&self) -> Vec<Value> {
        self.render().params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_numbers_placeholders() {
        let mut w = SqlWriter::new(PlaceholderStyle::Numbered);
        w.push_sql("a = ");
        w.bind(&Value::Int(1));
        w.push_sql(" AND b = ");
        w.bind(&Value::from("x"));
        let rendered = w.finish();

        assert_eq!(rendered.sql, "a = $1 AND b = $2");
        assert_eq!(rendered.params, vec![Value::Int(1), Value::from("x")]);
    }

    #[test]
    fn test_ident_quoting() {
        let mut w = SqlWriter::new(PlaceholderStyle::Question);
        w.push_ident(r#"we"ird"#);
        assert_eq!(w.finish().sql, r#""we""ird""#);
    }

    #[test]
    fn test_literal_never_inlined() {
        let mut w = SqlWriter::new(PlaceholderStyle::Format);
        w.bind(&Value::from("'; DROP TABLE users; --"));
        let rendered = w.finish();
        assert_eq!(rendered.sql, "%s");
        assert_eq!(rendered.param_count(), 1);
    }
}

//! Bindable SQL values.
//!
//! A [`Value`] never appears in SQL text. When a statement is rendered the
//! writer emits the driver's placeholder token and pushes the value onto
//! the out-of-band parameter list in the same step.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tandem_common::{TandemError, TandemResult};

/// Value types that can be bound as statement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Arbitrary-precision decimal.
    Decimal(#[serde(with = "rust_decimal::serde::str")] Decimal),
    /// String value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Timestamp without time zone. Zoned timestamps are stored in UTC.
    DateTime(NaiveDateTime),
    /// Ordered sequence (arrays, IN lists).
    Sequence(Vec<Value>),
    /// String-keyed mapping (json/hstore style columns).
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Returns true if the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Tries to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Tries to get as integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Tries to get as float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Tries to get as decimal.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }

    /// Tries to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Tries to get as timestamp.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Tries to get as sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Tries to get as mapping.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the variant name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Parameter placeholder dialect of the target driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderStyle {
    /// `?` (sqlite, mysql, odbc).
    #[default]
    Question,
    /// `%s` (psycopg-style format parameters).
    Format,
    /// `$1`, `$2`, ... (postgres wire protocol).
    Numbered,
}

impl PlaceholderStyle {
    /// Returns the placeholder for the parameter at 1-based `position`.
    pub fn token(self, position: usize) -> Cow<'static, str> {
        match self {
            PlaceholderStyle::Question => Cow::Borrowed("?"),
            PlaceholderStyle::Format => Cow::Borrowed("%s"),
            PlaceholderStyle::Numbered => Cow::Owned(format!("${}", position)),
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(v: DateTime<Tz>) -> Self {
        Value::DateTime(v.naive_utc())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(v: BTreeMap<String, T>) -> Self {
        Value::Mapping(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(v: HashMap<String, T>) -> Self {
        Value::Mapping(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

fn out_of_range(actual: impl fmt::Display) -> TandemError {
    TandemError::type_mismatch("integer within i64 range", actual.to_string())
}

impl TryFrom<u64> for Value {
    type Error = TandemError;

    fn try_from(v: u64) -> TandemResult<Self> {
        i64::try_from(v).map(Value::Int).map_err(|_| out_of_range(v))
    }
}

impl TryFrom<usize> for Value {
    type Error = TandemError;

    fn try_from(v: usize) -> TandemResult<Self> {
        i64::try_from(v).map(Value::Int).map_err(|_| out_of_range(v))
    }
}

impl TryFrom<i128> for Value {
    type Error = TandemError;

    fn try_from(v: i128) -> TandemResult<Self> {
        i64::try_from(v).map(Value::Int).map_err(|_| out_of_range(v))
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = TandemError;

    fn try_from(v: serde_json::Value) -> TandemResult<Self> {
        use serde_json::Value as Json;

        Ok(match v {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    return Value::try_from(u);
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    return Err(TandemError::type_mismatch("number", n.to_string()));
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<TandemResult<_>>()?,
            ),
            Json::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(k, v)| Value::try_from(v).map(|v| (k, v)))
                    .collect::<TandemResult<_>>()?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_types() {
        assert_eq!(Value::from(42i32), Value::Int(42));
        assert_eq!(Value::from(7u8), Value::Int(7));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("Ryan"), Value::String("Ryan".to_string()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(27)), Value::Int(27));
        assert_eq!(
            Value::from(vec![1, 2]),
            Value::Sequence(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn test_datetime_is_stored_in_utc() {
        let zoned = chrono::FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .unwrap();
        let naive = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        assert_eq!(Value::from(zoned), Value::DateTime(naive));
    }

    #[test]
    fn test_out_of_range_integers_rejected() {
        assert!(Value::try_from(u64::MAX).is_err());
        assert_eq!(Value::try_from(5u64).unwrap(), Value::Int(5));
        assert!(Value::try_from(i128::MIN).is_err());

        let err = Value::try_from(serde_json::json!(u64::MAX)).unwrap_err();
        assert_eq!(err.code(), tandem_common::ErrorCode::TypeMismatch);
    }

    #[test]
    fn test_from_json() {
        let value = Value::try_from(serde_json::json!({
            "name": "Leo",
            "tags": ["dog", 3],
            "weight": 12.5,
        }))
        .unwrap();

        let map = value.as_mapping().unwrap();
        assert_eq!(map["name"], Value::from("Leo"));
        assert_eq!(
            map["tags"],
            Value::Sequence(vec![Value::from("dog"), Value::Int(3)])
        );
        assert_eq!(map["weight"], Value::Float(12.5));
    }

    #[test]
    fn test_value_accessors() {
        let int_val = Value::Int(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));
        assert_eq!(int_val.as_decimal(), Some(Decimal::from(42)));
        assert!(int_val.as_str().is_none());
        assert_eq!(int_val.type_name(), "int");
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_placeholder_tokens() {
        assert_eq!(PlaceholderStyle::Question.token(3), "?");
        assert_eq!(PlaceholderStyle::Format.token(1), "%s");
        assert_eq!(PlaceholderStyle::Numbered.token(2), "$2");
    }

    #[test]
    fn test_decimal_survives_binary_encoding() {
        let value = Value::Decimal("12.3400".parse().unwrap());
        let bytes = bincode::serialize(&value).unwrap();
        let back: Value = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, value);
    }
}

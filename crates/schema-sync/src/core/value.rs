//! SQL values and result rows exchanged with drivers.
//!
//! Default values on property descriptors are [`SqlValue`]s, and every
//! introspection query returns [`Row`]s. Drivers that only speak text (the
//! PostgreSQL simple query protocol, for instance) return `Text` for every
//! column, so the typed accessors on [`Row`] coerce where they can.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// Any integer (stored widened to 64 bits).
    Int(i64),

    /// Any floating point value.
    Float(f64),

    /// Text value.
    Text(String),

    /// Binary data.
    #[serde(skip)]
    Bytes(Vec<u8>),

    /// UUID value.
    #[serde(skip)]
    Uuid(Uuid),

    /// Date without time component.
    #[serde(skip)]
    Date(NaiveDate),

    /// Timestamp without timezone.
    #[serde(skip)]
    DateTime(NaiveDateTime),

    /// Timestamp with timezone offset.
    #[serde(skip)]
    DateTimeOffset(DateTime<FixedOffset>),
}

impl SqlValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret the value as an integer.
    ///
    /// Text is parsed; booleans map to 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            SqlValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a boolean.
    ///
    /// Accepts the spellings catalogs use: `t`/`f`, `YES`/`NO`, `1`/`0`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::Int(v) => Some(*v != 0),
            SqlValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "yes" | "y" | "1" => Some(true),
                "f" | "false" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Render the value as text, regardless of its variant.
    ///
    /// Returns `None` for NULL and binary data.
    pub fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Bytes(_) => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Int(v) => Some(v.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Uuid(u) => Some(u.to_string()),
            SqlValue::Date(d) => Some(d.to_string()),
            SqlValue::DateTime(dt) => Some(dt.to_string()),
            SqlValue::DateTimeOffset(dt) => Some(dt.to_rfc3339()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlValue::Null, Into::into)
    }
}

/// One row returned by a driver, with column names preserved in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Look up a column by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(col, _)| col.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Column value as text, or `None` when missing or NULL.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name).and_then(SqlValue::to_text)
    }

    /// Column value as an integer.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(SqlValue::as_i64)
    }

    /// Column value as a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(SqlValue::as_bool)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_is_case_insensitive() {
        let row = Row::new().with("Key_name", "email_unique").with("Non_unique", 0);
        assert_eq!(row.get_str("key_name").as_deref(), Some("email_unique"));
        assert_eq!(row.get_i64("NON_UNIQUE"), Some(0));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_text_coercions() {
        assert_eq!(SqlValue::from("42").as_i64(), Some(42));
        assert_eq!(SqlValue::from("t").as_bool(), Some(true));
        assert_eq!(SqlValue::from("NO").as_bool(), Some(false));
        assert_eq!(SqlValue::from("maybe").as_bool(), None);
        assert_eq!(SqlValue::Null.to_text(), None);
    }

    #[test]
    fn test_default_values_deserialize_untagged() {
        let v: SqlValue = serde_yaml::from_str("12").unwrap();
        assert_eq!(v, SqlValue::Int(12));
        let v: SqlValue = serde_yaml::from_str("true").unwrap();
        assert_eq!(v, SqlValue::Bool(true));
        let v: SqlValue = serde_yaml::from_str("'hello'").unwrap();
        assert_eq!(v, SqlValue::Text("hello".to_string()));
    }
}

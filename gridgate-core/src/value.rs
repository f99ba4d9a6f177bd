//! Cell values, rows and bound parameters.
//!
//! Wire values (JSON) are coerced into [`SqlValue`] before they reach the
//! compiler, the batch engine or a driver.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single database cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Coerce a JSON value into a cell.
    ///
    /// `null` and `""` become `Null`; arrays and objects are kept as their
    /// raw JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n
                    .as_f64()
                    .map(SqlValue::Float)
                    .unwrap_or_else(|| SqlValue::Text(n.to_string())),
            },
            Value::String(s) if s.is_empty() => SqlValue::Null,
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Integer(i) => Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bytes(b) => Value::String(hex::encode(b)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Primary-key form of the value: trimmed-blank and null have no key,
    /// everything else compares with ASCII letters upper-cased.
    pub fn key_text(&self) -> Option<String> {
        let text = match self {
            SqlValue::Null => return None,
            SqlValue::Text(s) => s.clone(),
            SqlValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            other => other.to_string(),
        };
        if text.trim().is_empty() {
            None
        } else {
            Some(text.to_ascii_uppercase())
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => Ok(()),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Float(x) => write!(f, "{}", x),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Bytes(b) => f.write_str(&hex::encode(b)),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// One result or input row, columns kept in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce every member of a JSON object.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        let cells = object
            .iter()
            .map(|(k, v)| (k.clone(), SqlValue::from_json(v)))
            .collect();
        Self { cells }
    }

    /// Set a column, replacing an existing cell with the same name.
    pub fn set(&mut self, column: &str, value: SqlValue) {
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Lookup falling back to a case-insensitive match.
    pub fn get_ignore_case(&self, column: &str) -> Option<&SqlValue> {
        self.get(column).or_else(|| {
            self.cells
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, v)| v)
        })
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn first(&self) -> Option<&SqlValue> {
        self.cells.first().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .cells
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<Map<String, Value>>();
        Value::Object(map)
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.set(&name, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Row::from_json_object(&object))
    }
}

/// A named parameter bound to a statement. The SQL text refers to it as
/// `@name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: SqlValue,
}

impl Param {
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn placeholder(&self) -> String {
        format!("@{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!("")), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!("abc")), SqlValue::Text("abc".into()));
        assert_eq!(SqlValue::from_json(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::from_json(&json!(42)), SqlValue::Integer(42));
        assert_eq!(SqlValue::from_json(&json!(1.5)), SqlValue::Float(1.5));
    }

    #[test]
    fn test_from_json_structured_kept_as_text() {
        let v = SqlValue::from_json(&json!({"title": "Home"}));
        assert_eq!(v, SqlValue::Text("{\"title\":\"Home\"}".into()));
        let v = SqlValue::from_json(&json!([1, 2]));
        assert_eq!(v, SqlValue::Text("[1,2]".into()));
    }

    #[test]
    fn test_key_text_normalizes() {
        assert_eq!(
            SqlValue::Text("ab-cd".into()).key_text(),
            Some("AB-CD".to_string())
        );
        assert_eq!(SqlValue::Integer(7).key_text(), Some("7".to_string()));
        // only ASCII folds, as UPPER() does in SQLite
        assert_eq!(
            SqlValue::Text("café-ß".into()).key_text(),
            Some("CAFé-ß".to_string())
        );
        assert_eq!(SqlValue::Text("  ".into()).key_text(), None);
        assert_eq!(SqlValue::Null.key_text(), None);
    }

    #[test]
    fn test_row_keeps_column_order() {
        let mut row = Row::new();
        row.set("zeta", SqlValue::Integer(1));
        row.set("alpha", SqlValue::Integer(2));
        row.set("zeta", SqlValue::Integer(3));
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, "{\"zeta\":3,\"alpha\":2}");
    }

    #[test]
    fn test_row_ignore_case_lookup() {
        let row: Row = vec![("Name".to_string(), SqlValue::from("x"))]
            .into_iter()
            .collect();
        assert!(row.get("name").is_none());
        assert_eq!(row.get_ignore_case("name"), Some(&SqlValue::from("x")));
    }

    #[test]
    fn test_deserialize_row_keeps_member_order() {
        let row: Row = serde_json::from_str(r#"{"zeta": 1, "alpha": "", "mid": [1]}"#).unwrap();
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(row.get("alpha"), Some(&SqlValue::Null));
        assert_eq!(row.get("mid"), Some(&SqlValue::Text("[1]".into())));
    }

    #[test]
    fn test_param_placeholder() {
        assert_eq!(Param::new("p0", "x").placeholder(), "@p0");
    }
}

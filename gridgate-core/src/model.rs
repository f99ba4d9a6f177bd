//! Request-scoped condition tree types.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GridError, GridResult};

/// How the clauses of one [`WhereNode`] level are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// Anything other than `or` (any case) means AND.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("or") {
            Logic::Or
        } else {
            Logic::And
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

impl<'de> Deserialize<'de> for Logic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| Logic::parse(&s)).unwrap_or_default())
    }
}

/// Leaf comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Contains,
    StartsWith,
    EndsWith,
}

impl Operator {
    /// Long names used by the structured tree: `eq`, `contains`,
    /// `startswith`, `endswith` (case-insensitive).
    pub fn from_name(op: &str) -> GridResult<Self> {
        match op.to_ascii_lowercase().as_str() {
            "eq" => Ok(Operator::Eq),
            "contains" => Ok(Operator::Contains),
            "startswith" => Ok(Operator::StartsWith),
            "endswith" => Ok(Operator::EndsWith),
            _ => Err(GridError::UnsupportedOperator(op.to_string())),
        }
    }

    /// Short names used by the filter expression: `eq`, `co`, `sw`, `ew`.
    pub fn from_short(op: &str) -> GridResult<Self> {
        match op.to_ascii_lowercase().as_str() {
            "eq" => Ok(Operator::Eq),
            "co" => Ok(Operator::Contains),
            "sw" => Ok(Operator::StartsWith),
            "ew" => Ok(Operator::EndsWith),
            _ => Err(GridError::UnsupportedOperator(format!(
                "{}, supported: eq, co, sw, ew",
                op
            ))),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            _ => "LIKE",
        }
    }

    /// `ESCAPE` clause that follows the placeholder of a pattern operator.
    pub fn escape_clause(&self) -> &'static str {
        match self {
            Operator::Eq => "",
            _ => " ESCAPE '\\'",
        }
    }

    /// Wildcards go into the bound value, never into the SQL text. `%`, `_`
    /// and `\` typed by the user match literally.
    pub fn bind_value(&self, value: &str) -> String {
        match self {
            Operator::Eq => value.to_string(),
            Operator::Contains => format!("%{}%", escape_like(value)),
            Operator::StartsWith => format!("{}%", escape_like(value)),
            Operator::EndsWith => format!("%{}", escape_like(value)),
        }
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Eq => "eq",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
        })
    }
}

/// A single field/operator/value predicate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub value: Option<String>,
}

fn default_operator() -> String {
    "eq".to_string()
}

/// Grid front ends send numbers and booleans as bare JSON scalars.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl Condition {
    pub fn new(field: &str, operator: &str, value: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Leaves without a field or a value are dropped, never compiled.
    pub fn is_active(&self) -> bool {
        !self.field.trim().is_empty() && self.value.is_some()
    }
}

/// A logic-connected group of conditions and nested groups.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct WhereNode {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<WhereNode>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Flat field → value filter, every entry a `contains` match.
pub type SimpleWhere = BTreeMap<String, String>;

impl WhereNode {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            conditions: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_group(mut self, group: WhereNode) -> Self {
        self.groups.push(group);
        self
    }

    /// AND of one `contains` per non-blank entry; `None` when nothing is left.
    pub fn from_simple(simple: &SimpleWhere) -> Option<Self> {
        let conditions: Vec<Condition> = simple
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, v)| Condition::new(k, "contains", Some(v)))
            .collect();

        if conditions.is_empty() {
            None
        } else {
            Some(Self {
                logic: Logic::And,
                conditions,
                groups: Vec::new(),
            })
        }
    }
}

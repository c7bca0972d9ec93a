//! Cell typing and column kind inference.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a column participates in the feature transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Min-max normalized.
    Numeric,
    /// One-hot expanded.
    Categorical,
}

/// Infer the kind of a column from its values.
///
/// A column is numeric when it has at least one value and every non-null
/// value is a JSON number. Anything else (strings, bools, mixed) is
/// categorical.
pub fn infer_column_kind<'a, I>(values: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut saw_number = false;
    for value in values {
        match value {
            Value::Null => {}
            Value::Number(_) => saw_number = true,
            _ => return ColumnKind::Categorical,
        }
    }
    if saw_number {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Parse a raw delimited-text cell into a typed value.
///
/// Integers and floats become numbers, `true`/`false` become booleans, an
/// empty cell becomes null and everything else stays a string.
pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim().trim_matches('"');
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match s {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

/// Render a categorical value as its vocabulary key. Nulls are not categories.
pub fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Read a numeric cell. Numeric strings are accepted so records coming from
/// delimited files or loosely typed requests replay the same way.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

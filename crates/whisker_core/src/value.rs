//! Dynamic values
//!
//! [`Value`] is what the store holds and what expressions produce. Conversions
//! and comparisons follow the loose rules page authors expect from inline
//! handlers: `"2" == 2`, empty strings are falsy, `"a" + 1` is `"a1"`.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::node::NodeId;
use crate::path::PathKey;

/// Ordered object fields.
pub type Object = IndexMap<String, Value>;

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(Object),
    /// Reference to a document element. Path traversal never descends into it.
    Node(NodeId),
}

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Node(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Node(_) => "node",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(id) => Some(*id),
            _ => None,
        }
    }

    /// Numeric conversion (`Number(x)`).
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.to_number(),
                _ => f64::NAN,
            },
            Value::Object(_) | Value::Node(_) => f64::NAN,
        }
    }

    /// String conversion (`String(x)`).
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_display_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Node(_) => "[object HTMLElement]".to_string(),
        }
    }

    /// Text spliced into the page for `{{ }}`: containers become JSON.
    pub fn to_interpolation(&self) -> String {
        match self {
            Value::Array(_) | Value::Object(_) | Value::Node(_) => {
                serde_json::to_string(self).unwrap_or_else(|_| self.to_display_string())
            }
            other => other.to_display_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Undefined | Null, Undefined | Null) => true,
            (Undefined | Null, _) | (_, Undefined | Null) => false,
            (String(a), String(b)) => a == b,
            (Bool(_) | Number(_) | String(_), Bool(_) | Number(_) | String(_)) => {
                self.to_number() == other.to_number()
            }
            (Array(_) | Object(_) | Node(_), Array(_) | Object(_) | Node(_)) => self == other,
            (Array(_) | Object(_), _) | (_, Array(_) | Object(_)) => {
                self.to_display_string() == other.to_display_string()
            }
            _ => false,
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self == other,
        }
    }

    /// Relational comparison: strings compare lexically, everything else numerically.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    /// Borrow a direct child of an array or object.
    pub fn get(&self, key: &PathKey) -> Option<&Value> {
        match (self, key) {
            (Value::Array(items), key) => key.as_index().and_then(|i| items.get(i)),
            (Value::Object(map), PathKey::Field(name)) => map.get(name),
            (Value::Object(map), PathKey::Index(i)) => map.get(&i.to_string()),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: &PathKey) -> Option<&mut Value> {
        match (self, key) {
            (Value::Array(items), key) => key.as_index().and_then(move |i| items.get_mut(i)),
            (Value::Object(map), PathKey::Field(name)) => map.get_mut(name),
            (Value::Object(map), PathKey::Index(i)) => map.get_mut(&i.to_string()),
            _ => None,
        }
    }

    /// Property read: children plus `length` on arrays and strings.
    pub fn property(&self, key: &PathKey) -> Value {
        if let Some(child) = self.get(key) {
            return child.clone();
        }
        match (self, key) {
            (Value::Array(items), PathKey::Field(name)) if name == "length" => {
                Value::Number(items.len() as f64)
            }
            (Value::String(s), PathKey::Field(name)) if name == "length" => {
                Value::Number(s.chars().count() as f64)
            }
            (Value::String(s), PathKey::Index(i)) => s
                .chars()
                .nth(*i)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Follow a sequence of keys, yielding `Undefined` once the path leaves the data.
    pub fn lookup(&self, keys: &[PathKey]) -> Value {
        match keys.split_first() {
            None => self.clone(),
            Some((first, rest)) => match self.get(first) {
                Some(child) => child.lookup(rest),
                None if rest.is_empty() => self.property(first),
                None => self.property(first).lookup(rest),
            },
        }
    }

    /// Assign a direct child. Returns the receiver's type name when it cannot hold children.
    pub fn assign(&mut self, key: &PathKey, value: Value) -> Result<(), &'static str> {
        match self {
            Value::Object(map) => {
                map.insert(key.to_string(), value);
                Ok(())
            }
            Value::Array(items) => match key {
                PathKey::Field(name) if name == "length" => {
                    let len = value.to_number();
                    if len.is_finite() && len >= 0.0 {
                        items.resize(len as usize, Value::Undefined);
                    }
                    Ok(())
                }
                key => match key.as_index() {
                    Some(i) if i < items.len() => {
                        items[i] = value;
                        Ok(())
                    }
                    Some(i) => {
                        items.resize(i, Value::Undefined);
                        items.push(value);
                        Ok(())
                    }
                    None => Err("array"),
                },
            },
            other => Err(other.type_name()),
        }
    }
}

/// Format a number the way page text expects: integral values without decimals.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) if !n.is_finite() => serializer.serialize_unit(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Node(_) => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Object> for Value {
    fn from(fields: Object) -> Self {
        Value::Object(fields)
    }
}

impl From<NodeId> for Value {
    fn from(id: NodeId) -> Self {
        Value::Node(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(!Value::Null.is_truthy());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000");
    }

    #[test]
    fn test_interpolation_uses_json_for_containers() {
        let value = Value::from(json!({"a": [1, 2.5, null], "b": "x"}));
        assert_eq!(value.to_interpolation(), r#"{"a":[1,2.5,null],"b":"x"}"#);
        assert_eq!(Value::from(json!([1, 2])).to_display_string(), "1,2");
        assert_eq!(Value::from("plain").to_interpolation(), "plain");
    }

    #[test]
    fn test_loose_and_strict_equality() {
        assert!(Value::from("2").loose_eq(&Value::from(2)));
        assert!(!Value::from("2").strict_eq(&Value::from(2)));
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(!Value::Null.strict_eq(&Value::Undefined));
        assert!(Value::from(true).loose_eq(&Value::from(1)));
        assert!(!Value::Number(f64::NAN).strict_eq(&Value::Number(f64::NAN)));
        assert!(!Value::Null.loose_eq(&Value::from(0)));
    }

    #[test]
    fn test_lookup_and_length() {
        let value = Value::from(json!({"todos": [{"text": "a"}, {"text": "bc"}]}));
        let keys = [
            PathKey::Field("todos".into()),
            PathKey::Index(1),
            PathKey::Field("text".into()),
            PathKey::Field("length".into()),
        ];
        assert_eq!(value.lookup(&keys), Value::from(2));
        assert_eq!(
            value.lookup(&[PathKey::Field("todos".into()), PathKey::Field("length".into())]),
            Value::from(2)
        );
        assert_eq!(value.lookup(&[PathKey::Field("missing".into())]), Value::Undefined);
    }

    #[test]
    fn test_assign_extends_arrays() {
        let mut value = Value::Array(vec![Value::from(1)]);
        value.assign(&PathKey::Index(2), Value::from(3)).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::from(1), Value::Undefined, Value::from(3)])
        );
        value
            .assign(&PathKey::Field("length".into()), Value::from(1))
            .unwrap();
        assert_eq!(value, Value::Array(vec![Value::from(1)]));
        assert_eq!(Value::from(5).assign(&PathKey::Index(0), Value::Null), Err("number"));
    }
}

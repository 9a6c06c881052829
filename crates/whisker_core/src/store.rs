//! Reactive store
//!
//! Holds the instance's top-level fields in declaration order. The store is
//! passive: it only reads and writes. Notifying watchers and re-rendering
//! dependents is the owning instance's job.

use indexmap::IndexMap;

use crate::error::StoreError;
use crate::path::{DataPath, PathKey};
use crate::value::Value;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    fields: IndexMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field with its initial value, replacing any previous one.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Read a path. Missing paths and paths through element references read as `Undefined`.
    pub fn get(&self, path: &DataPath) -> Value {
        let Some((first, rest)) = path.split_first() else {
            return Value::Undefined;
        };
        match self.fields.get(first.to_string().as_str()) {
            Some(value) => value.lookup(rest),
            None => Value::Undefined,
        }
    }

    /// Write a path. Intermediate containers must already exist.
    pub fn set(&mut self, path: &DataPath, value: Value) -> Result<(), StoreError> {
        let Some((first, rest)) = path.split_first() else {
            return Err(StoreError::EmptyPath);
        };
        let name = first.to_string();
        let Some((last, middle)) = rest.split_last() else {
            self.fields.insert(name, value);
            return Ok(());
        };

        let missing = |depth: usize| {
            let prefix: DataPath = path.keys()[..depth].iter().cloned().collect();
            StoreError::MissingPath(prefix.to_string())
        };
        let mut slot = self.fields.get_mut(name.as_str()).ok_or_else(|| missing(1))?;
        for (i, key) in middle.iter().enumerate() {
            slot = slot.get_mut(key).ok_or_else(|| missing(i + 2))?;
        }
        slot.assign(last, value).map_err(|kind| StoreError::NotAContainer {
            path: path.keys()[..path.len() - 1]
                .iter()
                .cloned()
                .collect::<DataPath>()
                .to_string(),
            kind,
        })
    }

    /// All fields as one object value.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.snapshot().to_json()
    }
}

impl FromIterator<(String, Value)> for Store {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The top-level field a path belongs to, as the binding registry keys it.
pub fn root_field(path: &DataPath) -> Option<String> {
    path.keys().first().map(PathKey::to_string)
}

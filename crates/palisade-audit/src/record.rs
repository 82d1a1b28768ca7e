//! Audit records: the caller-built event before sanitization.

use std::collections::btree_map::{self, BTreeMap};

use serde_json::{Map, Number};

use crate::error::{AssembleError, RecordError};
use crate::path::FieldPath;
use crate::sensitive::SensitiveValue;

/// A single value inside a [`Record`].
///
/// `Map` is the only variant the flattener descends into. Every other variant,
/// including `Array` and `Sensitive`, is a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Integer(i64),
    /// Unsigned integer too large for `i64`
    Unsigned(u64),
    /// Floating point number
    Float(f64),
    /// Plain string
    String(String),
    /// Array, treated as an opaque leaf
    Array(Vec<Value>),
    /// Nested record
    Map(Record),
    /// String marked as sensitive
    Sensitive(SensitiveValue),
}

impl Value {
    /// Returns true if this value is a [`SensitiveValue`].
    #[must_use]
    pub const fn is_sensitive(&self) -> bool {
        matches!(self, Self::Sensitive(_))
    }

    /// Returns the JSON type name used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Unsigned(_) | Self::Float(_) => "number",
            Self::String(_) | Self::Sensitive(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "object",
        }
    }

    /// Lifts plain JSON into a value. The result contains no sensitive leaves.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => number_value(&n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Map(Record::from_json(map)),
        }
    }

    /// Converts to plain JSON, unwrapping sensitive leaves.
    ///
    /// `path` is the location of this value and is only used for errors.
    pub(crate) fn to_plain(&self, path: &FieldPath) -> Result<serde_json::Value, AssembleError> {
        Ok(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Unsigned(u) => serde_json::Value::from(*u),
            Self::Float(f) => Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| AssembleError::NonFiniteNumber { path: path.clone() })?,
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.to_plain(path))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(record) => serde_json::Value::Object(record.to_plain(path)?),
            Self::Sensitive(sv) => serde_json::Value::String(sv.value().to_string()),
        })
    }
}

fn number_value(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Integer(i)
    } else if let Some(u) = n.as_u64() {
        Value::Unsigned(u)
    } else {
        // serde_json numbers are always finite, so as_f64 only fails on
        // arbitrary-precision builds; fall back to null there.
        n.as_f64().map_or(Value::Null, Value::Float)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Integer(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::Unsigned(v), Self::Integer)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Self::Map(v)
    }
}

impl From<SensitiveValue> for Value {
    fn from(v: SensitiveValue) -> Self {
        Self::Sensitive(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// An audit event: an ordered mapping from key to [`Value`].
///
/// Keys iterate in sorted order, so traversal of a record is reproducible
/// regardless of insertion order.
///
/// # Examples
///
/// ```
/// use palisade_audit::{Record, SensitiveValue};
///
/// let event = Record::new()
///     .with("action", "user.login")
///     .with("user", SensitiveValue::new("John Doe", "name").unwrap());
///
/// assert_eq!(event.len(), 2);
/// assert!(event.get("user").unwrap().is_sensitive());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a field, returning the previous value for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes a field.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns the value stored directly under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if `key` is present at this level.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields at this level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }

    /// Resolves a path to the value stored there.
    #[must_use]
    pub fn get_path(&self, path: &FieldPath) -> Option<&Value> {
        let mut segments = path.segments();
        let mut value = self.fields.get(segments.next()?)?;
        for key in segments {
            match value {
                Value::Map(nested) => value = nested.fields.get(key)?,
                _ => return None,
            }
        }
        Some(value)
    }

    /// Copies every field of `context` whose key is absent from this record.
    ///
    /// Fields already present in the record win over the context.
    pub fn enrich_from(&mut self, context: &Self) {
        for (key, value) in &context.fields {
            self.fields
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Wraps the string leaf at `path` in a [`SensitiveValue`] with `label`.
    ///
    /// A leaf that is already sensitive is relabelled.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyLabel`] for an empty label,
    /// [`RecordError::PathNotFound`] if nothing lives at `path`, and
    /// [`RecordError::NotAString`] if the leaf is not a string.
    pub fn mark_sensitive(&mut self, path: &FieldPath, label: &str) -> Result<(), RecordError> {
        if label.is_empty() {
            return Err(RecordError::EmptyLabel);
        }

        let not_found = || RecordError::PathNotFound { path: path.clone() };
        let segments: Vec<&str> = path.segments().collect();
        let Some((last, parents)) = segments.split_last() else {
            return Err(not_found());
        };

        let mut current = self;
        for key in parents {
            match current.fields.get_mut(*key) {
                Some(Value::Map(nested)) => current = nested,
                _ => return Err(not_found()),
            }
        }

        let slot = current.fields.get_mut(*last).ok_or_else(not_found)?;
        let plain = match slot {
            Value::String(s) => std::mem::take(s),
            Value::Sensitive(sv) => sv.value().to_string(),
            _ => return Err(RecordError::NotAString { path: path.clone() }),
        };
        *slot = Value::Sensitive(SensitiveValue::new(plain, label)?);

        Ok(())
    }

    /// Lifts a plain JSON object into a record.
    #[must_use]
    pub fn from_json(map: Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(key, value)| (key, Value::from_json(value)))
            .collect()
    }

    pub(crate) fn to_plain(
        &self,
        prefix: &FieldPath,
    ) -> Result<Map<String, serde_json::Value>, AssembleError> {
        let mut out = Map::new();
        for (key, value) in &self.fields {
            out.insert(key.clone(), value.to_plain(&prefix.child(key))?);
        }
        Ok(out)
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = RecordError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Object(map) => Ok(Self::from_json(map)),
            other => Err(RecordError::NotAnObject {
                found: Value::from_json(other).kind(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

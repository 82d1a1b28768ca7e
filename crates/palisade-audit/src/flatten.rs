//! Flattening of nested records into `(path, leaf)` pairs.

use crate::path::FieldPath;
use crate::record::{Record, Value};

/// Walks `record` and returns every leaf together with its path.
///
/// Nested maps are descended into and never returned themselves. Arrays,
/// scalars and sensitive values are leaves. Pairs come out depth first in
/// sorted key order, so the result is identical for equal records.
///
/// # Examples
///
/// ```
/// use palisade_audit::{flatten, Record};
///
/// let record = Record::new()
///     .with("action", "user.login")
///     .with("location", Record::new().with("city", "Paris"));
///
/// let paths: Vec<String> = flatten(&record)
///     .into_iter()
///     .map(|(path, _)| path.to_string())
///     .collect();
/// assert_eq!(paths, vec![".action", ".location.city"]);
/// ```
#[must_use]
pub fn flatten(record: &Record) -> Vec<(FieldPath, &Value)> {
    let mut leaves = Vec::new();
    walk(record, &FieldPath::root(), &mut leaves);
    leaves
}

fn walk<'a>(record: &'a Record, prefix: &FieldPath, leaves: &mut Vec<(FieldPath, &'a Value)>) {
    for (key, value) in record {
        let path = prefix.child(key);
        match value {
            Value::Map(nested) => walk(nested, &path, leaves),
            leaf => leaves.push((path, leaf)),
        }
    }
}

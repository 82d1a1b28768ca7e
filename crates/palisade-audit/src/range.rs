//! Sensitive range extraction for individual leaves.

use crate::record::Value;
use crate::sensitive::SensitiveRange;

/// Returns the sensitive ranges carried by a leaf, or `None` for plain values.
///
/// Extraction only looks at the leaf itself and knows nothing about where it
/// lives; the caller attaches the path. A sensitive leaf yields one range
/// spanning its entire plain value in UTF-8 bytes.
///
/// # Examples
///
/// ```
/// use palisade_audit::{extract_ranges, SensitiveValue, Value};
///
/// let leaf = Value::from(SensitiveValue::new("John Doe", "name").unwrap());
/// let ranges = extract_ranges(&leaf).unwrap();
/// assert_eq!((ranges[0].begin(), ranges[0].end()), (0, 8));
///
/// assert!(extract_ranges(&Value::from("user.login")).is_none());
/// ```
#[must_use]
pub fn extract_ranges(leaf: &Value) -> Option<Vec<SensitiveRange>> {
    match leaf {
        Value::Sensitive(sv) => Some(sv.ranges()),
        _ => None,
    }
}

//! Sensitive value wrappers and the ranges they produce.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::RecordError;

/// Unit used for every [`SensitiveRange`] offset: UTF-8 bytes of the plain string.
///
/// A range over `value` can be applied as `&value[range.begin()..range.end()]`.
pub const OFFSET_UNIT: &str = "utf8-bytes";

/// A leaf value marked as sensitive and tagged with a category label.
///
/// The wrapper is pure data. The pipeline unwraps it to its plain value when
/// assembling an envelope and records where it was found.
///
/// `Debug` never prints the wrapped value, so a record holding sensitive
/// leaves can be logged with `{:?}` without leaking it.
///
/// # Examples
///
/// ```
/// use palisade_audit::SensitiveValue;
///
/// let user = SensitiveValue::new("John Doe", "name").unwrap();
/// assert_eq!(user.value(), "John Doe");
/// assert_eq!(user.label(), "name");
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SensitiveValue {
    value: String,
    label: String,
}

impl SensitiveValue {
    /// Wraps `value` as sensitive data of the given category.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::EmptyLabel`] if `label` is empty.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Result<Self, RecordError> {
        let label = label.into();
        if label.is_empty() {
            return Err(RecordError::EmptyLabel);
        }

        Ok(Self {
            value: value.into(),
            label,
        })
    }

    /// Returns the plain value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the category label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the ranges this value contributes to a PII index.
    ///
    /// Only whole-value tagging is supported, so this is always a single range
    /// covering the entire plain value.
    #[must_use]
    pub fn ranges(&self) -> Vec<SensitiveRange> {
        vec![SensitiveRange {
            begin: 0,
            end: self.value.len(),
            label: self.label.clone(),
        }]
    }

    /// Consumes the wrapper and returns the plain value.
    #[must_use]
    pub fn into_value(self) -> String {
        self.value
    }
}

impl fmt::Debug for SensitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveValue")
            .field("label", &self.label)
            .field("len", &self.value.len())
            .finish()
    }
}

impl Serialize for SensitiveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

/// Half-open span `[begin, end)` of sensitive content inside a leaf's plain text.
///
/// Offsets are measured in [`OFFSET_UNIT`]. `begin <= end` always holds; the
/// upper bound against the plain text is guaranteed by construction from a
/// [`SensitiveValue`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr")]
pub struct SensitiveRange {
    begin: usize,
    end: usize,
    label: String,
}

impl SensitiveRange {
    /// Creates a range, returning `None` when `begin > end`.
    #[must_use]
    pub fn new(begin: usize, end: usize, label: impl Into<String>) -> Option<Self> {
        (begin <= end).then(|| Self {
            begin,
            end,
            label: label.into(),
        })
    }

    /// Start offset (inclusive).
    #[must_use]
    pub const fn begin(&self) -> usize {
        self.begin
    }

    /// End offset (exclusive).
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Category label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Length of the span in [`OFFSET_UNIT`].
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Returns true if the span covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

#[derive(Deserialize)]
struct RangeRepr {
    begin: usize,
    end: usize,
    label: String,
}

impl TryFrom<RangeRepr> for SensitiveRange {
    type Error = String;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        Self::new(repr.begin, repr.end, repr.label).ok_or_else(|| {
            format!(
                "range begin {} is past end {}",
                repr.begin, repr.end
            )
        })
    }
}

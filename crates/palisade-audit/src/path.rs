//! Structural paths locating leaves inside a record.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Dot-prefixed locator for a leaf, e.g. `.user` or `.location.city`.
///
/// A path is built by appending `.` plus each key from the root to the leaf.
/// The root itself is the empty path and never names a leaf.
///
/// Decoding accepts any text that starts with `.`. Empty segments are let
/// through there, since a record may legitimately use an empty key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath(String);

impl FieldPath {
    /// The empty path at the top of a record.
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Returns the path of `key` nested under this one.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        let mut path = String::with_capacity(self.0.len() + key.len() + 1);
        path.push_str(&self.0);
        path.push('.');
        path.push_str(key);
        Self(path)
    }

    /// Parses path text such as `.location.city`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::InvalidPath`] when the text does not start with
    /// `.` or contains an empty segment.
    ///
    /// # Examples
    ///
    /// ```
    /// use palisade_audit::FieldPath;
    ///
    /// let path = FieldPath::parse(".location.city").unwrap();
    /// assert_eq!(path.segments().collect::<Vec<_>>(), vec!["location", "city"]);
    /// ```
    pub fn parse(text: &str) -> Result<Self, RecordError> {
        let Some(rest) = text.strip_prefix('.') else {
            return Err(RecordError::InvalidPath {
                path: text.to_string(),
                reason: "path must start with '.'".to_string(),
            });
        };

        if rest.split('.').any(str::is_empty) {
            return Err(RecordError::InvalidPath {
                path: text.to_string(),
                reason: "path contains an empty segment".to_string(),
            });
        }

        Ok(Self(text.to_string()))
    }

    /// Iterates over the keys that make up this path.
    ///
    /// Keys that themselves contain `.` cannot be recovered from the text and
    /// are split like any other separator.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').skip(1)
    }

    /// Returns true for the empty root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the path text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FieldPath {
    type Error = RecordError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        if !text.starts_with('.') {
            return Err(RecordError::InvalidPath {
                path: text,
                reason: "path must start with '.'".to_string(),
            });
        }
        Ok(Self(text))
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Envelope assembly: sanitized record plus PII index plus generation time.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::{debug, warn};

use crate::codec::METADATA_KEY;
use crate::error::AssembleError;
use crate::flatten::flatten;
use crate::path::FieldPath;
use crate::range::extract_ranges;
use crate::record::Record;
use crate::sensitive::SensitiveRange;

/// Mapping from path to the sensitive ranges found at that path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PiiIndex(BTreeMap<FieldPath, Vec<SensitiveRange>>);

impl PiiIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `ranges` to the entry for `path`, creating it if needed.
    pub fn append(&mut self, path: FieldPath, ranges: impl IntoIterator<Item = SensitiveRange>) {
        self.0.entry(path).or_default().extend(ranges);
    }

    /// Returns the ranges recorded for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[SensitiveRange]> {
        self.0.get(path).map(Vec::as_slice)
    }

    /// Returns true if `path` has at least one entry.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Number of paths with sensitive data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no sensitive data was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over paths in sorted order.
    pub fn iter(&self) -> btree_map::Iter<'_, FieldPath, Vec<SensitiveRange>> {
        self.0.iter()
    }

    /// Iterates over the paths holding sensitive data.
    pub fn paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.0.keys()
    }
}

impl<'a> IntoIterator for &'a PiiIndex {
    type Item = (&'a FieldPath, &'a Vec<SensitiveRange>);
    type IntoIter = btree_map::Iter<'a, FieldPath, Vec<SensitiveRange>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(FieldPath, Vec<SensitiveRange>)> for PiiIndex {
    fn from_iter<I: IntoIterator<Item = (FieldPath, Vec<SensitiveRange>)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (path, ranges) in iter {
            index.append(path, ranges);
        }
        index
    }
}

/// A sanitized, transport-ready audit event.
///
/// Built once per publish attempt and immutable afterwards. The record has
/// every sensitive leaf replaced by its plain value; the PII index says
/// where those values were.
///
/// # Examples
///
/// ```
/// use palisade_audit::{Envelope, Record, SensitiveValue};
///
/// let record = Record::new()
///     .with("action", "user.login")
///     .with("user", SensitiveValue::new("John Doe", "name").unwrap());
///
/// let envelope = Envelope::assemble(&record).unwrap();
/// assert_eq!(envelope.record()["user"], "John Doe");
///
/// let ranges = envelope.pii().get(".user").unwrap();
/// assert_eq!((ranges[0].begin(), ranges[0].end(), ranges[0].label()), (0, 8, "name"));
/// ```
#[derive(Clone, PartialEq)]
pub struct Envelope {
    record: Map<String, serde_json::Value>,
    pii: PiiIndex,
    generated_at: DateTime<Utc>,
}

impl Envelope {
    /// Assembles an envelope from `record`, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AssembleError::NonFiniteNumber`] if a float leaf has no JSON
    /// form, and [`AssembleError::ReservedKey`] if the record uses the
    /// metadata key at the top level.
    pub fn assemble(record: &Record) -> Result<Self, AssembleError> {
        Self::assemble_at(record, Utc::now())
    }

    /// Assembles an envelope from `record` with an explicit generation time.
    ///
    /// # Errors
    ///
    /// Same as [`Envelope::assemble`].
    pub fn assemble_at(record: &Record, generated_at: DateTime<Utc>) -> Result<Self, AssembleError> {
        if record.contains_key(METADATA_KEY) {
            return Err(AssembleError::ReservedKey {
                key: METADATA_KEY.to_string(),
            });
        }

        let leaves = flatten(record);
        let mut pii = PiiIndex::new();

        for (path, leaf) in &leaves {
            let Some(ranges) = extract_ranges(leaf) else {
                continue;
            };

            if pii.contains(path.as_str()) {
                warn!(path = %path, "Multiple leaves resolve to the same path, appending ranges");
            }
            pii.append(path.clone(), ranges);
        }

        let sanitized = record.to_plain(&FieldPath::root())?;

        debug!(
            leaves = leaves.len(),
            sensitive_paths = pii.len(),
            "Assembled audit envelope"
        );

        Ok(Self {
            record: sanitized,
            pii,
            generated_at,
        })
    }

    pub(crate) const fn from_parts(
        record: Map<String, serde_json::Value>,
        pii: PiiIndex,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            record,
            pii,
            generated_at,
        }
    }

    /// Returns the sanitized record.
    #[must_use]
    pub const fn record(&self) -> &Map<String, serde_json::Value> {
        &self.record
    }

    /// Returns the PII index.
    #[must_use]
    pub const fn pii(&self) -> &PiiIndex {
        &self.pii
    }

    /// Returns the time the envelope was assembled.
    #[must_use]
    pub const fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// Consumes the envelope and returns the sanitized record.
    #[must_use]
    pub fn into_record(self) -> Map<String, serde_json::Value> {
        self.record
    }
}

// The sanitized record holds plain sensitive values, so only its shape is shown.
impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("record_keys", &self.record.keys().collect::<Vec<_>>())
            .field("pii", &self.pii)
            .field("generated_at", &self.generated_at)
            .finish()
    }
}

//! JSON wire encoding for envelopes.
//!
//! The encoded form keeps the sanitized record's keys at the top level, so a
//! consumer that only understands plain events reads it unchanged. PII
//! metadata travels under a single reserved key:
//!
//! ```json
//! {
//!   "action": "user.login",
//!   "user": "John Doe",
//!   ".palisade": {
//!     "pii": { ".user": [ { "begin": 0, "end": 8, "label": "name" } ] },
//!     "generatedAt": "2024-05-01T12:00:00Z"
//!   }
//! }
//! ```
//!
//! `pii` is always written, even when empty. Decoders accept a metadata block
//! without `pii` and treat it as an empty index.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::envelope::{Envelope, PiiIndex};
use crate::error::CodecError;

/// Top-level key holding envelope metadata on the wire.
pub const METADATA_KEY: &str = ".palisade";

#[derive(Serialize)]
struct MetadataRef<'a> {
    pii: &'a PiiIndex,
    #[serde(rename = "generatedAt")]
    generated_at: &'a DateTime<Utc>,
}

#[derive(Deserialize)]
struct Metadata {
    #[serde(default)]
    pii: PiiIndex,
    #[serde(rename = "generatedAt")]
    generated_at: DateTime<Utc>,
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.record().len() + 1))?;
        for (key, value) in self.record() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(
            METADATA_KEY,
            &MetadataRef {
                pii: self.pii(),
                generated_at: &self.generated_at(),
            },
        )?;
        map.end()
    }
}

/// Encodes an envelope as compact JSON bytes.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Encodes an envelope as a compact JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_to_string(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Encodes an envelope as indented JSON.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_pretty(envelope: &Envelope) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(envelope)?)
}

/// Decodes an envelope from JSON bytes.
///
/// # Errors
///
/// - [`CodecError::Json`] if the bytes are not valid JSON.
/// - [`CodecError::NotAnObject`] if the document is not a JSON object.
/// - [`CodecError::MissingMetadata`] if the metadata block is absent.
/// - [`CodecError::InvalidMetadata`] if the metadata block is malformed.
///
/// # Examples
///
/// ```
/// use palisade_audit::{decode, encode, Envelope, Record, SensitiveValue};
///
/// let record = Record::new().with("user", SensitiveValue::new("John Doe", "name").unwrap());
/// let envelope = Envelope::assemble(&record).unwrap();
///
/// let decoded = decode(&encode(&envelope).unwrap()).unwrap();
/// assert_eq!(decoded, envelope);
/// ```
pub fn decode(bytes: &[u8]) -> Result<Envelope, CodecError> {
    decode_value(serde_json::from_slice(bytes)?)
}

/// Decodes an envelope from a JSON string.
///
/// # Errors
///
/// Same as [`decode`].
pub fn decode_str(text: &str) -> Result<Envelope, CodecError> {
    decode_value(serde_json::from_str(text)?)
}

/// Decodes an envelope from an already parsed JSON document.
///
/// # Errors
///
/// Same as [`decode`], except that [`CodecError::Json`] is never returned.
pub fn decode_value(value: serde_json::Value) -> Result<Envelope, CodecError> {
    let serde_json::Value::Object(mut record) = value else {
        return Err(CodecError::NotAnObject);
    };

    let metadata = record
        .remove(METADATA_KEY)
        .ok_or(CodecError::MissingMetadata { key: METADATA_KEY })?;

    let metadata: Metadata =
        serde_json::from_value(metadata).map_err(|e| CodecError::InvalidMetadata {
            reason: e.to_string(),
        })?;

    Ok(Envelope::from_parts(
        record,
        metadata.pii,
        metadata.generated_at,
    ))
}

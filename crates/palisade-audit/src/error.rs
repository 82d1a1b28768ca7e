//! Error types for the sanitization pipeline.
//!
//! Each stage has its own error enum so callers can tell a malformed record
//! apart from a metadata block that failed to decode. None of the messages
//! carry value contents: they name paths, keys and labels only.

use thiserror::Error;

use crate::path::FieldPath;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or editing a [`Record`](crate::Record).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A sensitive value was given an empty category label.
    #[error("Sensitive value label cannot be empty")]
    EmptyLabel,

    /// No leaf exists at the requested path.
    #[error("No value found at {path}")]
    PathNotFound {
        /// The path that was looked up.
        path: FieldPath,
    },

    /// The leaf at the requested path is not a string and cannot be marked.
    #[error("Value at {path} is not a string")]
    NotAString {
        /// The path of the offending leaf.
        path: FieldPath,
    },

    /// The path text could not be parsed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The raw path text.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A JSON document that is not an object was offered as a record.
    #[error("Expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type name of the offered document.
        found: &'static str,
    },
}

/// Errors raised by [`Envelope::assemble`](crate::Envelope::assemble).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// A float leaf is NaN or infinite and has no JSON form.
    #[error("Non-finite number at {path}")]
    NonFiniteNumber {
        /// The path of the offending leaf.
        path: FieldPath,
    },

    /// A top-level key collides with the reserved metadata key.
    #[error("Top-level key '{key}' is reserved for envelope metadata")]
    ReservedKey {
        /// The reserved key.
        key: String,
    },
}

/// Errors raised while encoding or decoding an envelope.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying JSON could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded document is not a JSON object.
    #[error("Encoded envelope must be a JSON object")]
    NotAnObject,

    /// The metadata block is absent.
    #[error("Encoded envelope is missing the '{key}' metadata block")]
    MissingMetadata {
        /// The metadata key that was expected.
        key: &'static str,
    },

    /// The metadata block is present but malformed.
    #[error("Invalid envelope metadata: {reason}")]
    InvalidMetadata {
        /// Why the metadata was rejected.
        reason: String,
    },
}

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Writing the body failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The body could not be re-encoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The transport refused the body.
    #[error("Transport rejected envelope: {reason}")]
    Rejected {
        /// Why the body was refused.
        reason: String,
    },
}

/// Errors raised by [`Publisher::publish`](crate::Publisher::publish).
#[derive(Error, Debug)]
pub enum PublishError {
    /// The record could not be sanitized.
    #[error("Failed to assemble envelope: {0}")]
    Assemble(#[from] AssembleError),

    /// The envelope could not be encoded.
    #[error("Failed to encode envelope: {0}")]
    Codec(#[from] CodecError),

    /// The transport failed to deliver the envelope.
    #[error("Transport '{transport}' failed: {source}")]
    Transport {
        /// Name of the failing transport.
        transport: &'static str,
        /// Underlying error.
        #[source]
        source: TransportError,
    },
}

/// Any error produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Record construction error.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Assembly error.
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    /// Encoding or decoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Publishing error.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

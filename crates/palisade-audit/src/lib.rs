//! Audit-event sanitization and PII-range tracking.
//!
//! This crate turns caller-built audit records into transport-ready
//! envelopes:
//!
//! - Sensitive leaves ([`SensitiveValue`]) are unwrapped to their plain value
//! - Every sensitive leaf is recorded in a [`PiiIndex`] by structural path
//! - The envelope is stamped with its generation time
//! - [`encode`] / [`decode`] move envelopes across the JSON wire boundary
//!
//! # Pipeline
//!
//! ```text
//! Record ──► flatten ──► extract_ranges ──► Envelope::assemble ──► encode ──► Transport
//! ```
//!
//! Offsets in every [`SensitiveRange`] are UTF-8 byte offsets into the plain
//! value (see [`OFFSET_UNIT`]).
//!
//! # Example
//!
//! ```rust
//! use palisade_audit::{InMemoryTransport, Publisher, Record, SensitiveValue};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(InMemoryTransport::new());
//! let publisher = Publisher::builder()
//!     .with_transport(transport.clone())
//!     .build();
//!
//! let event = Record::new()
//!     .with("action", "user.login")
//!     .with("user", SensitiveValue::new("John Doe", "name").unwrap());
//! publisher.publish(&event).unwrap();
//!
//! let envelope = &transport.envelopes().unwrap()[0];
//! assert_eq!(envelope.record()["user"], "John Doe");
//! assert_eq!(envelope.pii().get(".user").unwrap()[0].end(), 8);
//! ```

mod codec;
mod config;
mod envelope;
mod error;
mod flatten;
mod path;
mod publisher;
mod range;
mod record;
mod sensitive;


pub use codec::{
    decode, decode_str, decode_value, encode, encode_pretty, encode_to_string, METADATA_KEY,
};
pub use config::{PublisherConfig, DEBUG_ENV, SILENCE_ENV};
pub use envelope::{Envelope, PiiIndex};
pub use error::{
    AssembleError, CodecError, Error, PublishError, RecordError, Result, TransportError,
};
pub use flatten::flatten;
pub use path::FieldPath;
pub use publisher::{
    InMemoryTransport, NoopTransport, Publisher, PublisherBuilder, TracingTransport, Transport,
    WriterTransport,
};
pub use range::extract_ranges;
pub use record::{Record, Value};
pub use sensitive::{SensitiveRange, SensitiveValue, OFFSET_UNIT};

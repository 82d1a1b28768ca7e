//! Publisher and the transport seam.

use std::fmt::Debug;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::codec::{decode, encode};
use crate::config::PublisherConfig;
use crate::envelope::Envelope;
use crate::error::{CodecError, PublishError, TransportError};
use crate::path::FieldPath;
use crate::record::Record;

/// Destination for encoded envelopes.
///
/// Implementations receive the wire bytes and report success or failure;
/// how and where the bytes travel is up to them.
pub trait Transport: Send + Sync + Debug {
    /// Delivers one encoded envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the envelope cannot be delivered.
    fn send(&self, body: &[u8]) -> Result<(), TransportError>;

    /// Flushes any buffered envelopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&self) -> Result<(), TransportError>;

    /// Returns the transport name for identification.
    fn name(&self) -> &'static str;
}

/// Sanitizes audit records and hands the encoded envelopes to a transport.
#[derive(Debug, Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
    config: PublisherConfig,
}

impl Publisher {
    /// Creates a publisher with the given configuration and transport.
    #[must_use]
    pub fn new(config: PublisherConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    /// Creates a builder for configuring the publisher.
    #[must_use]
    pub fn builder() -> PublisherBuilder {
        PublisherBuilder::new()
    }

    /// Returns the publisher configuration.
    #[must_use]
    pub const fn config(&self) -> PublisherConfig {
        self.config
    }

    /// Returns the name of the configured transport.
    #[must_use]
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Assembles, encodes and sends `record`.
    ///
    /// A silenced publisher returns `Ok(())` without touching the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be assembled or encoded, or if
    /// the transport fails.
    pub fn publish(&self, record: &Record) -> Result<(), PublishError> {
        if self.config.silence {
            debug!("Audit event was silenced");
            return Ok(());
        }

        let envelope = Envelope::assemble(record)?;
        let body = encode(&envelope)?;

        if self.config.debug {
            let paths: Vec<&str> = envelope.pii().paths().map(FieldPath::as_str).collect();
            debug!(
                bytes = body.len(),
                sensitive_paths = ?paths,
                transport = self.transport.name(),
                "Publishing audit envelope"
            );
        }

        self.transport
            .send(&body)
            .map_err(|source| PublishError::Transport {
                transport: self.transport.name(),
                source,
            })
    }

    /// Publishes `record` after filling in fields it lacks from `context`.
    ///
    /// When both carry the same key, the record's value is kept.
    ///
    /// # Errors
    ///
    /// Same as [`Publisher::publish`].
    pub fn publish_with_context(&self, context: &Record, record: &Record) -> Result<(), PublishError> {
        let mut enriched = record.clone();
        enriched.enrich_from(context);
        self.publish(&enriched)
    }

    /// Flushes the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails to flush.
    pub fn flush(&self) -> Result<(), PublishError> {
        self.transport
            .flush()
            .map_err(|source| PublishError::Transport {
                transport: self.transport.name(),
                source,
            })
    }
}

/// Builder for configuring a publisher.
#[derive(Debug, Default)]
pub struct PublisherBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: PublisherConfig,
}

impl PublisherBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport. Defaults to [`TracingTransport`].
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub const fn with_config(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables debug logging.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Enables or disables silencing.
    #[must_use]
    pub const fn silence(mut self, silence: bool) -> Self {
        self.config.silence = silence;
        self
    }

    /// Builds the publisher.
    #[must_use]
    pub fn build(self) -> Publisher {
        Publisher {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(TracingTransport::new())),
            config: self.config,
        }
    }
}

/// Transport that reports each envelope through `tracing`.
///
/// Only the body size is logged, never its contents.
#[derive(Debug, Default)]
pub struct TracingTransport;

impl TracingTransport {
    /// Creates a new tracing transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for TracingTransport {
    fn send(&self, body: &[u8]) -> Result<(), TransportError> {
        info!(bytes = body.len(), "Audit envelope published");
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}

/// Transport that discards everything.
#[derive(Debug, Default)]
pub struct NoopTransport;

impl NoopTransport {
    /// Creates a new no-op transport.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Transport for NoopTransport {
    fn send(&self, _body: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Transport writing newline-delimited JSON envelopes to any writer.
///
/// In pretty mode each body is re-indented before writing. The body is
/// re-parsed for that, so keys come out in sorted order.
#[derive(Debug)]
pub struct WriterTransport<W> {
    writer: Mutex<W>,
    pretty: bool,
}

impl<W: Write + Send + Debug> WriterTransport<W> {
    /// Wraps a writer, emitting one compact envelope per line.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty: false,
        }
    }

    /// Wraps a writer, emitting indented envelopes.
    pub fn pretty(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            pretty: true,
        }
    }

    /// Returns true if envelopes are indented.
    #[must_use]
    pub const fn is_pretty(&self) -> bool {
        self.pretty
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send + Debug> Transport for WriterTransport<W> {
    fn send(&self, body: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock();
        if self.pretty {
            let value: serde_json::Value = serde_json::from_slice(body)?;
            serde_json::to_writer_pretty(&mut *writer, &value)?;
        } else {
            writer.write_all(body)?;
        }
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "writer"
    }
}

/// In-memory transport for testing.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    bodies: Mutex<Vec<Vec<u8>>>,
    reject: Option<String>,
}

impl InMemoryTransport {
    /// Creates a transport that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that refuses every envelope with `reason`.
    #[must_use]
    pub fn rejecting(reason: impl Into<String>) -> Self {
        Self {
            bodies: Mutex::new(Vec::new()),
            reject: Some(reason.into()),
        }
    }

    /// Returns all received bodies.
    #[must_use]
    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().clone()
    }

    /// Decodes all received bodies.
    ///
    /// # Errors
    ///
    /// Returns an error if any stored body fails to decode.
    pub fn envelopes(&self) -> Result<Vec<Envelope>, CodecError> {
        self.bodies.lock().iter().map(|b| decode(b)).collect()
    }

    /// Number of received bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.lock().len()
    }

    /// Returns true if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.lock().is_empty()
    }

    /// Clears all received bodies.
    pub fn clear(&self) {
        self.bodies.lock().clear();
    }
}

impl Transport for InMemoryTransport {
    fn send(&self, body: &[u8]) -> Result<(), TransportError> {
        if let Some(reason) = &self.reject {
            return Err(TransportError::Rejected {
                reason: reason.clone(),
            });
        }
        self.bodies.lock().push(body.to_vec());
        Ok(())
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensitive::SensitiveValue;

    fn login() -> Record {
        Record::new()
            .with("action", "user.login")
            .with("user", SensitiveValue::new("John Doe", "name").unwrap())
    }

    #[test]
    fn test_publish_to_in_memory_transport() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Publisher::builder()
            .with_transport(transport.clone())
            .build();

        publisher.publish(&login()).unwrap();

        let envelopes = transport.envelopes().unwrap();
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].record()["user"], "John Doe");
        assert!(envelopes[0].pii().contains(".user"));
    }

    #[test]
    fn test_silenced_publisher_sends_nothing() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Publisher::builder()
            .with_transport(transport.clone())
            .silence(true)
            .build();

        publisher.publish(&login()).unwrap();

        assert!(transport.is_empty());
    }

    #[test]
    fn test_silence_skips_assembly_errors() {
        let publisher = Publisher::builder()
            .with_transport(Arc::new(NoopTransport::new()))
            .silence(true)
            .build();

        let bad = Record::new().with("ratio", f64::NAN);
        assert!(publisher.publish(&bad).is_ok());
    }

    #[test]
    fn test_publish_with_context_prefers_event() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Publisher::new(PublisherConfig::new(), transport.clone());

        let context = Record::new().with("action", "user.first").with("request_id", "abc");
        let event = Record::new().with("action", "user.second");

        publisher.publish_with_context(&context, &event).unwrap();

        let envelope = &transport.envelopes().unwrap()[0];
        assert_eq!(envelope.record()["action"], "user.second");
        assert_eq!(envelope.record()["request_id"], "abc");
    }

    #[test]
    fn test_context_sensitive_values_are_indexed() {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = Publisher::new(PublisherConfig::new(), transport.clone());

        let context = Record::new().with(
            "location",
            SensitiveValue::new("127.0.0.1", "ip-address").unwrap(),
        );
        publisher
            .publish_with_context(&context, &Record::new().with("action", "user.login"))
            .unwrap();

        let envelope = &transport.envelopes().unwrap()[0];
        assert_eq!(envelope.pii().get(".location").unwrap()[0].end(), 9);
    }

    #[test]
    fn test_transport_failure_is_reported() {
        let publisher = Publisher::new(
            PublisherConfig::new(),
            Arc::new(InMemoryTransport::rejecting("service unavailable")),
        );

        let err = publisher.publish(&login()).unwrap_err();
        assert!(matches!(
            err,
            PublishError::Transport { transport: "in_memory", .. }
        ));
        assert!(!err.to_string().contains("John Doe"));
    }

    #[test]
    fn test_assemble_failure_is_reported() {
        let publisher = Publisher::new(PublisherConfig::new(), Arc::new(NoopTransport::new()));
        let err = publisher
            .publish(&Record::new().with("ratio", f64::INFINITY))
            .unwrap_err();
        assert!(matches!(err, PublishError::Assemble(_)));
    }

    #[test]
    fn test_writer_transport_writes_lines() {
        let transport = WriterTransport::new(Vec::new());
        transport.send(b"{\"a\":1}").unwrap();
        transport.send(b"{\"b\":2}").unwrap();
        transport.flush().unwrap();

        let written = String::from_utf8(transport.into_inner()).unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn test_pretty_writer_transport_indents() {
        let transport = WriterTransport::pretty(Vec::new());
        assert!(transport.is_pretty());
        transport.send(b"{\"a\":1}").unwrap();

        let written = String::from_utf8(transport.into_inner()).unwrap();
        assert_eq!(written, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn test_pretty_writer_transport_rejects_invalid_body() {
        let transport = WriterTransport::pretty(Vec::new());
        let err = transport.send(b"not json").unwrap_err();
        assert!(matches!(err, TransportError::Json(_)));
    }

    #[test]
    fn test_default_transport_is_tracing() {
        let publisher = Publisher::builder().debug(true).build();
        assert_eq!(publisher.transport_name(), "tracing");
        assert!(publisher.config().debug);
        publisher.publish(&login()).unwrap();
        publisher.flush().unwrap();
    }

    #[test]
    fn test_in_memory_transport_clear() {
        let transport = InMemoryTransport::new();
        transport.send(b"{}").unwrap();
        assert_eq!(transport.len(), 1);

        transport.clear();
        assert!(transport.is_empty());
        assert!(transport.bodies().is_empty());
    }
}

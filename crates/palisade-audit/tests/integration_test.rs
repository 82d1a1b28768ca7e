//! Integration tests for the publishing pipeline.
//!
//! These tests build records the way an application would, publish them
//! through an in-memory transport and inspect what arrived on the wire.

use std::sync::Arc;
use std::thread;

use chrono::{TimeZone, Utc};
use palisade_audit::{
    decode, decode_str, encode, CodecError, Envelope, FieldPath, InMemoryTransport, PiiIndex,
    PublishError, Publisher, PublisherConfig, Record, SensitiveRange, SensitiveValue, Value,
    WriterTransport, METADATA_KEY,
};
use serde_json::json;

/// Creates a publisher backed by a fresh in-memory transport.
fn in_memory_publisher() -> (Publisher, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    let publisher = Publisher::builder()
        .with_transport(transport.clone())
        .build();
    (publisher, transport)
}

fn sensitive(value: &str, label: &str) -> SensitiveValue {
    SensitiveValue::new(value, label).expect("label is non-empty")
}

fn single_envelope(transport: &InMemoryTransport) -> Envelope {
    let mut envelopes = transport.envelopes().expect("bodies decode");
    assert_eq!(envelopes.len(), 1, "expected exactly one published envelope");
    envelopes.remove(0)
}

#[test]
fn test_top_level_sensitive_value() {
    let (publisher, transport) = in_memory_publisher();

    let event = Record::new()
        .with("action", "user.login")
        .with("user", sensitive("John Doe", "name"));
    publisher.publish(&event).expect("publish succeeds");

    let envelope = single_envelope(&transport);
    assert_eq!(envelope.record()["action"], "user.login");
    assert_eq!(envelope.record()["user"], "John Doe");
    assert_eq!(
        envelope.pii().get(".user"),
        Some(&[SensitiveRange::new(0, 8, "name").unwrap()][..])
    );
    assert_eq!(envelope.pii().len(), 1);
}

#[test]
fn test_nested_sensitive_value() {
    let (publisher, transport) = in_memory_publisher();

    let event = Record::new().with("action", "user.login").with(
        "location",
        Record::new()
            .with("city", sensitive("San Francisco", "city"))
            .with("country", "US"),
    );
    publisher.publish(&event).expect("publish succeeds");

    let envelope = single_envelope(&transport);
    assert_eq!(envelope.record()["location"]["city"], "San Francisco");
    assert_eq!(envelope.record()["location"]["country"], "US");

    let ranges = envelope.pii().get(".location.city").expect("city is indexed");
    assert_eq!(ranges.len(), 1);
    assert_eq!(ranges[0].begin(), 0);
    assert_eq!(ranges[0].end(), 13);
    assert_eq!(ranges[0].label(), "city");
    assert!(!envelope.pii().contains(".location.country"));
}

#[test]
fn test_event_without_sensitive_values() {
    let (publisher, transport) = in_memory_publisher();

    publisher
        .publish(&Record::new().with("action", "user.logout").with("count", 3))
        .expect("publish succeeds");

    let bodies = transport.bodies();
    let wire: serde_json::Value = serde_json::from_slice(&bodies[0]).unwrap();
    assert_eq!(wire["action"], "user.logout");
    assert_eq!(wire["count"], 3);
    assert_eq!(wire[METADATA_KEY]["pii"], json!({}));
    assert!(wire[METADATA_KEY]["generatedAt"].is_string());
}

#[test]
fn test_wire_shape() {
    let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let record = Record::new()
        .with("action", "user.login")
        .with("user", sensitive("John Doe", "name"));

    let envelope = Envelope::assemble_at(&record, generated_at).unwrap();
    let wire: serde_json::Value = serde_json::from_slice(&encode(&envelope).unwrap()).unwrap();

    assert_eq!(
        wire,
        json!({
            "action": "user.login",
            "user": "John Doe",
            ".palisade": {
                "pii": { ".user": [{ "begin": 0, "end": 8, "label": "name" }] },
                "generatedAt": "2024-05-01T12:00:00Z"
            }
        })
    );
}

#[test]
fn test_roundtrip_through_transport() {
    let (publisher, transport) = in_memory_publisher();
    let generated_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let record = Record::new()
        .with("user", sensitive("José", "name"))
        .with("request", Record::new().with("ip", sensitive("10.0.0.1", "ip-address")))
        .with("tags", vec![Value::from("a"), Value::from("b")]);
    let expected = Envelope::assemble_at(&record, generated_at).unwrap();

    publisher.publish(&record).expect("publish succeeds");
    let received = single_envelope(&transport);

    assert_eq!(received.record(), expected.record());
    assert_eq!(received.pii(), expected.pii());
    assert_eq!(received.pii().get(".user").unwrap()[0].end(), 5);
    assert_eq!(decode(&encode(&expected).unwrap()).unwrap(), expected);
}

#[test]
fn test_publish_with_context() {
    let (publisher, transport) = in_memory_publisher();

    let context = Record::new()
        .with("request_id", "req-42")
        .with("user", sensitive("Context User", "name"));
    let event = Record::new()
        .with("action", "document.read")
        .with("user", sensitive("John Doe", "name"));

    publisher
        .publish_with_context(&context, &event)
        .expect("publish succeeds");

    let envelope = single_envelope(&transport);
    assert_eq!(envelope.record()["request_id"], "req-42");
    assert_eq!(envelope.record()["user"], "John Doe");
    assert_eq!(envelope.pii().get(".user").unwrap()[0].end(), 8);
}

#[test]
fn test_mark_sensitive_before_publish() {
    let (publisher, transport) = in_memory_publisher();

    let mut event = Record::try_from(json!({
        "action": "user.login",
        "actor": { "email": "jane@example.com", "id": 7 }
    }))
    .unwrap();
    event
        .mark_sensitive(&FieldPath::parse(".actor.email").unwrap(), "email")
        .unwrap();
    publisher.publish(&event).expect("publish succeeds");

    let envelope = single_envelope(&transport);
    assert_eq!(envelope.record()["actor"]["email"], "jane@example.com");
    assert_eq!(
        envelope.pii().get(".actor.email").unwrap()[0].label(),
        "email"
    );
    assert!(!envelope.pii().contains(".actor.id"));
}

#[test]
fn test_silenced_publisher_sends_nothing() {
    let transport = Arc::new(InMemoryTransport::new());
    let publisher = Publisher::new(PublisherConfig::new().with_silence(true), transport.clone());

    publisher
        .publish(&Record::new().with("action", "user.login"))
        .expect("silenced publish succeeds");

    assert!(transport.is_empty());
}

#[test]
fn test_rejecting_transport_surfaces_error() {
    let publisher = Publisher::builder()
        .with_transport(Arc::new(InMemoryTransport::rejecting("quota exceeded")))
        .build();

    let err = publisher
        .publish(&Record::new().with("action", "user.login"))
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::Transport {
            transport: "in_memory",
            ..
        }
    ));
    assert!(err.to_string().contains("in_memory"));
}

#[test]
fn test_reserved_key_is_rejected() {
    let (publisher, transport) = in_memory_publisher();

    let err = publisher
        .publish(&Record::new().with(METADATA_KEY, "spoofed"))
        .unwrap_err();

    assert!(matches!(err, PublishError::Assemble(_)));
    assert!(transport.is_empty());
}

#[test]
fn test_writer_transport_publish_and_flush() {
    let publisher = Publisher::builder()
        .with_transport(Arc::new(WriterTransport::new(Vec::new())))
        .build();

    publisher
        .publish(&Record::new().with("user", sensitive("John Doe", "name")))
        .unwrap();
    publisher.flush().unwrap();
}

#[test]
fn test_decode_rejects_foreign_documents() {
    assert!(matches!(
        decode_str(r#"{"action": "user.login"}"#),
        Err(CodecError::MissingMetadata { .. })
    ));
    assert!(matches!(decode_str("[1, 2]"), Err(CodecError::NotAnObject)));
    assert!(matches!(decode_str("{"), Err(CodecError::Json(_))));
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_shared_types_are_send_and_sync() {
    assert_send_sync::<Envelope>();
    assert_send_sync::<Record>();
    assert_send_sync::<PiiIndex>();
    assert_send_sync::<Publisher>();
    assert_send_sync::<InMemoryTransport>();
    assert_send_sync::<WriterTransport<Vec<u8>>>();
}

#[test]
fn test_publish_from_many_threads() {
    const THREADS: u32 = 8;
    const EVENTS_PER_THREAD: u32 = 25;
    let total = (THREADS * EVENTS_PER_THREAD) as usize;

    let (publisher, transport) = in_memory_publisher();
    let publisher = Arc::new(publisher);

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let publisher = Arc::clone(&publisher);
            thread::spawn(move || {
                for seq in 0..EVENTS_PER_THREAD {
                    let event = Record::new()
                        .with("worker", worker)
                        .with("seq", seq)
                        .with("user", sensitive("John Doe", "name"));
                    publisher.publish(&event).expect("publish succeeds");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    let envelopes = transport.envelopes().expect("bodies decode");
    assert_eq!(envelopes.len(), total);

    let mut seen: Vec<(u64, u64)> = envelopes
        .iter()
        .map(|e| {
            assert_eq!(e.pii().get(".user").unwrap()[0].end(), 8);
            (
                e.record()["worker"].as_u64().unwrap(),
                e.record()["seq"].as_u64().unwrap(),
            )
        })
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), total);
}

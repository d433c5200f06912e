//! Tests for the invocation context and correlation identifiers

use std::time::{Duration, Instant};
use typeroute::{CorrelationId, InvocationContext};

#[test]
fn test_values_propagate_and_do_not_leak_between_contexts() {
    let ctx = InvocationContext::new()
        .with_value("tenant", "acme")
        .with_value("source", "queue");
    assert_eq!(ctx.value("tenant"), Some("acme"));
    assert_eq!(ctx.value("source"), Some("queue"));
    assert_eq!(ctx.value("missing"), None);

    let other = InvocationContext::new();
    assert_eq!(other.value("tenant"), None);
}

#[test]
fn test_cancellation_is_shared_across_clones() {
    let ctx = InvocationContext::new();
    let clone = ctx.clone();
    assert!(!ctx.is_cancelled());

    let handle = ctx.cancel_handle();
    handle.cancel();
    assert!(ctx.is_cancelled());
    assert!(clone.is_cancelled());

    // Idempotent.
    handle.cancel();
    assert!(ctx.is_cancelled());
}

#[test]
fn test_deadline_is_carried_not_enforced() {
    let deadline = Instant::now() + Duration::from_millis(5);
    let ctx = InvocationContext::new().with_deadline(deadline);
    assert_eq!(ctx.deadline(), Some(deadline));

    std::thread::sleep(Duration::from_millis(10));
    // The dispatcher imposes no timeout; an expired deadline only matters to
    // handlers that choose to check it.
    assert!(!ctx.is_cancelled());
}

#[test]
fn test_correlation_id_roundtrip() {
    let id = CorrelationId::new();
    let parsed: CorrelationId = id.to_string().parse().expect("roundtrip");
    assert_eq!(id, parsed);
}

#[test]
fn test_correlation_id_from_annotation() {
    let id = CorrelationId::new();
    let rendered = id.to_string();
    assert_eq!(
        CorrelationId::from_annotation_or_new(Some(&rendered)),
        id
    );

    // Absent or malformed annotations fall back to a fresh id.
    let fresh = CorrelationId::from_annotation_or_new(None);
    assert_ne!(fresh, id);
    let replaced = CorrelationId::from_annotation_or_new(Some("not-a-ulid"));
    assert_ne!(replaced, id);
}

//! Tests for the trial-decode dispatch loop
//!
//! # Test Coverage
//!
//! - Record shapes win over scalar shapes they don't overlap with
//! - Strict decoding: quoted literals never match numeric shapes, unknown
//!   fields disqualify narrower record shapes
//! - Scalar ambiguity resolved deterministically first-registered-wins
//! - Empty registry yields `NoHandlerMatched`
//! - A matched handler's error is final and returned verbatim
//! - Response encoding failures surface as `SerializationError`
//! - Context (correlation id, values, cancellation) reaches the handler
//!   unmodified

mod common;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use typeroute::{
    handler, CorrelationId, DispatchError, HandlerRegistry, InvocationContext, NoopTelemetry,
    PayloadDispatcher,
};

#[derive(Debug, Deserialize, Serialize)]
struct Wrapped {
    v: String,
}

fn dispatch_json(dispatcher: &PayloadDispatcher, payload: &[u8]) -> Value {
    let ctx = InvocationContext::new();
    let bytes = dispatcher.dispatch(&ctx, payload).expect("dispatch");
    serde_json::from_slice(&bytes).expect("valid json response")
}

#[test]
fn test_record_shape_wins_over_scalars() {
    let _tracing = common::init_tracing();
    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([
            handler(|_ctx: &InvocationContext, s: String| Ok(json!({"kind": "string", "value": s}))),
            handler(|_ctx: &InvocationContext, n: i64| Ok(json!({"kind": "int", "value": n}))),
            handler(|_ctx: &InvocationContext, ev: Wrapped| Ok(json!({"kind": "record", "value": ev.v}))),
        ])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);

    let resp = dispatch_json(&dispatcher, br#"{"v": "test"}"#);
    assert_eq!(resp, json!({"kind": "record", "value": "test"}));
}

#[test]
fn test_quoted_literal_matches_string_not_int() {
    let registry = Arc::new(HandlerRegistry::new());
    // Int registered first: strict decode of a quoted literal into an
    // integer shape must still fail, so order cannot save a wrong match.
    registry
        .register([
            handler(|_ctx: &InvocationContext, n: i64| Ok(json!({"kind": "int", "value": n}))),
            handler(|_ctx: &InvocationContext, s: String| Ok(json!({"kind": "string", "value": s}))),
        ])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);

    let resp = dispatch_json(&dispatcher, br#""1""#);
    assert_eq!(resp, json!({"kind": "string", "value": "1"}));
}

#[test]
fn test_scalar_ambiguity_first_registered_wins() {
    // The bare literal `1` satisfies both the integer and the float shape;
    // the tie must go to the first-registered handler, deterministically.
    let int_first = Arc::new(HandlerRegistry::new());
    int_first
        .register([
            handler(|_ctx: &InvocationContext, n: i64| Ok(json!({"kind": "int", "value": n}))),
            handler(|_ctx: &InvocationContext, x: f64| Ok(json!({"kind": "float", "value": x}))),
        ])
        .expect("register");
    let dispatcher = PayloadDispatcher::with_telemetry(int_first, Arc::new(NoopTelemetry));
    for _ in 0..100 {
        let resp = dispatch_json(&dispatcher, b"1");
        assert_eq!(resp["kind"], "int");
    }

    let float_first = Arc::new(HandlerRegistry::new());
    float_first
        .register([
            handler(|_ctx: &InvocationContext, x: f64| Ok(json!({"kind": "float", "value": x}))),
            handler(|_ctx: &InvocationContext, n: i64| Ok(json!({"kind": "int", "value": n}))),
        ])
        .expect("register");
    let dispatcher = PayloadDispatcher::with_telemetry(float_first, Arc::new(NoopTelemetry));
    for _ in 0..100 {
        let resp = dispatch_json(&dispatcher, b"1");
        assert_eq!(resp["kind"], "float");
    }
}

#[test]
fn test_empty_registry_never_matches() {
    let registry = Arc::new(HandlerRegistry::new());
    let dispatcher = PayloadDispatcher::new(registry);
    let ctx = InvocationContext::new();
    for payload in [&br#"{"v":"test"}"#[..], b"1", br#""text""#] {
        let err = dispatcher.dispatch(&ctx, payload).expect_err("no handlers");
        assert!(matches!(err, DispatchError::NoHandlerMatched));
    }
}

#[derive(Debug)]
struct BillingError;

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "billing backend unavailable")
    }
}

impl std::error::Error for BillingError {}

#[test]
fn test_handler_error_is_final_and_verbatim() {
    let _tracing = common::init_tracing();
    let float_invoked = Arc::new(AtomicBool::new(false));
    let float_invoked_probe = Arc::clone(&float_invoked);

    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([
            handler(|_ctx: &InvocationContext, _n: i64| -> Result<Value, anyhow::Error> {
                Err(anyhow::Error::new(BillingError))
            }),
            handler(move |_ctx: &InvocationContext, x: f64| {
                float_invoked_probe.store(true, Ordering::SeqCst);
                Ok(json!({"kind": "float", "value": x}))
            }),
        ])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);

    let ctx = InvocationContext::new();
    let err = dispatcher.dispatch(&ctx, b"1").expect_err("handler error");
    match err {
        DispatchError::Handler(inner) => {
            // The caller gets the handler's own error back, not a rewrap.
            assert!(inner.downcast_ref::<BillingError>().is_some());
        }
        other => panic!("expected handler error, got {other:?}"),
    }
    // The float shape would also have decoded `1`, but a matched handler's
    // outcome is final: no further binding may be attempted.
    assert!(!float_invoked.load(Ordering::SeqCst));
}

#[derive(Debug, Deserialize, Serialize)]
struct Narrow {
    a: i64,
}

#[derive(Debug, Deserialize, Serialize)]
struct Wide {
    a: i64,
    b: i64,
}

#[test]
fn test_strict_decode_rejects_unknown_fields() {
    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([handler(|_ctx: &InvocationContext, ev: Narrow| {
            Ok(json!({"kind": "narrow", "a": ev.a}))
        })])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(Arc::clone(&registry));

    // `{"a":1,"b":2}` decodes permissively into Narrow by ignoring `b`; the
    // strict trial decode must treat the extra field as a non-match.
    let ctx = InvocationContext::new();
    let err = dispatcher
        .dispatch(&ctx, br#"{"a": 1, "b": 2}"#)
        .expect_err("unknown field must disqualify the narrow shape");
    assert!(matches!(err, DispatchError::NoHandlerMatched));

    // Once the exact shape is registered, the same payload routes to it.
    registry
        .register([handler(|_ctx: &InvocationContext, ev: Wide| {
            Ok(json!({"kind": "wide", "a": ev.a, "b": ev.b}))
        })])
        .expect("register wide");
    let resp = dispatch_json(&dispatcher, br#"{"a": 1, "b": 2}"#);
    assert_eq!(resp, json!({"kind": "wide", "a": 1, "b": 2}));
}

#[test]
fn test_trailing_garbage_never_matches() {
    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([handler(|_ctx: &InvocationContext, n: i64| Ok(n))])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);
    let ctx = InvocationContext::new();
    let err = dispatcher.dispatch(&ctx, b"1 trailing").expect_err("garbage");
    assert!(matches!(err, DispatchError::NoHandlerMatched));
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("value cannot be encoded"))
    }
}

#[test]
fn test_response_encoding_failure_is_serialization_error() {
    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([handler(|_ctx: &InvocationContext, _n: i64| Ok(Unencodable))])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);
    let ctx = InvocationContext::new();
    let err = dispatcher.dispatch(&ctx, b"1").expect_err("encode failure");
    assert!(matches!(err, DispatchError::Serialization(_)));
}

#[derive(Debug, Deserialize, Serialize)]
struct Probe {
    ask: String,
}

#[test]
fn test_context_reaches_handler_unmodified() {
    let registry = Arc::new(HandlerRegistry::new());
    registry
        .register([handler(|ctx: &InvocationContext, _ev: Probe| {
            Ok(json!({
                "correlation_id": ctx.correlation_id().to_string(),
                "tenant": ctx.value("tenant"),
                "cancelled": ctx.is_cancelled(),
            }))
        })])
        .expect("register");
    let dispatcher = PayloadDispatcher::new(registry);

    let correlation_id = CorrelationId::new();
    let ctx = InvocationContext::new()
        .with_correlation_id(correlation_id)
        .with_value("tenant", "acme");
    ctx.cancel_handle().cancel();

    let bytes = dispatcher
        .dispatch(&ctx, br#"{"ask": "who am i"}"#)
        .expect("dispatch");
    let resp: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(resp["correlation_id"], correlation_id.to_string());
    assert_eq!(resp["tenant"], "acme");
    assert_eq!(resp["cancelled"], true);
}

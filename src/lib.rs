//! # typeroute
//!
//! **typeroute** is a payload-shape-directed event dispatcher for serverless
//! invocations: given one opaque JSON payload and no route key, it determines
//! which of several independently-registered, strongly-typed handlers the
//! payload is meant for, invokes it, and returns the serialized result.
//!
//! ## Overview
//!
//! Serverless runtimes deliver a single event payload per invocation. When
//! one function serves several event sources (bucket notifications, queue
//! messages, scheduled ticks), nothing in the payload names its handler —
//! the shape of the payload is the only routing information available.
//! typeroute turns that shape into the route:
//!
//! 1. Handlers are registered at startup as typed functions
//!    `Fn(&InvocationContext, T) -> Result<R, anyhow::Error>`; the event
//!    type `T` becomes the handler's [`ShapeDescriptor`].
//! 2. Per invocation, the dispatcher trial-decodes the payload against every
//!    registered shape, in registration order, with strict decoding that
//!    rejects unknown fields.
//! 3. The first shape that decodes wins. Its handler runs synchronously with
//!    the caller's context, and its return value is serialized back as the
//!    response.
//!
//! ## Architecture
//!
//! - **[`validator`]** - registration-time signature validation, typed
//!   candidate construction, shape descriptors
//! - **[`registry`]** - ordered, append-only binding registry with lock-free
//!   snapshot reads
//! - **[`dispatcher`]** - the trial-decode dispatch loop
//! - **[`context`]** - per-invocation context (correlation id, deadline,
//!   cancellation, value propagation)
//! - **[`telemetry`]** - injectable span lifecycle around dispatch calls
//! - **[`ids`]** - ULID-backed correlation identifiers
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use typeroute::{handler, HandlerRegistry, InvocationContext, PayloadDispatcher};
//!
//! #[derive(Deserialize)]
//! struct ObjectCreated {
//!     bucket: String,
//!     key: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Ack {
//!     stored: String,
//! }
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register([handler(|_ctx: &InvocationContext, ev: ObjectCreated| {
//!     Ok(Ack { stored: format!("{}/{}", ev.bucket, ev.key) })
//! })])?;
//!
//! let dispatcher = PayloadDispatcher::new(registry);
//! let ctx = InvocationContext::new();
//! let response = dispatcher.dispatch(&ctx, br#"{"bucket":"logs","key":"2026/08/23.gz"}"#)?;
//! assert_eq!(response, br#"{"stored":"logs/2026/08/23.gz"}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Matching and Ambiguity
//!
//! Strict decoding keeps record shapes apart, but scalar shapes overlap by
//! construction: the literal `1` is a valid `i64` and a valid `f64`. Ties go
//! to the first-registered handler — trial order is registration order, so
//! dispatch outcomes are reproducible across runs. Register the most
//! specific shapes first.
//!
//! ## Concurrency
//!
//! Any number of threads may dispatch concurrently; registry reads are
//! lock-free snapshot loads (`arc-swap`). Registration batches serialize on
//! a writer mutex and publish complete snapshots, so a concurrent dispatch
//! never observes a partially-inserted binding. The intended lifecycle is
//! still register-then-serve: populate the registry during process startup,
//! before the runtime delivers the first invocation.
//!
//! ## Scope
//!
//! typeroute is not an RPC framework and not a schema registry. It supports
//! no explicit route keys or priorities and no handler unregistration. Retry
//! policy, if any, belongs to the caller.

pub mod context;
pub mod dispatcher;
pub mod ids;
pub mod registry;
pub mod telemetry;
pub mod validator;

pub use context::{CancelHandle, InvocationContext};
pub use dispatcher::{DispatchError, PayloadDispatcher};
pub use ids::CorrelationId;
pub use registry::{HandlerBinding, HandlerRegistry};
pub use telemetry::{NoopTelemetry, Telemetry, TracingTelemetry};
pub use validator::{handler, validate, Candidate, RegisterError, ShapeDescriptor, Signature};

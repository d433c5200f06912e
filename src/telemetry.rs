//! Telemetry capability for the dispatcher.
//!
//! The dispatcher never touches ambient global telemetry state; the
//! capability is injected at construction. The default implementation opens
//! a `tracing` span per dispatch with the invocation's correlation id
//! recorded; embedders that export spans (OTLP, X-Ray, ...) do so by
//! installing their own `tracing` subscriber or by providing their own
//! [`Telemetry`] implementation. Error logging stays with the embedding
//! application — the core returns every error to its caller.

use crate::context::InvocationContext;
use tracing::{info_span, Span};

/// Span lifecycle around a dispatch call.
pub trait Telemetry: Send + Sync {
    /// Open the span covering one dispatch. The dispatcher enters it for the
    /// duration of the trial-decode loop and the handler invocation.
    fn dispatch_span(&self, ctx: &InvocationContext) -> Span;
}

/// Default telemetry: a `tracing` span named `dispatch` carrying the
/// correlation id.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn dispatch_span(&self, ctx: &InvocationContext) -> Span {
        info_span!("dispatch", correlation_id = %ctx.correlation_id())
    }
}

/// Telemetry that records nothing. Useful in benchmarks and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn dispatch_span(&self, _ctx: &InvocationContext) -> Span {
        Span::none()
    }
}

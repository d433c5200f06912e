//! Dispatcher core - hot path for payload dispatch.

use crate::context::InvocationContext;
use crate::registry::HandlerRegistry;
use crate::telemetry::{Telemetry, TracingTelemetry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Dispatch failure.
///
/// Every error is returned to the caller of [`PayloadDispatcher::dispatch`];
/// the core never logs-and-swallows and never retries.
#[derive(Debug)]
pub enum DispatchError {
    /// No registered shape accepted the payload. A configuration or
    /// input-shape mismatch; recoverable by caller action.
    NoHandlerMatched,
    /// The matched handler failed. Carried verbatim, business-logic level.
    Handler(anyhow::Error),
    /// The handler's return value could not be encoded. An internal defect.
    Serialization(serde_json::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoHandlerMatched => {
                write!(f, "no registered handler shape matched the payload")
            }
            DispatchError::Handler(err) => write!(f, "handler failed: {err}"),
            DispatchError::Serialization(err) => {
                write!(f, "failed to encode handler response: {err}")
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::NoHandlerMatched => None,
            DispatchError::Handler(err) => {
                let source: &(dyn std::error::Error + Send + Sync + 'static) = err.as_ref();
                Some(source)
            }
            DispatchError::Serialization(err) => Some(err),
        }
    }
}

/// Dispatches one opaque payload per call to the first registered handler
/// whose event shape decodes it.
///
/// The dispatcher itself is stateless; it holds the shared registry and the
/// telemetry capability injected at construction.
pub struct PayloadDispatcher {
    registry: Arc<HandlerRegistry>,
    telemetry: Arc<dyn Telemetry>,
}

impl PayloadDispatcher {
    /// Create a dispatcher over `registry` with the default `tracing`-backed
    /// telemetry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_telemetry(registry, Arc::new(TracingTelemetry))
    }

    /// Create a dispatcher with an explicit telemetry capability.
    pub fn with_telemetry(registry: Arc<HandlerRegistry>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            registry,
            telemetry,
        }
    }

    /// Dispatch one payload: trial-decode against every binding in
    /// registration order, invoke the first match, return its serialized
    /// result.
    ///
    /// The caller-supplied context is passed to the handler unmodified; the
    /// dispatcher imposes no timeout of its own and does not cancel a
    /// running handler.
    pub fn dispatch(
        &self,
        ctx: &InvocationContext,
        payload: &[u8],
    ) -> Result<Vec<u8>, DispatchError> {
        let span = self.telemetry.dispatch_span(ctx);
        let _entered = span.enter();

        let bindings = self.registry.snapshot();
        debug!(
            candidate_bindings = bindings.len(),
            payload_len = payload.len(),
            "Trial decode start"
        );

        for binding in bindings.iter() {
            let Some(event) = binding.try_decode(payload) else {
                debug!(shape = %binding.descriptor(), "Shape did not match");
                continue;
            };

            info!(
                correlation_id = %ctx.correlation_id(),
                shape = %binding.descriptor(),
                "Payload matched shape, invoking handler"
            );
            // First successful decode wins; the handler's outcome is final.
            return binding.invoke(ctx, event);
        }

        debug!(
            correlation_id = %ctx.correlation_id(),
            candidate_bindings = bindings.len(),
            "No binding matched payload"
        );
        Err(DispatchError::NoHandlerMatched)
    }
}

impl fmt::Debug for PayloadDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

//! Invocation context passed through to handlers.
//!
//! The dispatcher interprets nothing in the context: it records the
//! correlation id on its dispatch span and hands the context to the matched
//! handler unmodified. Deadlines and cancellation are cooperative — the
//! dispatcher never preempts a running handler.

use crate::ids::CorrelationId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-invocation context: correlation id, optional deadline, cooperative
/// cancellation, and string-keyed value propagation.
///
/// Telemetry layers upstream of the dispatcher may annotate the context
/// (correlation id, tenant, trace baggage); those annotations travel to the
/// handler as-is.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    correlation_id: CorrelationId,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    values: HashMap<String, String>,
}

impl InvocationContext {
    /// Create a context with a freshly generated correlation id and no
    /// deadline.
    pub fn new() -> Self {
        Self {
            correlation_id: CorrelationId::new(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            values: HashMap::new(),
        }
    }

    /// Replace the correlation id (typically parsed from a runtime
    /// annotation, see [`CorrelationId::from_annotation_or_new`]).
    pub fn with_correlation_id(mut self, id: CorrelationId) -> Self {
        self.correlation_id = id;
        self
    }

    /// Set the invocation deadline. Handlers are expected to check
    /// [`deadline`](Self::deadline) themselves for long-running work.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a propagated value (tenant id, trace baggage, ...).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Look up a propagated value by key.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the invocation has been cancelled by its owner.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Obtain a handle that can cancel this invocation from another thread.
    ///
    /// Clones of the context share the same cancellation flag.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle used by the invocation owner to signal cancellation.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
}

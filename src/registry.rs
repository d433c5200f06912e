//! Handler registry: validated bindings in registration order.
//!
//! The registry is written rarely (process startup) and read on every
//! dispatch, so reads go through an [`arc_swap::ArcSwap`] snapshot and never
//! take a lock. Writers serialize on a mutex and publish a fresh, complete
//! binding vector after every insert — a concurrent dispatch sees either the
//! pre-insert or the post-insert snapshot, never a torn one.

use crate::context::InvocationContext;
use crate::dispatcher::DispatchError;
use crate::validator::{validate, Candidate, RegisterError, ShapeDescriptor};
use arc_swap::ArcSwap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// An event value produced by a binding's decode step, opaque to everything
/// but the paired invoke step.
pub struct DecodedEvent(Box<dyn Any + Send>);

impl DecodedEvent {
    pub(crate) fn new(value: Box<dyn Any + Send>) -> Self {
        Self(value)
    }

    pub(crate) fn into_inner(self) -> Box<dyn Any + Send> {
        self.0
    }
}

type DecodeFn = Box<dyn Fn(&[u8]) -> Option<DecodedEvent> + Send + Sync>;
type InvokeFn =
    Box<dyn Fn(&InvocationContext, DecodedEvent) -> Result<Vec<u8>, DispatchError> + Send + Sync>;

/// Immutable triple binding one event shape to its decode and invoke
/// behavior. Exactly one binding may exist per shape in a given registry,
/// and a binding lives for the registry's entire lifetime.
pub struct HandlerBinding {
    descriptor: ShapeDescriptor,
    decode: DecodeFn,
    invoke: InvokeFn,
}

impl HandlerBinding {
    /// Assemble a binding from its parts. Rust handlers should go through
    /// [`handler`](crate::validator::handler); this constructor is the seam
    /// for erased handler sources.
    pub fn new(descriptor: ShapeDescriptor, decode: DecodeFn, invoke: InvokeFn) -> Self {
        Self {
            descriptor,
            decode,
            invoke,
        }
    }

    pub fn descriptor(&self) -> ShapeDescriptor {
        self.descriptor
    }

    /// Trial-decode the payload against this binding's shape. `None` means
    /// "no match", never an error.
    pub(crate) fn try_decode(&self, payload: &[u8]) -> Option<DecodedEvent> {
        (self.decode)(payload)
    }

    /// Invoke the handler with an event this binding decoded.
    pub(crate) fn invoke(
        &self,
        ctx: &InvocationContext,
        event: DecodedEvent,
    ) -> Result<Vec<u8>, DispatchError> {
        (self.invoke)(ctx, event)
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("shape", &self.descriptor)
            .finish()
    }
}

/// Registry of validated handler bindings, ordered by registration.
///
/// Append-only: bindings are never removed or replaced, and registry state
/// never regresses. Trial order during dispatch is registration order, which
/// makes first-registered-wins the disambiguation rule for payloads that
/// satisfy more than one shape.
pub struct HandlerRegistry {
    bindings: ArcSwap<Vec<Arc<HandlerBinding>>>,
    write_lock: Mutex<()>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: ArcSwap::from_pointee(Vec::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Validate and insert a batch of candidates, in order, under mutual
    /// exclusion with other registrations.
    ///
    /// Registration is **not** transactional across a batch: if validation
    /// fails partway through, candidates already inserted earlier in the same
    /// call stay committed. This reproduces the behavior embedders depend on;
    /// callers wanting all-or-nothing semantics should validate shapes in a
    /// dry batch first.
    ///
    /// Each insert publishes a complete snapshot, so concurrent dispatches
    /// never observe a partially-inserted binding.
    pub fn register<I>(&self, candidates: I) -> Result<(), RegisterError>
    where
        I: IntoIterator<Item = Candidate>,
    {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for candidate in candidates {
            let binding = validate(candidate)?;
            let descriptor = binding.descriptor();
            let current = self.bindings.load();
            if current.iter().any(|b| b.descriptor() == descriptor) {
                return Err(RegisterError::AlreadyRegistered(descriptor));
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::new(binding));
            let total = next.len();
            self.bindings.store(Arc::new(next));
            info!(
                shape = %descriptor,
                total_bindings = total,
                "Handler registered successfully"
            );
        }
        Ok(())
    }

    /// Point-in-time view of all bindings, in registration order.
    pub fn snapshot(&self) -> Arc<Vec<Arc<HandlerBinding>>> {
        self.bindings.load_full()
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.load().is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shapes: Vec<ShapeDescriptor> =
            self.bindings.load().iter().map(|b| b.descriptor()).collect();
        f.debug_struct("HandlerRegistry")
            .field("bindings", &shapes)
            .finish()
    }
}

//! Registration-time signature validation.
//!
//! Every handler enters the registry as a [`Candidate`]: a declared callable
//! shape (the [`Signature`]) paired with the typed decode/invoke closures
//! that will service dispatch. [`validate`] checks the declared shape against
//! the fixed two-argument/two-return handler contract and releases the
//! binding only when every check passes.
//!
//! Handlers written in Rust go through [`handler`], which produces a
//! conforming signature by construction. The erased path
//! ([`Candidate::from_parts`]) exists for handlers surfaced through generated
//! glue or FFI, where the shape is only known dynamically — that is the path
//! on which the individual checks can actually fail.

use crate::context::InvocationContext;
use crate::dispatcher::DispatchError;
use crate::registry::{DecodedEvent, HandlerBinding};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::fmt;

/// Opaque, comparable identifier for one concrete event shape.
///
/// Derived from the handler's declared event-parameter type. Two handlers
/// declaring the same concrete event type map to the same descriptor; two
/// nominally distinct types are distinct shapes even when their fields agree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ShapeDescriptor {
    type_id: TypeId,
    type_name: &'static str,
}

impl ShapeDescriptor {
    /// Descriptor for the concrete event type `T`.
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable type name, for diagnostics only. Not stable across
    /// compiler versions; never use it as a key.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for ShapeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Declared callable shape of a candidate handler.
///
/// In the typed path this is always [`Signature::conforming`]: a Rust
/// handler `Fn(&InvocationContext, T) -> Result<R, anyhow::Error>` has two
/// inputs, a context-capable first argument, and its `Result` return counts
/// as the two outputs of the contract with an error-like second output.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Signature {
    /// Whether the candidate is callable at all.
    pub callable: bool,
    /// Number of declared inputs.
    pub input_arity: usize,
    /// Whether the first input satisfies the context capability
    /// (cancellation + value propagation).
    pub first_arg_context: bool,
    /// Number of declared outputs.
    pub output_arity: usize,
    /// Whether the last output satisfies the error capability.
    pub last_return_error: bool,
}

impl Signature {
    /// The signature every handler built through [`handler`] carries.
    pub fn conforming() -> Self {
        Self {
            callable: true,
            input_arity: 2,
            first_arg_context: true,
            output_arity: 2,
            last_return_error: true,
        }
    }
}

/// A handler candidate awaiting validation: declared signature plus the
/// binding that dispatch will use once the signature is accepted.
pub struct Candidate {
    signature: Signature,
    binding: HandlerBinding,
}

impl Candidate {
    /// Build a candidate from an explicitly declared signature and a
    /// pre-assembled binding.
    ///
    /// Used when handlers arrive through erased glue (code generation, FFI)
    /// and the shape is only known at runtime. Rust handlers should use
    /// [`handler`] instead, which cannot produce an invalid signature.
    pub fn from_parts(signature: Signature, binding: HandlerBinding) -> Self {
        Self { signature, binding }
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Descriptor of the event shape this candidate would bind.
    pub fn descriptor(&self) -> ShapeDescriptor {
        self.binding.descriptor()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("signature", &self.signature)
            .field("shape", &self.binding.descriptor())
            .finish()
    }
}

/// Registration failure. All variants are permanent caller errors; none is
/// ever retried by the core.
#[derive(Debug)]
pub enum RegisterError {
    /// The candidate is not callable.
    NotCallable,
    /// The candidate does not accept exactly two inputs.
    BadInputArity {
        /// Number of inputs the candidate declared.
        found: usize,
    },
    /// The first input does not satisfy the context capability.
    FirstArgNotContext,
    /// The candidate does not return exactly two outputs.
    BadOutputArity {
        /// Number of outputs the candidate declared.
        found: usize,
    },
    /// The last output does not satisfy the error capability.
    LastReturnNotError,
    /// A binding for this event shape already exists in the registry.
    AlreadyRegistered(ShapeDescriptor),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::NotCallable => write!(f, "handler candidate is not callable"),
            RegisterError::BadInputArity { found } => write!(
                f,
                "handler must accept exactly two inputs (context, event); found {found}"
            ),
            RegisterError::FirstArgNotContext => write!(
                f,
                "handler's first input must be context-capable (cancellation + value propagation)"
            ),
            RegisterError::BadOutputArity { found } => write!(
                f,
                "handler must return exactly two outputs (value, error); found {found}"
            ),
            RegisterError::LastReturnNotError => {
                write!(f, "handler's last return value must be error-capable")
            }
            RegisterError::AlreadyRegistered(shape) => {
                write!(f, "a handler for event shape '{shape}' is already registered")
            }
        }
    }
}

impl std::error::Error for RegisterError {}

/// Validate a candidate against the handler contract.
///
/// Checks run in a fixed order, each yielding its own [`RegisterError`]
/// variant so callers can branch on the failure kind:
///
/// 1. callable
/// 2. exactly two inputs
/// 3. first input context-capable
/// 4. exactly two outputs
/// 5. last output error-capable
///
/// The duplicate-shape check ([`RegisterError::AlreadyRegistered`]) needs
/// registry state and is performed by
/// [`HandlerRegistry::register`](crate::registry::HandlerRegistry::register)
/// under its write lock.
pub fn validate(candidate: Candidate) -> Result<HandlerBinding, RegisterError> {
    let sig = candidate.signature;
    if !sig.callable {
        return Err(RegisterError::NotCallable);
    }
    if sig.input_arity != 2 {
        return Err(RegisterError::BadInputArity {
            found: sig.input_arity,
        });
    }
    if !sig.first_arg_context {
        return Err(RegisterError::FirstArgNotContext);
    }
    if sig.output_arity != 2 {
        return Err(RegisterError::BadOutputArity {
            found: sig.output_arity,
        });
    }
    if !sig.last_return_error {
        return Err(RegisterError::LastReturnNotError);
    }
    Ok(candidate.binding)
}

/// Wrap a typed handler function into a registration [`Candidate`].
///
/// The event type `T` determines the candidate's [`ShapeDescriptor`]; the
/// returned candidate carries the monomorphized decode and invoke closures
/// for that shape. The handler's error is carried verbatim through dispatch
/// as [`DispatchError::Handler`].
///
/// ```
/// use serde::Deserialize;
/// use typeroute::{handler, InvocationContext};
///
/// #[derive(Deserialize)]
/// struct Ping { seq: u64 }
///
/// let candidate = handler(|_ctx: &InvocationContext, ev: Ping| Ok(ev.seq));
/// assert!(candidate.signature() == typeroute::Signature::conforming());
/// ```
pub fn handler<T, R, F>(f: F) -> Candidate
where
    T: DeserializeOwned + Send + 'static,
    R: Serialize + 'static,
    F: Fn(&InvocationContext, T) -> Result<R, anyhow::Error> + Send + Sync + 'static,
{
    let decode = Box::new(|payload: &[u8]| {
        strict_decode::<T>(payload).map(|event| DecodedEvent::new(Box::new(event)))
    });
    let invoke = Box::new(
        move |ctx: &InvocationContext, event: DecodedEvent| -> Result<Vec<u8>, DispatchError> {
            let event = match event.into_inner().downcast::<T>() {
                Ok(event) => *event,
                // decode and invoke are built as a pair from the same T; a
                // mismatch cannot arise through the registry
                Err(_) => {
                    return Err(DispatchError::Handler(anyhow::anyhow!(
                        "decoded event does not match shape {}",
                        std::any::type_name::<T>()
                    )))
                }
            };
            let output = f(ctx, event).map_err(DispatchError::Handler)?;
            serde_json::to_vec(&output).map_err(DispatchError::Serialization)
        },
    );
    Candidate::from_parts(
        Signature::conforming(),
        HandlerBinding::new(ShapeDescriptor::of::<T>(), decode, invoke),
    )
}

/// Strict trial decode: parse `payload` as `T`, rejecting unknown fields and
/// trailing input. `None` means "this shape does not match", never an error.
pub(crate) fn strict_decode<T: DeserializeOwned>(payload: &[u8]) -> Option<T> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut de = serde_json::Deserializer::from_str(text);
    let mut ignored = false;
    let value: T = serde_ignored::deserialize(&mut de, |_path| ignored = true).ok()?;
    de.end().ok()?;
    (!ignored).then_some(value)
}

//! # Dispatcher Module
//!
//! Trial-decode dispatch of opaque invocation payloads to registered typed
//! handlers.
//!
//! ## Overview
//!
//! The dispatcher is the core of typeroute. A serverless invocation delivers
//! one opaque JSON payload with no route key; the dispatcher:
//! - takes a point-in-time snapshot of the handler registry
//! - trial-decodes the payload against every binding, in registration order,
//!   with strict decoding that rejects unknown fields
//! - invokes the first binding whose decode succeeds
//! - serializes the handler's return value as the response
//!
//! ## Matching Rules
//!
//! - A decode failure is "no match", never an error; the loop continues.
//! - Strict decoding keeps record shapes apart (an object with fields
//!   `{a, b}` never satisfies a handler expecting `{c, d}`), but cannot
//!   disambiguate scalars: the literal `1` is both a valid integer and a
//!   valid float. Such ties go to the first-registered handler.
//! - A matched handler's outcome is final. Its error is returned verbatim;
//!   no later binding is attempted even if it would also have decoded.
//!
//! ## Concurrency
//!
//! The dispatcher is stateless and may be called from any number of threads.
//! Registry reads are lock-free snapshot loads; registration may proceed
//! concurrently without dispatch ever observing a half-inserted binding.
//! The only blocking operation inside a dispatch is the handler itself; the
//! dispatcher imposes no timeout and passes the caller's context through so
//! the handler can observe cancellation and deadline.

mod core;

pub use core::{DispatchError, PayloadDispatcher};

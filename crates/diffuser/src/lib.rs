#![forbid(unsafe_code)]

//! Change-gated effect sinks and disposable event streams.
//!
//! This crate provides two small composition algebras for one-directional
//! reactive dataflow:
//!
//! - [`Diffuser`]: a change-gated sink. [`run`](Diffuser::run) forwards a
//!   value to a side-effecting function only when the value differs from the
//!   last one observed, or per a caller-supplied policy.
//! - [`Fuser`]: a composable event stream. It wraps a [`Source`] of events,
//!   supports merging and per-event transformation, and hands out a
//!   [`Disposable`] per connection.
//!
//! The two are independent algebras over the same capability primitives.
//! Applications typically wire a Fuser's output (via
//! [`connect`](Fuser::connect)) into a Diffuser's input (via
//! [`run`](Diffuser::run)), but neither type depends on the other.
//!
//! # Delivery model
//!
//! All delivery is synchronous on the caller's thread. There is no scheduler,
//! no backpressure, and no stream algebra beyond merge and transform:
//! these types aggregate UI-style events and terminate UI-style updates,
//! and any richer interpretation of events belongs outside them.
//!
//! # Concurrency
//!
//! `run` is mutually exclusive per [`Diffuser`] instance; concurrent callers
//! serialize. Each [`Fuser`] connection carries an atomic disposed flag that
//! cuts off delivery after disposal (best-effort: a delivery already in
//! flight on another thread may still complete). See the module docs of
//! [`diffuser`] and [`fuser`] for the exact contracts.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use diffuser::{BoxEffect, Diffuser, Disposable, Effect, Fuser};
//!
//! // A sink that only reacts to changes.
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = {
//!     let seen = Arc::clone(&seen);
//!     Diffuser::into(move |value: &i32| seen.lock().unwrap().push(*value))
//! };
//! sink.run(&1);
//! sink.run(&1); // gated: unchanged
//! sink.run(&2);
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//!
//! // A stream that delivers events into that sink.
//! let stream = Fuser::from_fn(|effect: BoxEffect<i32>| {
//!     effect.run(&2); // still gated: the sink last saw 2
//!     effect.run(&3);
//!     Disposable::noop()
//! });
//! let connection = stream.connect(sink.into_effect());
//! connection.dispose();
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
//! ```

pub mod diffuser;
pub mod disposable;
pub mod effect;
pub mod fuser;
pub mod source;

#[cfg(feature = "tracing")]
pub mod logging;

pub use diffuser::Diffuser;
pub use disposable::Disposable;
pub use effect::Effect;
pub use fuser::Fuser;
pub use source::{BoxEffect, Source};

// No-op logging macros used when the `tracing` feature is disabled. Call
// sites import these as `use crate::trace;` so the code reads the same in
// both configurations.

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

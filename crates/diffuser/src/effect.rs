#![forbid(unsafe_code)]

//! The `Effect` capability: a single-argument side-effecting procedure.
//!
//! Effects are the delivery boundary of this crate. A
//! [`Diffuser`](crate::Diffuser) terminates into one, and every
//! [`Fuser`](crate::Fuser) connection forwards events into one. Any closure
//! of shape `Fn(&A) + Send + Sync` is an effect; platform sinks are written
//! as closures capturing whatever handle they update.
//!
//! Values are handed to effects by reference: the caller retains ownership,
//! so one value can be offered to many sinks during a merge and recorded in
//! a gate cache without moving.

/// A side-effecting procedure over values of type `A`.
///
/// Implemented for every `Fn(&A) + Send + Sync` closure. A
/// [`Diffuser`](crate::Diffuser) can stand in wherever an effect is
/// expected via [`Diffuser::into_effect`](crate::Diffuser::into_effect).
pub trait Effect<A>: Send + Sync {
    /// Perform the side effect for one value.
    fn run(&self, value: &A);
}

impl<A, F> Effect<A> for F
where
    F: Fn(&A) + Send + Sync,
{
    fn run(&self, value: &A) {
        self(value)
    }
}

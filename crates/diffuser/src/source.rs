#![forbid(unsafe_code)]

//! The `Source` capability: the raw ability to produce events.
//!
//! A source is given a sink and starts emitting into it; it returns a
//! [`Disposable`] that stops the emission. Platform collaborators (widget
//! callbacks, timers, adapters) implement this trait to originate events;
//! [`Fuser::from`](crate::Fuser::from) wraps any source into a composable
//! stream.
//!
//! The core imposes no threading model on sources: events may be emitted
//! from any thread, at any rate, and are always delivered synchronously on
//! the emitting thread.

use crate::disposable::Disposable;
use crate::effect::Effect;

/// A boxed sink, as handed to a [`Source`] on connection.
pub type BoxEffect<A> = Box<dyn Effect<A>>;

/// Something that produces events of type `A` on demand.
pub trait Source<A>: Send + Sync {
    /// Start emitting events into `effect`.
    ///
    /// Every call starts an independent emission; the returned
    /// [`Disposable`] stops only the emission it belongs to.
    fn connect(&self, effect: BoxEffect<A>) -> Disposable;
}

/// Adapter giving closure-shaped sources a [`Source`] implementation.
///
/// Constructed via [`Fuser::from_fn`](crate::Fuser::from_fn).
pub(crate) struct FnSource<F>(pub(crate) F);

impl<A, F> Source<A> for FnSource<F>
where
    F: Fn(BoxEffect<A>) -> Disposable + Send + Sync,
{
    fn connect(&self, effect: BoxEffect<A>) -> Disposable {
        (self.0)(effect)
    }
}

#![forbid(unsafe_code)]

//! Disposable, composable event streams.
//!
//! A [`Fuser`] is a stream of events of type `A`, built from a [`Source`]
//! and composed with three families of operations:
//!
//! - [`from`](Fuser::from) / [`from_fn`](Fuser::from_fn): wrap something
//!   which produces events.
//! - [`from_all`](Fuser::from_all): merge multiple fusers into one, with one
//!   connection and one disposal point for the whole group.
//! - [`extract`](Fuser::extract) / [`extract_constant`](Fuser::extract_constant)
//!   / [`extract_unless_none`](Fuser::extract_unless_none): transform every
//!   emitted event.
//!
//! Once constructed, [`connect`](Fuser::connect) starts listening and
//! returns a [`Disposable`] which stops it again.
//!
//! There are deliberately no other combinators (no `filter`, `reduce`, or
//! `flat_map`): a fuser aggregates UI-style events at the edge of an
//! application, and `extract` exists to convert edge types into domain
//! types. Any further interpretation of events belongs outside the stream.
//!
//! # Invariants
//!
//! 1. Every `connect` call starts an independent subscription with its own
//!    disposed flag; disposing one never affects another.
//! 2. After `dispose` returns, no further event reaches the connected
//!    effect. A delivery already past the flag check on another thread may
//!    still complete (best-effort cutoff, not a strict barrier).
//! 3. Connecting a merged fuser connects every child in order; disposing
//!    the merged connection disposes every child in order, exactly once.
//! 4. A merged fuser reflects exactly the children given at construction;
//!    the child list is taken by value and never changes afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::disposable::Disposable;
use crate::effect::Effect;
use crate::source::{BoxEffect, FnSource, Source};

#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

/// A composable, disposable stream of events of type `A`.
///
/// Cloning a `Fuser` is cheap and yields a handle to the **same** underlying
/// source; each clone's [`connect`](Self::connect) still creates an
/// independent subscription.
pub struct Fuser<A> {
    source: Arc<dyn Source<A>>,
}

impl<A> Clone for Fuser<A> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<A> std::fmt::Debug for Fuser<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fuser").finish_non_exhaustive()
    }
}

impl<A: 'static> Fuser<A> {
    /// Create a fuser from a [`Source`].
    #[allow(clippy::should_implement_trait)]
    pub fn from(source: impl Source<A> + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    /// Create a fuser from a closure-shaped source: a function which is
    /// given the sink for one subscription and returns the [`Disposable`]
    /// that ends it.
    pub fn from_fn(
        source: impl Fn(BoxEffect<A>) -> Disposable + Send + Sync + 'static,
    ) -> Self {
        Self::from(FnSource(source))
    }

    /// Merge a list of fusers of the same type.
    ///
    /// The merged fuser emits every event emitted by its children.
    /// Connecting it connects all of the children, in order, and disposing
    /// that connection disposes all child connections, in order. The
    /// children are taken by value: nothing the caller does afterwards can
    /// change the merged set.
    pub fn from_all(children: Vec<Fuser<A>>) -> Self {
        Self::from_fn(move |effect: BoxEffect<A>| {
            let shared: Arc<dyn Effect<A>> = Arc::from(effect);
            let disposables = children
                .iter()
                .map(|child| {
                    let shared = Arc::clone(&shared);
                    child.connect(move |value: &A| shared.run(value))
                })
                .collect();
            Disposable::from_all(disposables)
        })
    }

    /// Apply a function to every event emitted by `fuser`.
    pub fn extract<B: 'static>(
        transform: impl Fn(&A) -> B + Send + Sync + 'static,
        fuser: Fuser<A>,
    ) -> Fuser<B> {
        let transform = Arc::new(transform);
        Fuser::from_fn(move |dispatch: BoxEffect<B>| {
            let transform = Arc::clone(&transform);
            fuser.connect(move |value: &A| {
                let produced = (*transform)(value);
                dispatch.run(&produced);
            })
        })
    }

    /// Emit a fixed value for every event emitted by `fuser`, preserving
    /// the emission cadence.
    pub fn extract_constant<B>(constant: B, fuser: Fuser<A>) -> Fuser<B>
    where
        B: Send + Sync + 'static,
    {
        let constant = Arc::new(constant);
        Fuser::from_fn(move |dispatch: BoxEffect<B>| {
            let constant = Arc::clone(&constant);
            fuser.connect(move |_: &A| dispatch.run(&constant))
        })
    }

    /// Apply a function to every event emitted by `fuser`, dropping the
    /// event when the function yields `None`.
    ///
    /// This is the only built-in filtering primitive.
    pub fn extract_unless_none<B: 'static>(
        transform: impl Fn(&A) -> Option<B> + Send + Sync + 'static,
        fuser: Fuser<A>,
    ) -> Fuser<B> {
        let transform = Arc::new(transform);
        Fuser::from_fn(move |dispatch: BoxEffect<B>| {
            let transform = Arc::clone(&transform);
            fuser.connect(move |value: &A| {
                if let Some(produced) = (*transform)(value) {
                    dispatch.run(&produced);
                }
            })
        })
    }

    /// Start observing the events emitted by this fuser.
    ///
    /// Each call begins a new, independent subscription. The returned
    /// [`Disposable`] stops delivery for this subscription only; remember
    /// to call `dispose` on it, otherwise the subscription (and whatever
    /// the source allocated for it) lives on.
    pub fn connect(&self, effect: impl Effect<A> + 'static) -> Disposable {
        let disposed = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&disposed);
        let guarded = move |value: &A| {
            if !flag.load(Ordering::Acquire) {
                effect.run(value);
            }
        };

        trace!("fuser connect");
        let upstream = self.source.connect(Box::new(guarded));

        Disposable::new(move || {
            trace!("fuser dispose");
            disposed.store(true, Ordering::Release);
            upstream.dispose();
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Effect<i32> + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |value: &i32| seen.lock().unwrap().push(*value)
        };
        (seen, sink)
    }

    /// A source that emits a fixed burst on connection.
    fn burst(values: Vec<i32>) -> Fuser<i32> {
        Fuser::from_fn(move |effect: BoxEffect<i32>| {
            for value in &values {
                effect.run(value);
            }
            Disposable::noop()
        })
    }

    #[test]
    fn connect_delivers_in_order() {
        let (seen, sink) = recorder();
        let connection = burst(vec![1, 2, 3]).connect(sink);
        connection.dispose();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn disposed_flag_cuts_off_delivery() {
        // A source that hands its sink out so the test can emit after the
        // connection is gone.
        let slot: Arc<Mutex<Option<BoxEffect<i32>>>> = Arc::new(Mutex::new(None));
        let shared = Arc::clone(&slot);
        let fuser = Fuser::from_fn(move |effect: BoxEffect<i32>| {
            *shared.lock().unwrap() = Some(effect);
            Disposable::noop()
        });

        let (seen, sink) = recorder();
        let connection = fuser.connect(sink);

        let emit = |value: i32| {
            if let Some(effect) = slot.lock().unwrap().as_ref() {
                effect.run(&value);
            }
        };

        emit(1);
        connection.dispose();
        emit(2);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn extract_chain_composes() {
        let (seen, sink) = recorder();
        let doubled = Fuser::extract(|value: &i32| value * 2, burst(vec![1, 2]));
        let shifted = Fuser::extract(|value: &i32| value + 1, doubled);
        let connection = shifted.connect(sink);
        connection.dispose();
        assert_eq!(*seen.lock().unwrap(), vec![3, 5]);
    }

    #[test]
    fn extract_constant_preserves_cadence() {
        let (seen, sink) = recorder();
        let constant = Fuser::extract_constant(9, burst(vec![1, 2, 3]));
        let connection = constant.connect(sink);
        connection.dispose();
        assert_eq!(*seen.lock().unwrap(), vec![9, 9, 9]);
    }

    #[test]
    fn extract_unless_none_drops_events() {
        let (seen, sink) = recorder();
        let evens = Fuser::extract_unless_none(
            |value: &i32| if value % 2 == 0 { Some(*value) } else { None },
            burst(vec![1, 2, 3, 4]),
        );
        let connection = evens.connect(sink);
        connection.dispose();
        assert_eq!(*seen.lock().unwrap(), vec![2, 4]);
    }

    #[test]
    fn from_all_connects_and_emits_all_children() {
        let (seen, sink) = recorder();
        let merged = Fuser::from_all(vec![burst(vec![1]), burst(vec![2, 3])]);
        let connection = merged.connect(sink);
        connection.dispose();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn clones_share_the_source_but_not_subscriptions() {
        let (seen_a, sink_a) = recorder();
        let (seen_b, sink_b) = recorder();
        let fuser = burst(vec![5]);
        let clone = fuser.clone();

        let a = fuser.connect(sink_a);
        let b = clone.connect(sink_b);
        a.dispose();
        b.dispose();
        assert_eq!(*seen_a.lock().unwrap(), vec![5]);
        assert_eq!(*seen_b.lock().unwrap(), vec![5]);
    }
}

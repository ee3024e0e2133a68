#![forbid(unsafe_code)]

//! Deterministic event sources and recording sinks for testing diffuser
//! graphs.
//!
//! Everything here is driven explicitly from the test body: sources emit
//! when told to, sinks record what they saw, and both expose their state for
//! assertions. All types are thread-safe so the same instruments work in
//! cross-thread tests.
//!
//! - [`FanoutSource`]: multi-subscriber source; `emit` dispatches to every
//!   currently-connected sink.
//! - [`StickySource`]: single-subscriber source that keeps emitting after
//!   its connection was disposed, to exercise the post-disposal cutoff.
//! - [`LatchSource`]: emits nothing; records whether its disposable ran.
//! - [`Recorder`]: records every delivered value in order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use diffuser::{BoxEffect, Disposable, Effect, Source};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── FanoutSource ────────────────────────────────────────────────────────────

struct Registry<A> {
    next_key: u64,
    outputs: Vec<(u64, Arc<dyn Effect<A>>)>,
}

/// A source that fans every emitted value out to all currently-connected
/// sinks.
///
/// Cloning yields a handle to the same registry, so a test can hand one
/// clone to [`Fuser::from`](diffuser::Fuser::from) and keep another to call
/// [`emit`](Self::emit).
pub struct FanoutSource<A> {
    registry: Arc<Mutex<Registry<A>>>,
}

impl<A> Clone for FanoutSource<A> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<A> Default for FanoutSource<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> FanoutSource<A> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_key: 0,
                outputs: Vec::new(),
            })),
        }
    }

    /// Deliver one value to every connected sink, in connection order.
    ///
    /// The subscriber list is snapshotted before dispatch, so a sink that
    /// disposes its own connection mid-delivery does not deadlock.
    pub fn emit(&self, value: &A) {
        let snapshot: Vec<Arc<dyn Effect<A>>> = lock(&self.registry)
            .outputs
            .iter()
            .map(|(_, effect)| Arc::clone(effect))
            .collect();
        for effect in snapshot {
            effect.run(value);
        }
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        lock(&self.registry).outputs.len()
    }
}

impl<A: 'static> Source<A> for FanoutSource<A> {
    fn connect(&self, effect: BoxEffect<A>) -> Disposable {
        let key = {
            let mut registry = lock(&self.registry);
            let key = registry.next_key;
            registry.next_key += 1;
            registry.outputs.push((key, Arc::from(effect)));
            key
        };
        let registry = Arc::clone(&self.registry);
        Disposable::new(move || {
            lock(&registry).outputs.retain(|(id, _)| *id != key);
        })
    }
}

// ─── StickySource ────────────────────────────────────────────────────────────

/// A single-subscriber source that ignores disposal: it keeps its sink and
/// keeps emitting into it after the connection was disposed.
///
/// Exists to verify that the connection-level disposed flag, not the
/// source, is what cuts off delivery.
pub struct StickySource<A> {
    output: Arc<Mutex<Option<Arc<dyn Effect<A>>>>>,
    disposed: Arc<AtomicBool>,
}

impl<A> Clone for StickySource<A> {
    fn clone(&self) -> Self {
        Self {
            output: Arc::clone(&self.output),
            disposed: Arc::clone(&self.disposed),
        }
    }
}

impl<A> Default for StickySource<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> StickySource<A> {
    pub fn new() -> Self {
        Self {
            output: Arc::new(Mutex::new(None)),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deliver one value to the sink, whether or not the connection was
    /// disposed.
    pub fn emit(&self, value: &A) {
        let sink = lock(&self.output).as_ref().map(Arc::clone);
        if let Some(sink) = sink {
            sink.run(value);
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl<A: 'static> Source<A> for StickySource<A> {
    fn connect(&self, effect: BoxEffect<A>) -> Disposable {
        assert!(
            lock(&self.output).replace(Arc::from(effect)).is_none(),
            "StickySource supports a single connection"
        );
        let disposed = Arc::clone(&self.disposed);
        Disposable::new(move || {
            disposed.store(true, Ordering::SeqCst);
        })
    }
}

// ─── LatchSource ─────────────────────────────────────────────────────────────

/// A source that never emits and only records whether the disposable it
/// returned was invoked.
pub struct LatchSource {
    disposed: Arc<AtomicBool>,
}

impl Clone for LatchSource {
    fn clone(&self) -> Self {
        Self {
            disposed: Arc::clone(&self.disposed),
        }
    }
}

impl Default for LatchSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchSource {
    pub fn new() -> Self {
        Self {
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl<A: 'static> Source<A> for LatchSource {
    fn connect(&self, _effect: BoxEffect<A>) -> Disposable {
        let disposed = Arc::clone(&self.disposed);
        Disposable::new(move || {
            disposed.store(true, Ordering::SeqCst);
        })
    }
}

// ─── Recorder ────────────────────────────────────────────────────────────────

/// A thread-safe sink that records every delivered value, in order.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: Arc::clone(&self.values),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Recorder<T> {
    pub fn new() -> Self {
        Self {
            values: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.values).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.values).is_empty()
    }
}

impl<T: Clone> Recorder<T> {
    /// Snapshot of everything recorded so far.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        lock(&self.values).clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Recorder<T> {
    /// An effect that appends each delivered value to this recorder.
    ///
    /// Can be called any number of times; all effects feed the same record.
    pub fn effect(&self) -> impl Effect<T> + 'static {
        let values = Arc::clone(&self.values);
        move |value: &T| lock(&values).push(value.clone())
    }
}

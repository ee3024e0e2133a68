#![forbid(unsafe_code)]

//! Change-gated effect sinks.
//!
//! A [`Diffuser`] wraps a side-effecting function. When
//! [`run`](Diffuser::run) is called, the diffuser decides whether to forward
//! the value to that function. Diffusers created with [`into`](Diffuser::into)
//! forward only when the value differs from the previous one (or on the very
//! first call); [`into_when`](Diffuser::into_when) takes a caller-supplied
//! change policy; [`into_always`](Diffuser::into_always) always forwards;
//! [`into_once`](Diffuser::into_once) forwards exactly once.
//!
//! Diffusers compose: [`into_all`](Diffuser::into_all) merges a list of
//! diffusers with the same input type, and [`map`](Diffuser::map) changes a
//! diffuser's input type.
//!
//! # Invariants
//!
//! 1. A gated diffuser's effect runs if and only if the cache is unset
//!    (first call) or `did_change(previous, next)` holds. The cache being
//!    unset is a distinct state, not a payload value: a first call with a
//!    "null-like" payload (e.g. `run(&None)` on a `Diffuser<Option<T>>`)
//!    still fires.
//! 2. After the predicate is evaluated, the new value is recorded in the
//!    cache whether or not the effect ran. If the effect panicked, the
//!    cache keeps the previous value instead.
//! 3. `run` is mutually exclusive per instance: the compare/effect/record
//!    sequence is atomic with respect to other `run` calls on the same
//!    instance. No FIFO or monotonic ordering across threads is guaranteed;
//!    the cache ends up holding the value of whichever call completed last.
//! 4. A merged diffuser runs every child, in insertion order, on every call,
//!    with no gating of its own.
//!
//! # Failure Modes
//!
//! - **Effect panics**: the panic unwinds to the caller of `run`; the cache
//!   write is skipped (invariant 2), so the same value will be re-evaluated
//!   against the old cache on the next call.
//! - **Panicking child in a merge**: aborts the remaining children of that
//!   `run` call; there is no isolation between merged children.
//! - **Reentrant `run`**: running a diffuser from within its own effect is
//!   detected and panics with a distinct message instead of deadlocking.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::effect::Effect;

#[cfg(feature = "tracing")]
use crate::logging::trace;
#[cfg(not(feature = "tracing"))]
use crate::trace;

// ─── Instance ID generation ──────────────────────────────────────────────────

static NEXT_DIFFUSER_ID: AtomicU64 = AtomicU64::new(1);

fn next_diffuser_id() -> u64 {
    NEXT_DIFFUSER_ID.fetch_add(1, Ordering::Relaxed)
}

// ─── Reentrancy detection ────────────────────────────────────────────────────

thread_local! {
    /// Ids of the diffusers whose `run` is on the current thread's stack.
    static ACTIVE_RUNS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

/// RAII frame marking a diffuser as running on the current thread.
///
/// Nested frames for distinct instances are fine (merges and `map` dispatch
/// through children on the same stack); a second frame for the same
/// instance means the effect called back into its own diffuser.
struct ActiveFrame {
    id: u64,
}

impl ActiveFrame {
    fn enter(id: u64) -> Self {
        ACTIVE_RUNS.with(|stack| {
            let mut stack = stack.borrow_mut();
            assert!(
                !stack.contains(&id),
                "reentrant Diffuser::run: a diffuser must not be run from within its own effect"
            );
            stack.push(id);
        });
        Self { id }
    }
}

impl Drop for ActiveFrame {
    fn drop(&mut self) {
        ACTIVE_RUNS.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(position) = stack.iter().rposition(|&active| active == self.id) {
                stack.remove(position);
            }
        });
    }
}

// ─── Diffuser ────────────────────────────────────────────────────────────────

/// The dispatch logic compiled at construction. Owns whatever state its
/// constructor baked in: gate cache, once-flag, child snapshot.
type Compiled<A> = Box<dyn FnMut(&A) + Send>;

/// A change-gated effect sink.
///
/// See the [module docs](self) for the gating and concurrency contracts.
pub struct Diffuser<A> {
    id: u64,
    compiled: Mutex<Compiled<A>>,
}

impl<A: 'static> Diffuser<A> {
    fn from_compiled(compiled: Compiled<A>) -> Self {
        Self {
            id: next_diffuser_id(),
            compiled: Mutex::new(compiled),
        }
    }

    /// Compile a change predicate and an effect into gated dispatch logic.
    ///
    /// The cache starts unset; the predicate is only consulted once a value
    /// has been recorded. The new value is recorded after the effect
    /// returns, so a panicking effect leaves the previous value in place.
    fn gated(
        did_change: impl Fn(&A, &A) -> bool + Send + 'static,
        effect: impl Effect<A> + 'static,
    ) -> Compiled<A>
    where
        A: Clone + Send,
    {
        let mut cache: Option<A> = None;
        Box::new(move |value: &A| {
            let should_run = match &cache {
                None => true,
                Some(previous) => did_change(previous, value),
            };
            if should_run {
                effect.run(value);
            }
            cache = Some(value.clone());
        })
    }

    /// Create a diffuser which always executes its effect, regardless of the
    /// value.
    ///
    /// A building block for more nuanced diffusers; consider
    /// [`into`](Self::into) instead.
    pub fn into_always(effect: impl Effect<A> + 'static) -> Self {
        Self::from_compiled(Box::new(move |value: &A| effect.run(value)))
    }

    /// Create a diffuser which runs its effect when `did_change(previous,
    /// next)` holds.
    ///
    /// The first call always runs the effect; `did_change` is not consulted
    /// until a previous value exists. To wrap an existing diffuser in an
    /// additional policy, pass it via
    /// [`into_effect`](Self::into_effect).
    pub fn into_when(
        did_change: impl Fn(&A, &A) -> bool + Send + 'static,
        effect: impl Effect<A> + 'static,
    ) -> Self
    where
        A: Clone + Send,
    {
        Self::from_compiled(Self::gated(did_change, effect))
    }

    /// Create a diffuser which runs its effect exactly once, on the very
    /// first [`run`](Self::run), regardless of subsequent values.
    ///
    /// The once-flag is set only after the effect returns, so a first call
    /// whose effect panics will fire again on the next call.
    pub fn into_once(effect: impl Effect<A> + 'static) -> Self {
        let mut has_fired = false;
        Self::from_compiled(Box::new(move |value: &A| {
            if !has_fired {
                effect.run(value);
                has_fired = true;
            }
        }))
    }

    /// Merge a list of diffusers with the same input type.
    ///
    /// Every child runs on every call, in insertion order, with no gating at
    /// the merge level; each child applies its own. The children are taken
    /// by value: nothing the caller does afterwards can change the merged
    /// set.
    pub fn into_all(children: Vec<Diffuser<A>>) -> Self {
        Self::from_compiled(Box::new(move |value: &A| {
            for child in &children {
                child.run(value);
            }
        }))
    }

    /// Change the input type of a diffuser with a transform that runs
    /// unconditionally on every call.
    ///
    /// The produced value is forwarded to the wrapped diffuser's
    /// [`run`](Self::run), which applies its own gating.
    pub fn map<B>(
        transform: impl Fn(&A) -> B + Send + 'static,
        diffuser: Diffuser<B>,
    ) -> Diffuser<A>
    where
        B: 'static,
    {
        Self::from_compiled(Box::new(move |value: &A| {
            let produced = transform(value);
            diffuser.run(&produced);
        }))
    }

    /// Run the side effects associated with this diffuser if it has not run
    /// before, or if `value` is classified as different from the last value
    /// it ran with.
    ///
    /// The value becomes the gate cache for the next call (unless the effect
    /// panics, in which case the previous cache value is kept).
    ///
    /// # Panics
    ///
    /// Panics if called from within this diffuser's own effect (reentrant
    /// dispatch), and propagates any panic raised by the effect itself.
    pub fn run(&self, value: &A) {
        let _frame = ActiveFrame::enter(self.id);
        trace!(diffuser_id = self.id, "run");
        let mut compiled = self
            .compiled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (*compiled)(value);
    }

    /// Consume the diffuser, yielding an effect that forwards to
    /// [`run`](Self::run).
    ///
    /// This lets a change-gated sink stand wherever an effect is expected:
    /// terminating a [`Fuser`](crate::Fuser) connection, or nested inside
    /// [`into_when`](Self::into_when) to stack policies.
    pub fn into_effect(self) -> impl Effect<A> + 'static {
        move |value: &A| self.run(value)
    }
}

impl<A> Diffuser<A>
where
    A: PartialEq + Clone + Send + 'static,
{
    /// Create a diffuser from a side-effecting function, gated on the input
    /// type's notion of equality.
    ///
    /// This is the default, recommended constructor: the effect runs on the
    /// first call and thereafter only when the value changes.
    #[allow(clippy::should_implement_trait)]
    pub fn into(effect: impl Effect<A> + 'static) -> Self {
        Self::into_when(|previous, next| previous != next, effect)
    }
}

impl Diffuser<bool> {
    /// Invert the boolean value before forwarding it to `diffuser`.
    pub fn invert(diffuser: Diffuser<bool>) -> Diffuser<bool> {
        Self::map(|value: &bool| !value, diffuser)
    }
}

impl<A> std::fmt::Debug for Diffuser<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diffuser").field("id", &self.id).finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#![forbid(unsafe_code)]

//! Teardown handles for live connections.
//!
//! A [`Disposable`] wraps a one-shot teardown action. Calling
//! [`dispose`](Disposable::dispose) more than once is a safe no-op: the
//! action is taken out of the handle on the first call and dropped, along
//! with everything it captured, when it finishes.
//!
//! # Invariants
//!
//! 1. The wrapped action runs at most once, on the first `dispose` call.
//! 2. After the action returns, everything it captured (child disposables,
//!    source registrations) has been released.
//! 3. Dropping an undisposed handle does **not** tear down the connection;
//!    an ignored handle leaks the subscription deliberately.

use std::sync::{Mutex, PoisonError};

type Teardown = Box<dyn FnOnce() + Send>;

/// A one-shot teardown handle, returned by
/// [`Fuser::connect`](crate::Fuser::connect).
///
/// Disposal is idempotent in intent: the first [`dispose`](Self::dispose)
/// runs the teardown, every later call does nothing.
#[must_use = "a connection is only torn down when `dispose` is called"]
pub struct Disposable {
    action: Mutex<Option<Teardown>>,
}

impl Disposable {
    /// Wrap a teardown action.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Mutex::new(Some(Box::new(action))),
        }
    }

    /// A handle that tears nothing down. Useful for sources that have no
    /// resources to release.
    pub fn noop() -> Self {
        Self {
            action: Mutex::new(None),
        }
    }

    /// Compose a sequence of disposables into one. Disposing the result
    /// disposes every child, in order, then drops the bookkeeping so a
    /// second call no longer reaches the children.
    pub fn from_all(disposables: Vec<Disposable>) -> Self {
        Self::new(move || {
            for disposable in &disposables {
                disposable.dispose();
            }
        })
    }

    /// Run the teardown action if it has not run yet.
    ///
    /// The action is removed from the handle before it is invoked, so a
    /// reentrant `dispose` from within the action is also a no-op.
    pub fn dispose(&self) {
        let action = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(action) = action {
            action();
        }
    }
}

impl std::fmt::Debug for Disposable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disposed = self
            .action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none();
        f.debug_struct("Disposable")
            .field("disposed", &disposed)
            .finish()
    }
}

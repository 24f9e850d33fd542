#![forbid(unsafe_code)]

//! Cooperative cancellation for effects.
//!
//! Every background effect owns a [`CancelToken`]. The runtime checks the
//! token before an effect starts waiting, wakes it while it waits, and checks
//! it again right before the effect does its work. Cancellation never
//! interrupts work that has already started.
//!
//! Tokens can be linked: a token [`attach`](CancelToken::attach)ed to a parent
//! is cancelled together with that parent. Stack elements use this to release
//! every effect they spawned when they are popped.
//!
//! A [`CancelScope`] holds at most one live token. Replacing the token
//! cancels the previous one, which is how debounced effects collapse a burst
//! of requests into a single execution.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

struct TokenState {
    cancelled: bool,
    children: Vec<Weak<Inner>>,
}

struct Inner {
    state: Mutex<TokenState>,
    cvar: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel(&self) {
        let children = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            self.cvar.notify_all();
            std::mem::take(&mut state.children)
        };
        for child in children {
            if let Some(child) = child.upgrade() {
                child.cancel();
            }
        }
    }
}

/// Shared cancellation flag for a single effect (or a group of effects).
///
/// Cloning a token yields another handle to the same flag.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(TokenState {
                    cancelled: false,
                    children: Vec::new(),
                }),
                cvar: Condvar::new(),
            }),
        }
    }

    /// Cancel this token and every token attached to it.
    ///
    /// Idempotent. Threads blocked in [`wait_timeout`](Self::wait_timeout)
    /// wake up immediately.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Check if the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Link `child` so that cancelling `self` also cancels `child`.
    ///
    /// If `self` is already cancelled, `child` is cancelled right away.
    pub fn attach(&self, child: &CancelToken) {
        if Arc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        {
            let mut state = self.inner.lock();
            if !state.cancelled {
                state.children.retain(|weak| weak.strong_count() > 0);
                state.children.push(Arc::downgrade(&child.inner));
                return;
            }
        }
        child.cancel();
    }

    /// Wait for either cancellation or a timeout.
    ///
    /// Returns `true` if cancelled, `false` if the timeout elapsed.
    /// Spurious wakeups are absorbed by re-waiting for the remaining time.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let mut state = self.inner.lock();
        if state.cancelled {
            return true;
        }

        let start = Instant::now();
        let mut remaining = duration;

        loop {
            let (guard, result) = self
                .inner
                .cvar
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if state.cancelled {
                return true;
            }
            if result.timed_out() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return false;
            }
            remaining = duration - elapsed;
        }
    }

    /// Whether two handles refer to the same flag.
    #[must_use]
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// A named slot holding the token of the most recent request in a scope.
///
/// Created once by whoever owns the scope and passed explicitly to
/// [`Cmd::debounce`](crate::program::Cmd::debounce). Clones share the slot.
#[derive(Clone)]
pub struct CancelScope {
    name: &'static str,
    current: Arc<Mutex<Option<CancelToken>>>,
}

impl CancelScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Scope name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Install `token` as the live request, cancelling the previous one.
    ///
    /// Returns `true` if an earlier, still-live request was cancelled.
    pub fn replace(&self, token: CancelToken) -> bool {
        let previous = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            current.replace(token)
        };
        match previous {
            Some(previous) if !previous.is_cancelled() => {
                previous.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel the live request, if any.
    pub fn cancel(&self) {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Check if the scope currently has a request that was not cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl fmt::Debug for CancelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelScope")
            .field("name", &self.name)
            .field("pending", &self.is_pending())
            .finish()
    }
}
